//! Document-store capability.
//!
//! All persistent state lives in a third-party realtime document store,
//! reached through the host page's bridge (`BridgeStore`). The trait exists
//! so the sync layer can run against an in-memory fake in tests.
//!
//! Collections are scoped per user; each has a fixed ordering key that the
//! subscription applies server-side.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde_json::Value;

pub(crate) mod bridge;
#[cfg(test)]
pub(crate) mod fake;

pub(crate) use bridge::BridgeStore;

/// Field value the store backend replaces with the server time on write.
pub(crate) const SERVER_TIMESTAMP: &str = "__server_timestamp__";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Collection {
    Notes,
    Tasks,
    Flashcards,
}

impl Collection {
    /// Subscription ordering: `(field, descending)`.
    pub fn order(self) -> (&'static str, bool) {
        match self {
            Self::Notes => ("updatedAt", true),
            Self::Tasks => ("due", false),
            Self::Flashcards => ("createdAt", true),
        }
    }
}

/// One document as delivered by a snapshot: opaque id plus JSON fields.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StoreDoc {
    pub id: String,
    pub fields: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StoreErrorKind {
    /// The host page did not configure the bridge.
    Bridge,
    /// The backend rejected or failed the operation.
    Backend,
    /// The backend answered with something we could not decode.
    Parse,
}

#[derive(Clone, Debug)]
pub(crate) struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn bridge(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Bridge,
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Backend,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Parse,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// Snapshot callbacks fire once on subscribe and again on every remote
/// change, for the lifetime of the watch.
pub(crate) type SnapshotCallback = Rc<dyn Fn(StoreResult<Vec<StoreDoc>>)>;

/// Cancellation handle for a live subscription.
pub(crate) struct WatchHandle {
    unsub: Option<Box<dyn FnOnce()>>,
}

impl WatchHandle {
    pub fn new(unsub: impl FnOnce() + 'static) -> Self {
        Self {
            unsub: Some(Box::new(unsub)),
        }
    }

    /// A handle for a watch that never started (e.g. bridge missing).
    pub fn dead() -> Self {
        Self { unsub: None }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(f) = self.unsub.take() {
            f();
        }
    }
}

pub(crate) trait DocumentStore {
    /// Open a live, ordered subscription over one user-scoped collection.
    fn watch(
        &self,
        user_id: &str,
        collection: Collection,
        on_snapshot: SnapshotCallback,
    ) -> WatchHandle;

    /// Create a document with server-assigned id; resolves to that id.
    fn create(
        &self,
        user_id: &str,
        collection: Collection,
        fields: Value,
    ) -> LocalBoxFuture<'static, StoreResult<String>>;

    /// Merge-write: named fields are set, the rest of the document is left
    /// alone. Last write wins; no client-side merge logic.
    fn merge(
        &self,
        user_id: &str,
        collection: Collection,
        doc_id: &str,
        patch: Value,
    ) -> LocalBoxFuture<'static, StoreResult<()>>;

    fn remove(
        &self,
        user_id: &str,
        collection: Collection,
        doc_id: &str,
    ) -> LocalBoxFuture<'static, StoreResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_are_store_paths() {
        assert_eq!(Collection::Notes.to_string(), "notes");
        assert_eq!(Collection::Tasks.to_string(), "tasks");
        assert_eq!(Collection::Flashcards.to_string(), "flashcards");
    }

    #[test]
    fn collection_orderings() {
        assert_eq!(Collection::Notes.order(), ("updatedAt", true));
        assert_eq!(Collection::Tasks.order(), ("due", false));
        assert_eq!(Collection::Flashcards.order(), ("createdAt", true));
    }

    #[test]
    fn watch_handle_unsubscribes_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        let calls = Rc::new(Cell::new(0));
        let calls2 = calls.clone();
        let mut handle = WatchHandle::new(move || calls2.set(calls2.get() + 1));

        handle.unsubscribe();
        handle.unsubscribe();
        assert_eq!(calls.get(), 1);
    }
}

//! In-memory `DocumentStore` for native tests.
//!
//! Mimics the behaviors the sync layer depends on: immediate first snapshot,
//! re-notification on every write, per-collection ordering, and the
//! server-timestamp sentinel (replaced by a monotonic fake clock).

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::{
    Collection, DocumentStore, SnapshotCallback, StoreDoc, StoreError, StoreResult, WatchHandle,
    SERVER_TIMESTAMP,
};

type Key = (String, Collection);

struct Watcher {
    key: Key,
    id: u64,
    cb: SnapshotCallback,
}

#[derive(Default)]
struct Inner {
    docs: RefCell<HashMap<Key, Vec<(String, Value)>>>,
    watchers: RefCell<Vec<Watcher>>,
    next_watch_id: Cell<u64>,
    next_doc_id: Cell<u64>,
    clock: Cell<i64>,
    fail_writes: Cell<bool>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeStore {
    inner: Rc<Inner>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.set(fail);
    }

    /// Deliver a subscription error to every watcher of `collection`.
    pub fn emit_error(&self, user_id: &str, collection: Collection, message: &str) {
        let key = (user_id.to_string(), collection);
        for cb in self.watcher_cbs(&key) {
            cb(Err(StoreError::backend(message)));
        }
    }

    pub fn doc_fields(&self, user_id: &str, collection: Collection, doc_id: &str) -> Option<Value> {
        let key = (user_id.to_string(), collection);
        self.inner
            .docs
            .borrow()
            .get(&key)
            .and_then(|docs| docs.iter().find(|(id, _)| id == doc_id))
            .map(|(_, fields)| fields.clone())
    }

    pub fn doc_count(&self, user_id: &str, collection: Collection) -> usize {
        let key = (user_id.to_string(), collection);
        self.inner
            .docs
            .borrow()
            .get(&key)
            .map(|d| d.len())
            .unwrap_or(0)
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    fn tick(&self) -> i64 {
        let next = self.inner.clock.get() + 1;
        self.inner.clock.set(next);
        next
    }

    fn resolve_timestamps(&self, fields: &mut Value) {
        if let Some(obj) = fields.as_object_mut() {
            let now = self.tick();
            for v in obj.values_mut() {
                if v.as_str() == Some(SERVER_TIMESTAMP) {
                    *v = Value::from(now);
                }
            }
        }
    }

    fn snapshot(&self, key: &Key) -> Vec<StoreDoc> {
        let docs = self.inner.docs.borrow();
        let mut out: Vec<StoreDoc> = docs
            .get(key)
            .map(|d| {
                d.iter()
                    .map(|(id, fields)| StoreDoc {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let (field, descending) = key.1.order();
        out.sort_by(|a, b| {
            let ord = cmp_order_values(a.fields.get(field), b.fields.get(field));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        out
    }

    fn watcher_cbs(&self, key: &Key) -> Vec<SnapshotCallback> {
        self.inner
            .watchers
            .borrow()
            .iter()
            .filter(|w| &w.key == key)
            .map(|w| w.cb.clone())
            .collect()
    }

    fn notify(&self, key: &Key) {
        let snapshot = self.snapshot(key);
        for cb in self.watcher_cbs(key) {
            cb(Ok(snapshot.clone()));
        }
    }

    fn write_guard(&self) -> StoreResult<()> {
        if self.inner.fail_writes.get() {
            Err(StoreError::backend("simulated write failure"))
        } else {
            Ok(())
        }
    }
}

/// Missing/null order keys rank lowest, so a descending order puts them last
/// (never-updated notes sort oldest).
fn cmp_order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl DocumentStore for FakeStore {
    fn watch(
        &self,
        user_id: &str,
        collection: Collection,
        on_snapshot: SnapshotCallback,
    ) -> WatchHandle {
        let key = (user_id.to_string(), collection);
        let watch_id = self.inner.next_watch_id.get();
        self.inner.next_watch_id.set(watch_id + 1);

        self.inner.watchers.borrow_mut().push(Watcher {
            key: key.clone(),
            id: watch_id,
            cb: on_snapshot.clone(),
        });

        on_snapshot(Ok(self.snapshot(&key)));

        let inner = self.inner.clone();
        WatchHandle::new(move || {
            inner.watchers.borrow_mut().retain(|w| w.id != watch_id);
        })
    }

    fn create(
        &self,
        user_id: &str,
        collection: Collection,
        mut fields: Value,
    ) -> LocalBoxFuture<'static, StoreResult<String>> {
        let this = self.clone();
        let key = (user_id.to_string(), collection);
        let result = this.write_guard().map(|()| {
            this.resolve_timestamps(&mut fields);
            let n = this.inner.next_doc_id.get() + 1;
            this.inner.next_doc_id.set(n);
            let id = format!("doc-{n}");
            this.inner
                .docs
                .borrow_mut()
                .entry(key.clone())
                .or_default()
                .push((id.clone(), fields));
            this.notify(&key);
            id
        });
        async move { result }.boxed_local()
    }

    fn merge(
        &self,
        user_id: &str,
        collection: Collection,
        doc_id: &str,
        mut patch: Value,
    ) -> LocalBoxFuture<'static, StoreResult<()>> {
        let this = self.clone();
        let key = (user_id.to_string(), collection);
        let result = this.write_guard().and_then(|()| {
            this.resolve_timestamps(&mut patch);
            let mut docs = this.inner.docs.borrow_mut();
            let entry = docs
                .get_mut(&key)
                .and_then(|d| d.iter_mut().find(|(id, _)| id == doc_id))
                .ok_or_else(|| StoreError::backend(format!("no such document: {doc_id}")))?;

            match (entry.1.as_object_mut(), patch.as_object()) {
                (Some(target), Some(source)) => {
                    for (k, v) in source {
                        target.insert(k.clone(), v.clone());
                    }
                }
                _ => entry.1 = patch,
            }
            Ok(())
        });
        if result.is_ok() {
            this.notify(&key);
        }
        async move { result }.boxed_local()
    }

    fn remove(
        &self,
        user_id: &str,
        collection: Collection,
        doc_id: &str,
    ) -> LocalBoxFuture<'static, StoreResult<()>> {
        let this = self.clone();
        let key = (user_id.to_string(), collection);
        let result = this.write_guard().map(|()| {
            if let Some(docs) = this.inner.docs.borrow_mut().get_mut(&key) {
                docs.retain(|(id, _)| id != doc_id);
            }
        });
        if result.is_ok() {
            this.notify(&key);
        }
        async move { result }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn first_snapshot_is_immediate_and_writes_renotify() {
        let store = FakeStore::new();
        let seen: Rc<RefCell<Vec<usize>>> = Rc::default();

        let seen2 = seen.clone();
        let mut handle = store.watch(
            "u1",
            Collection::Notes,
            Rc::new(move |snap| seen2.borrow_mut().push(snap.unwrap().len())),
        );

        block_on(store.create("u1", Collection::Notes, serde_json::json!({ "title": "a" })))
            .unwrap();
        assert_eq!(*seen.borrow(), vec![0, 1]);

        handle.unsubscribe();
        block_on(store.create("u1", Collection::Notes, serde_json::json!({ "title": "b" })))
            .unwrap();
        assert_eq!(*seen.borrow(), vec![0, 1]);
        assert_eq!(store.watcher_count(), 0);
    }

    #[test]
    fn notes_snapshot_orders_by_updated_at_descending_missing_last() {
        let store = FakeStore::new();
        block_on(store.create(
            "u1",
            Collection::Notes,
            serde_json::json!({ "title": "old", "updatedAt": 10 }),
        ))
        .unwrap();
        block_on(store.create(
            "u1",
            Collection::Notes,
            serde_json::json!({ "title": "new", "updatedAt": 20 }),
        ))
        .unwrap();
        block_on(store.create(
            "u1",
            Collection::Notes,
            serde_json::json!({ "title": "never" }),
        ))
        .unwrap();

        let snap = store.snapshot(&("u1".to_string(), Collection::Notes));
        let titles: Vec<_> = snap
            .iter()
            .map(|d| d.fields["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["new", "old", "never"]);
    }

    #[test]
    fn merge_resolves_server_timestamp_monotonically() {
        let store = FakeStore::new();
        let id = block_on(store.create(
            "u1",
            Collection::Notes,
            serde_json::json!({ "updatedAt": SERVER_TIMESTAMP }),
        ))
        .unwrap();

        let t1 = store.doc_fields("u1", Collection::Notes, &id).unwrap()["updatedAt"]
            .as_i64()
            .unwrap();

        block_on(store.merge(
            "u1",
            Collection::Notes,
            &id,
            serde_json::json!({ "updatedAt": SERVER_TIMESTAMP }),
        ))
        .unwrap();

        let t2 = store.doc_fields("u1", Collection::Notes, &id).unwrap()["updatedAt"]
            .as_i64()
            .unwrap();
        assert!(t2 > t1);
    }

    #[test]
    fn merge_missing_document_fails() {
        let store = FakeStore::new();
        let err = block_on(store.merge(
            "u1",
            Collection::Notes,
            "ghost",
            serde_json::json!({ "title": "x" }),
        ))
        .unwrap_err();
        assert!(err.message.contains("ghost"));
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let store = FakeStore::new();
        let id = block_on(store.create(
            "u1",
            Collection::Notes,
            serde_json::json!({ "title": "t", "body": "b", "pinned": true }),
        ))
        .unwrap();

        block_on(store.merge(
            "u1",
            Collection::Notes,
            &id,
            serde_json::json!({ "body": "b2" }),
        ))
        .unwrap();

        let fields = store.doc_fields("u1", Collection::Notes, &id).unwrap();
        assert_eq!(fields["title"], "t");
        assert_eq!(fields["body"], "b2");
        assert_eq!(fields["pinned"], true);
    }
}

//! Remote collection mirror.
//!
//! Keeps the three user-scoped collections live-synchronized into local
//! lists. Every snapshot replaces the whole list; the lists are small, so
//! wholesale replacement beats incremental patching on simplicity.
//!
//! Error policy: a snapshot error marks the store offline, tears the
//! subscriptions down, and retries once per fixed delay until a snapshot
//! succeeds again.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::models::{Flashcard, Note, Task};
use crate::store::{Collection, DocumentStore, StoreDoc, StoreError, StoreErrorKind, WatchHandle};

use super::draft::DraftController;
use super::AppState;

/// Fixed delay before a resubscribe attempt after a stream error.
pub(crate) const RESUBSCRIBE_DELAY_MS: i32 = 15_000;

pub(crate) fn notes_from_docs(docs: &[StoreDoc]) -> Vec<Note> {
    docs.iter().filter_map(Note::from_doc).collect()
}

pub(crate) fn tasks_from_docs(docs: &[StoreDoc]) -> Vec<Task> {
    docs.iter().filter_map(Task::from_doc).collect()
}

pub(crate) fn cards_from_docs(docs: &[StoreDoc]) -> Vec<Flashcard> {
    docs.iter().filter_map(Flashcard::from_doc).collect()
}

/// Selection rule per notes snapshot: keep the active note while it exists,
/// otherwise fall back to the first note of the ordered list (or none).
pub(crate) fn next_active_note(current: Option<&str>, notes: &[Note]) -> Option<String> {
    if let Some(cur) = current {
        if notes.iter().any(|n| n.id == cur) {
            return Some(cur.to_string());
        }
    }
    notes.first().map(|n| n.id.clone())
}

#[derive(Clone)]
pub(crate) struct MirrorController {
    app: AppState,
    draft: DraftController,
    handles: Rc<RefCell<Vec<WatchHandle>>>,
    retry_timer: Rc<Cell<Option<i32>>>,
}

impl MirrorController {
    pub fn new(app: AppState, draft: DraftController) -> Self {
        Self {
            app,
            draft,
            handles: Rc::new(RefCell::new(vec![])),
            retry_timer: Rc::new(Cell::new(None)),
        }
    }

    /// Open the three subscriptions for `user_id`. Idempotent: always tears
    /// down first.
    pub fn start(&self, user_id: &str) {
        self.stop();

        let notes_handle = {
            let this = self.clone();
            self.app.store.watch(
                user_id,
                Collection::Notes,
                Rc::new(move |snap| match snap {
                    Ok(docs) => this.on_notes_snapshot(&docs),
                    Err(e) => this.on_stream_error(Collection::Notes, &e),
                }),
            )
        };

        let tasks_handle = {
            let this = self.clone();
            self.app.store.watch(
                user_id,
                Collection::Tasks,
                Rc::new(move |snap| match snap {
                    Ok(docs) => {
                        this.app.store_online.set(true);
                        this.app.tasks.set(tasks_from_docs(&docs));
                    }
                    Err(e) => this.on_stream_error(Collection::Tasks, &e),
                }),
            )
        };

        let cards_handle = {
            let this = self.clone();
            self.app.store.watch(
                user_id,
                Collection::Flashcards,
                Rc::new(move |snap| match snap {
                    Ok(docs) => {
                        this.app.store_online.set(true);
                        this.app.flashcards.set(cards_from_docs(&docs));
                    }
                    Err(e) => this.on_stream_error(Collection::Flashcards, &e),
                }),
            )
        };

        self.handles
            .borrow_mut()
            .extend([notes_handle, tasks_handle, cards_handle]);
    }

    /// Tear down all three streams and any armed resubscribe.
    pub fn stop(&self) {
        for mut handle in self.handles.borrow_mut().drain(..) {
            handle.unsubscribe();
        }
        self.clear_retry_timer();
    }

    fn on_notes_snapshot(&self, docs: &[StoreDoc]) {
        self.app.store_online.set(true);

        let notes = notes_from_docs(docs);
        let current = self.app.active_note_id.get_untracked();
        let next = next_active_note(current.as_deref(), &notes);

        self.app.notes.set(notes.clone());

        if next == current {
            return;
        }
        match next {
            Some(id) => {
                if let Some(note) = notes.iter().find(|n| n.id == id) {
                    self.draft.select_note(note);
                }
            }
            None => self.draft.clear_active(),
        }
    }

    fn on_stream_error(&self, collection: Collection, error: &StoreError) {
        leptos::logging::error!("{collection} subscription failed: {error}");
        self.app.store_online.set(false);
        self.stop();

        // A missing bridge will not heal on a timer; stay offline.
        if error.kind != StoreErrorKind::Bridge {
            self.schedule_resubscribe();
        }
    }

    fn schedule_resubscribe(&self) {
        if self.retry_timer.get().is_some() {
            return;
        }
        let Some(win) = web_sys::window() else {
            return;
        };

        let this = self.clone();
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            this.retry_timer.set(None);
            if let Some(uid) = this.app.user_id() {
                this.start(&uid);
            }
        });

        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                RESUBSCRIBE_DELAY_MS,
            )
            .unwrap_or(0);
        self.retry_timer.set(Some(tid));
    }

    fn clear_retry_timer(&self) {
        if let Some(tid) = self.retry_timer.take() {
            if let Some(win) = web_sys::window() {
                let _ = win.clear_timeout_with_handle(tid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::FakeStore;
    use crate::store::DocumentStore;
    use futures::executor::block_on;

    fn note(id: &str) -> Note {
        Note {
            id: id.to_string(),
            title: String::new(),
            folder: String::new(),
            body: String::new(),
            pinned: false,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn first_snapshot_activates_first_note_when_none_active() {
        let notes = vec![note("a"), note("b")];
        assert_eq!(next_active_note(None, &notes), Some("a".to_string()));
    }

    #[test]
    fn existing_selection_survives_reordering() {
        let notes = vec![note("b"), note("a")];
        assert_eq!(next_active_note(Some("a"), &notes), Some("a".to_string()));
    }

    #[test]
    fn vanished_selection_falls_back_to_first() {
        let notes = vec![note("b"), note("c")];
        assert_eq!(next_active_note(Some("x"), &notes), Some("b".to_string()));
        assert_eq!(next_active_note(Some("x"), &[]), None);
    }

    #[test]
    fn snapshot_parsing_drops_undecodable_docs() {
        let docs = vec![
            StoreDoc {
                id: "n1".to_string(),
                fields: serde_json::json!({ "title": "ok" }),
            },
            StoreDoc {
                id: "".to_string(),
                fields: serde_json::json!({ "title": "no id" }),
            },
        ];
        assert_eq!(notes_from_docs(&docs).len(), 1);
        assert_eq!(tasks_from_docs(&docs).len(), 1);
        assert_eq!(cards_from_docs(&docs).len(), 1);
    }

    #[test]
    fn pin_toggle_twice_restores_flag_and_bumps_updated_at_both_times() {
        let store = FakeStore::new();
        let id = block_on(store.create("u1", Collection::Notes, Note::create_fields())).unwrap();

        let read = |store: &FakeStore| {
            let fields = store.doc_fields("u1", Collection::Notes, &id).unwrap();
            (
                fields["pinned"].as_bool().unwrap(),
                fields["updatedAt"].as_i64().unwrap(),
            )
        };

        let (p0, t0) = read(&store);
        block_on(store.merge("u1", Collection::Notes, &id, Note::pin_patch(!p0))).unwrap();
        let (p1, t1) = read(&store);
        block_on(store.merge("u1", Collection::Notes, &id, Note::pin_patch(!p1))).unwrap();
        let (p2, t2) = read(&store);

        assert_eq!(p1, !p0);
        assert_eq!(p2, p0);
        assert!(t1 > t0);
        assert!(t2 > t1);
    }

    #[test]
    fn wholesale_replacement_reflects_remote_deletes() {
        use std::cell::RefCell;

        let store = FakeStore::new();
        let id_a = block_on(store.create("u1", Collection::Notes, Note::create_fields())).unwrap();
        let _id_b = block_on(store.create("u1", Collection::Notes, Note::create_fields())).unwrap();

        let lists: Rc<RefCell<Vec<usize>>> = Rc::default();
        let lists2 = lists.clone();
        let mut handle = store.watch(
            "u1",
            Collection::Notes,
            Rc::new(move |snap| {
                lists2.borrow_mut().push(notes_from_docs(&snap.unwrap()).len());
            }),
        );

        block_on(store.remove("u1", Collection::Notes, &id_a)).unwrap();
        handle.unsubscribe();

        assert_eq!(*lists.borrow(), vec![2, 1]);
    }
}

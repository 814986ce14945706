//! Draft editor state + autosave coordinator.
//!
//! One note at a time is loaded into a local working copy that diverges from
//! the mirror until a save reconciles it. `DraftMachine` is the pure state
//! machine; `DraftController` wires it to the debounce timer and the store.
//!
//! States: Idle -> Dirty -> Saving -> Saved -> Idle, with Error on a failed
//! write. Loading a note never issues a write (a short guard swallows the
//! edits the load itself produces), and the pending save captures the target
//! note id and field values immutably at arm time, so switching notes cannot
//! redirect or drop an armed write.

use serde_json::Value;
use wasm_bindgen::JsCast;

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::models::{Note, UNTITLED};
use crate::store::{Collection, DocumentStore, SERVER_TIMESTAMP};
use crate::util::now_ms;

use super::AppState;

/// Quiet period after the last edit before an autosave fires.
pub(crate) const AUTOSAVE_DEBOUNCE_MS: i32 = 1000;

/// How long the "Saved" confirmation stays up before returning to idle.
pub(crate) const SAVED_FLASH_MS: i32 = 1200;

/// Edits inside this window after a load are the load itself, not the user.
pub(crate) const LOAD_GUARD_MS: i64 = 400;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum SaveState {
    #[default]
    Idle,
    Dirty,
    Saving,
    Saved,
    Error,
}

/// A save captured at arm time. The note id and field values are immutable
/// from here on; later note switches do not affect an armed save.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PendingSave {
    pub note_id: String,
    pub title: String,
    pub folder: String,
    pub body: String,
}

impl PendingSave {
    /// The merge-write payload. Empty titles persist as "Untitled".
    pub fn patch(&self) -> Value {
        let title = self.title.trim();
        serde_json::json!({
            "title": if title.is_empty() { UNTITLED } else { title },
            "className": self.folder.trim(),
            "body": self.body,
            "updatedAt": SERVER_TIMESTAMP,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DraftMachine {
    pub note_id: Option<String>,
    pub title: String,
    pub folder: String,
    pub body: String,
    pub state: SaveState,
    pub error: Option<String>,
    pending: Option<PendingSave>,
    guard_until_ms: i64,
}

impl DraftMachine {
    /// Load a note into the draft. Returns the previous note's pending save,
    /// if any; the caller must flush it (never silently drop it).
    pub fn load_note_at(&mut self, note: &Note, now: i64) -> Option<PendingSave> {
        let carried = self.pending.take();

        self.note_id = Some(note.id.clone());
        self.title = note.title.clone();
        self.folder = note.folder.clone();
        self.body = note.body.clone();
        self.state = SaveState::Idle;
        self.error = None;
        self.guard_until_ms = now + LOAD_GUARD_MS;

        carried
    }

    /// No active note (deleted, or signed out).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Record an edit. Returns true when the caller should (re)start the
    /// debounce timer; false while the load guard is active or no note is
    /// loaded.
    pub fn on_edit_at(&mut self, now: i64) -> bool {
        let Some(note_id) = self.note_id.clone() else {
            return false;
        };
        if now < self.guard_until_ms {
            return false;
        }

        self.state = SaveState::Dirty;
        self.error = None;
        self.pending = Some(PendingSave {
            note_id,
            title: self.title.clone(),
            folder: self.folder.clone(),
            body: self.body.clone(),
        });
        true
    }

    /// Debounce timer elapsed: hand out the armed save and enter Saving.
    pub fn take_due_save(&mut self) -> Option<PendingSave> {
        if self.state != SaveState::Dirty {
            return None;
        }
        let pending = self.pending.take()?;
        self.state = SaveState::Saving;
        Some(pending)
    }

    /// Manual save: same write path, no quiet period.
    pub fn begin_manual_save(&mut self) -> Option<PendingSave> {
        let note_id = self.note_id.clone()?;
        self.pending = None;
        self.state = SaveState::Saving;
        Some(PendingSave {
            note_id,
            title: self.title.clone(),
            folder: self.folder.clone(),
            body: self.body.clone(),
        })
    }

    /// Settle a write. Results for a note that is no longer loaded are
    /// ignored here (the controller surfaces those failures); a result that
    /// raced a newer edit leaves the Dirty state alone so the newer save
    /// still runs.
    pub fn apply_save_result(&mut self, note_id: &str, result: Result<(), String>) {
        if self.note_id.as_deref() != Some(note_id) {
            return;
        }
        if self.state != SaveState::Saving {
            return;
        }

        match result {
            Ok(()) => {
                self.state = SaveState::Saved;
                self.error = None;
            }
            Err(message) => {
                // The draft fields stay as typed; the user retries manually.
                self.state = SaveState::Error;
                self.error = Some(message);
            }
        }
    }

    /// End of the Saved display window.
    pub fn saved_flash_done(&mut self) {
        if self.state == SaveState::Saved {
            self.state = SaveState::Idle;
        }
    }
}

/// Signal-backed wrapper driving `DraftMachine` from the UI: field edits,
/// the debounce timer, and the async merge-write.
#[derive(Clone)]
pub(crate) struct DraftController {
    app: AppState,
    pub machine: RwSignal<DraftMachine>,
    debounce_timer: StoredValue<Option<i32>>,
    saved_timer: StoredValue<Option<i32>>,
}

impl DraftController {
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            machine: RwSignal::new(DraftMachine::default()),
            debounce_timer: StoredValue::new(None),
            saved_timer: StoredValue::new(None),
        }
    }

    /// Make `note` the active note. A pending save for the previous note is
    /// flushed eagerly so it still completes.
    pub fn select_note(&self, note: &Note) {
        self.clear_debounce();

        let carried = self
            .machine
            .try_update(|m| m.load_note_at(note, now_ms()))
            .flatten();

        self.app.active_note_id.set(Some(note.id.clone()));

        if let Some(pending) = carried {
            self.write(pending);
        }
    }

    /// Drop the draft (active note deleted or session ended). An armed save
    /// for the old note still completes.
    pub fn clear_active(&self) {
        self.clear_debounce();

        let carried = self
            .machine
            .try_update(|m| {
                let p = if m.state == SaveState::Dirty {
                    m.pending.take()
                } else {
                    None
                };
                m.clear();
                p
            })
            .flatten();

        self.app.active_note_id.set(None);

        if let Some(pending) = carried {
            self.write(pending);
        }
    }

    pub fn edit_title(&self, value: String) {
        self.apply_edit(move |m| m.title = value);
    }

    pub fn edit_folder(&self, value: String) {
        self.apply_edit(move |m| m.folder = value);
    }

    pub fn edit_body(&self, value: String) {
        self.apply_edit(move |m| m.body = value);
    }

    /// Body rewrite from a tool (summary, transcript, PDF text). Same edit
    /// path as typing, so it autosaves the same way.
    pub fn transform_body(&self, f: impl FnOnce(&str) -> String) {
        self.apply_edit(move |m| m.body = f(&m.body));
    }

    fn apply_edit(&self, f: impl FnOnce(&mut DraftMachine)) {
        let arm = self
            .machine
            .try_update(|m| {
                f(m);
                m.on_edit_at(now_ms())
            })
            .unwrap_or(false);

        if arm {
            self.schedule_flush();
        }
    }

    /// Manual save button: bypass the quiet period.
    pub fn save_now(&self) {
        self.clear_debounce();
        let pending = self.machine.try_update(|m| m.begin_manual_save()).flatten();
        if let Some(pending) = pending {
            self.write(pending);
        }
    }

    fn schedule_flush(&self) {
        let Some(win) = web_sys::window() else {
            return;
        };

        if let Some(tid) = self.debounce_timer.get_value() {
            let _ = win.clear_timeout_with_handle(tid);
        }

        let this = self.clone();
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            this.debounce_timer.set_value(None);
            this.flush_due();
        });

        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                AUTOSAVE_DEBOUNCE_MS,
            )
            .unwrap_or(0);
        self.debounce_timer.set_value(Some(tid));
    }

    fn clear_debounce(&self) {
        if let Some(win) = web_sys::window() {
            if let Some(tid) = self.debounce_timer.get_value() {
                let _ = win.clear_timeout_with_handle(tid);
            }
        }
        self.debounce_timer.set_value(None);
    }

    fn flush_due(&self) {
        let pending = self.machine.try_update(|m| m.take_due_save()).flatten();
        if let Some(pending) = pending {
            self.write(pending);
        }
    }

    fn write(&self, pending: PendingSave) {
        let Some(uid) = self.app.user_id() else {
            leptos::logging::warn!("dropping note save: no signed-in user");
            return;
        };

        let this = self.clone();
        let store = self.app.store.clone();
        spawn_local(async move {
            let result = store
                .merge(&uid, Collection::Notes, &pending.note_id, pending.patch())
                .await
                .map_err(|e| e.to_string());

            let failed = result.as_ref().err().cloned();
            this.machine
                .update(|m| m.apply_save_result(&pending.note_id, result));

            if let Some(message) = failed {
                // Never silently drop an edit, even for a switched-away note.
                leptos::logging::error!("note save failed: {message}");
                if let Some(win) = web_sys::window() {
                    let _ = win.alert_with_message(&format!("Saving note failed: {message}"));
                }
            } else {
                this.schedule_saved_flash();
            }
        });
    }

    fn schedule_saved_flash(&self) {
        let Some(win) = web_sys::window() else {
            return;
        };

        if let Some(tid) = self.saved_timer.get_value() {
            let _ = win.clear_timeout_with_handle(tid);
        }

        let machine = self.machine;
        let saved_timer = self.saved_timer;
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            saved_timer.set_value(None);
            machine.update(|m| m.saved_flash_done());
        });

        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                SAVED_FLASH_MS,
            )
            .unwrap_or(0);
        self.saved_timer.set_value(Some(tid));
    }
}

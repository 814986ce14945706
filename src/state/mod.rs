use std::rc::Rc;

use leptos::prelude::*;

use crate::auth::IdentityGateway;
use crate::models::{Flashcard, Note, Task, ThemeMode, UserInfo};
use crate::storage::{apply_theme_class, load_theme, save_theme};
use crate::store::DocumentStore;
use crate::views::ALL_FOLDERS;

pub(crate) mod draft;
pub(crate) mod mirror;

/// Global session/UI state. One instance, provided through context at the
/// app root; all mutation goes through the signals, never ambient globals.
#[derive(Clone)]
pub(crate) struct AppState {
    pub store: Rc<dyn DocumentStore>,
    pub auth: Rc<dyn IdentityGateway>,

    pub current_user: RwSignal<Option<UserInfo>>,

    /// Mirrored collections: replaced wholesale on every snapshot.
    pub notes: RwSignal<Vec<Note>>,
    pub tasks: RwSignal<Vec<Task>>,
    pub flashcards: RwSignal<Vec<Flashcard>>,

    /// At most one note is active at a time.
    pub active_note_id: RwSignal<Option<String>>,

    /// Cleared by a subscription error, restored by the next good snapshot.
    pub store_online: RwSignal<bool>,

    /// Note-list view inputs.
    pub folder_filter: RwSignal<String>,
    pub search_query: RwSignal<String>,

    pub theme: RwSignal<ThemeMode>,
}

impl AppState {
    pub fn new(store: Rc<dyn DocumentStore>, auth: Rc<dyn IdentityGateway>) -> Self {
        let theme = load_theme();
        apply_theme_class(theme);

        Self {
            store,
            auth,
            current_user: RwSignal::new(None),
            notes: RwSignal::new(vec![]),
            tasks: RwSignal::new(vec![]),
            flashcards: RwSignal::new(vec![]),
            active_note_id: RwSignal::new(None),
            store_online: RwSignal::new(true),
            folder_filter: RwSignal::new(ALL_FOLDERS.to_string()),
            search_query: RwSignal::new(String::new()),
            theme: RwSignal::new(theme),
        }
    }

    pub fn user_id(&self) -> Option<String> {
        self.current_user.get_untracked().map(|u| u.uid)
    }

    pub fn toggle_theme(&self) {
        let next = self.theme.get_untracked().toggled();
        self.theme.set(next);
        save_theme(next);
        apply_theme_class(next);
    }

    /// Sign-out teardown: drop every mirrored document and selection.
    pub fn clear_session_data(&self) {
        self.notes.set(vec![]);
        self.tasks.set(vec![]);
        self.flashcards.set(vec![]);
        self.active_note_id.set(None);
        self.folder_filter.set(ALL_FOLDERS.to_string());
        self.search_query.set(String::new());
        self.store_online.set(true);
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);

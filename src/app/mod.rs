use std::rc::Rc;

use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

use crate::auth::{BridgeAuth, IdentityGateway};
use crate::pages::{CalendarPage, LoginPage, NotesPage, RootAuthed, StudyPage};
use crate::speech::TranscriptionSession;
use crate::state::draft::DraftController;
use crate::state::mirror::MirrorController;
use crate::state::{AppContext, AppState};
use crate::store::BridgeStore;

#[component]
pub fn App() -> impl IntoView {
    let app_state = AppState::new(Rc::new(BridgeStore::new()), Rc::new(BridgeAuth::new()));
    let draft = DraftController::new(app_state.clone());
    let mirror = MirrorController::new(app_state.clone(), draft.clone());

    provide_context(AppContext(app_state.clone()));
    provide_context(draft.clone());
    provide_context(TranscriptionSession::new());

    // Live auth state. This also collects the result of a redirect sign-in
    // on the load after the round trip.
    let auth_handle = {
        let user_signal = app_state.current_user;
        app_state.auth.watch(Rc::new(move |user| {
            user_signal.set(user);
        }))
    };
    // App-lifetime subscription; never torn down.
    std::mem::forget(auth_handle);

    // none -> user opens the three collection subscriptions; user -> none
    // tears them down and drops every mirrored document.
    Effect::new({
        let app_state = app_state.clone();
        move |_| match app_state.current_user.get() {
            Some(user) => mirror.start(&user.uid),
            None => {
                mirror.stop();
                draft.clear_active();
                app_state.clear_session_data();
            }
        }
    });

    // IMPORTANT:
    // - Leptos CSR requires the `csr` feature on `leptos`.
    // - router hooks require a <Router> context.
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("login") view=LoginPage />
                <Route path=path!("calendar") view=move || view! {
                    <RootAuthed>
                        <CalendarPage />
                    </RootAuthed>
                } />
                <Route path=path!("study") view=move || view! {
                    <RootAuthed>
                        <StudyPage />
                    </RootAuthed>
                } />
                <Route path=path!("") view=move || view! {
                    <RootAuthed>
                        <NotesPage />
                    </RootAuthed>
                } />
            </Routes>
        </Router>
    }
}

use chrono::Datelike;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;

use icons::{
    Check, ChevronLeft, ChevronRight, FileText, LogOut, Mic, Moon, Pin, Plus, Sparkles, Sun,
    Trash2, X,
};

use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::auth::IdentityGateway;
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardHeader, CardTitle, Input, Label, Spinner,
};
use crate::models::{Flashcard, Note, Task, ThemeMode, DEFAULT_NOTE_TITLE, UNTITLED};
use crate::pdf;
use crate::speech::TranscriptionSession;
use crate::state::draft::{DraftController, SaveState};
use crate::state::AppContext;
use crate::store::{Collection, DocumentStore};
use crate::util::{append_summary, append_transcript, date_key, today_local};
use crate::views::{
    calendar_grid, day_has_open_tasks, folder_list, next_month, prev_month, study_deck,
    tasks_by_date, visible_notes, ALL_FOLDERS,
};

fn alert(message: &str) {
    let _ = window().alert_with_message(message);
}

fn confirm(message: &str) -> bool {
    window().confirm_with_message(message).unwrap_or(false)
}

fn api_failure(ctx: &str, e: &ApiError) -> String {
    match e.kind {
        ApiErrorKind::Network => format!("{ctx} failed: network error. Check your connection."),
        _ => format!("{ctx} failed: {e}"),
    }
}

#[component]
pub fn LoginPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let on_sign_in = move |_| {
        let auth = app_state.0.auth.clone();

        loading.set(true);
        error.set(None);

        spawn_local(async move {
            // Popup flow with a redirect fallback when the popup is blocked;
            // a redirect resolves here and completes on the next load.
            if let Err(e) = auth.sign_in().await {
                error.set(Some(e.to_string()));
            }
            loading.set(false);
        });
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-sm flex-col justify-center px-4 py-10">
                <div class="mb-6 flex items-center justify-center">
                    <a href="/" class="text-sm font-medium text-foreground">"Studydesk"</a>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">"Sign in"</CardTitle>
                        <CardDescription class="text-xs">"Notes, tasks and flashcards follow your account."</CardDescription>
                    </CardHeader>

                    <CardContent>
                        <div class="flex flex-col gap-3">
                            <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                                {move || {
                                    error.get().map(|e| {
                                        view! {
                                            <Alert class="border-destructive/30">
                                                <AlertDescription class="text-destructive text-xs">
                                                    {e}
                                                </AlertDescription>
                                            </Alert>
                                        }
                                    })
                                }}
                            </Show>

                            <Button
                                class="w-full"
                                size=ButtonSize::Sm
                                attr:disabled=move || loading.get()
                                on:click=on_sign_in
                            >
                                <span class="inline-flex items-center gap-2">
                                    <Show when=move || loading.get() fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || if loading.get() { "Opening sign-in..." } else { "Continue with your account" }}
                                </span>
                            </Button>
                        </div>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn RootAuthed(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let is_authenticated = move || app_state.0.current_user.get().is_some();

    // Store children so the view macro sees an `Fn` (not an `FnOnce`).
    let children = StoredValue::new(children);

    view! {
        <Show when=is_authenticated fallback=move || view! { <LoginPage /> }>
            <AppLayout>
                {move || children.with_value(|c| c())}
            </AppLayout>
        </Show>
    }
}

#[component]
pub fn AppLayout(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let children = StoredValue::new(children);

    let user_label = {
        let app_state = app_state.clone();
        move || {
            app_state.0.current_user.with(|u| {
                u.as_ref()
                    .map(|u| {
                        if u.display_name.trim().is_empty() {
                            u.email.clone()
                        } else {
                            u.display_name.clone()
                        }
                    })
                    .unwrap_or_default()
            })
        }
    };

    let on_toggle_theme = {
        let app_state = app_state.clone();
        move |_| app_state.0.toggle_theme()
    };

    let on_sign_out = {
        let app_state = app_state.clone();
        move |_| {
            let auth = app_state.0.auth.clone();
            spawn_local(async move {
                if let Err(e) = auth.sign_out().await {
                    alert(&format!("Sign-out failed: {e}"));
                }
            });
        }
    };

    let theme = app_state.0.theme;
    let store_online = app_state.0.store_online;

    view! {
        <div class="min-h-screen bg-background text-foreground">
            <header class="sticky top-0 z-10 border-b bg-background/95 backdrop-blur">
                <div class="mx-auto flex h-12 w-full max-w-6xl items-center gap-4 px-4">
                    <a href="/" class="text-sm font-semibold">"Studydesk"</a>

                    <nav class="flex items-center gap-1 text-sm">
                        <a href="/" class="rounded-md px-2 py-1 hover:bg-accent">"Notes"</a>
                        <a href="/calendar" class="rounded-md px-2 py-1 hover:bg-accent">"Calendar"</a>
                        <a href="/study" class="rounded-md px-2 py-1 hover:bg-accent">"Study"</a>
                    </nav>

                    <div class="ml-auto flex items-center gap-2">
                        <Show when=move || !store_online.get() fallback=|| ().into_view()>
                            <span class="rounded-full bg-amber-500/15 px-2 py-0.5 text-xs text-amber-600">
                                "Reconnecting..."
                            </span>
                        </Show>

                        <span class="hidden text-xs text-muted-foreground sm:inline">{user_label}</span>

                        <Button variant=ButtonVariant::Ghost size=ButtonSize::IconSm on:click=on_toggle_theme>
                            {move || match theme.get() {
                                ThemeMode::Dark => view! { <Sun class="size-4" /> }.into_any(),
                                ThemeMode::Light => view! { <Moon class="size-4" /> }.into_any(),
                            }}
                        </Button>

                        <Button variant=ButtonVariant::Ghost size=ButtonSize::IconSm on:click=on_sign_out>
                            <LogOut class="size-4" />
                        </Button>
                    </div>
                </div>
            </header>

            <main class="mx-auto w-full max-w-6xl px-4 py-4">
                {move || children.with_value(|c| c())}
            </main>
        </div>
    }
}

fn save_status_view(state: SaveState) -> AnyView {
    match state {
        SaveState::Idle => view! { <span class="text-xs text-transparent">"-"</span> }.into_any(),
        SaveState::Dirty => {
            view! { <span class="text-xs text-muted-foreground">"Unsaved changes"</span> }
                .into_any()
        }
        SaveState::Saving => view! {
            <span class="inline-flex items-center gap-1 text-xs text-muted-foreground">
                <Spinner class="size-3" />
                "Saving"
            </span>
        }
        .into_any(),
        SaveState::Saved => view! {
            <span class="inline-flex items-center gap-1 text-xs text-emerald-600">
                <Check class="size-3" />
                "Saved"
            </span>
        }
        .into_any(),
        SaveState::Error => {
            view! { <span class="text-xs text-destructive">"Save failed"</span> }.into_any()
        }
    }
}

#[component]
pub fn NotesPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let draft = expect_context::<DraftController>();
    let speech = expect_context::<TranscriptionSession>();

    let creating: RwSignal<bool> = RwSignal::new(false);
    let summarizing: RwSignal<bool> = RwSignal::new(false);
    let generating: RwSignal<bool> = RwSignal::new(false);
    let importing_pdf: RwSignal<bool> = RwSignal::new(false);

    let notes = app_state.0.notes;
    let folder_filter = app_state.0.folder_filter;
    let search_query = app_state.0.search_query;

    let folders = Memo::new(move |_| folder_list(&notes.get()));
    let visible = Memo::new(move |_| {
        visible_notes(&notes.get(), &folder_filter.get(), &search_query.get())
    });

    let machine = draft.machine;
    let has_active = move || machine.with(|m| m.note_id.is_some());

    let on_new_note = {
        let app_state = app_state.clone();
        let draft = draft.clone();
        move |_| {
            let Some(uid) = app_state.0.user_id() else {
                return;
            };
            let store = app_state.0.store.clone();
            let draft = draft.clone();

            creating.set(true);
            spawn_local(async move {
                match store
                    .create(&uid, Collection::Notes, Note::create_fields())
                    .await
                {
                    Ok(id) => {
                        // Select immediately with local defaults; the snapshot
                        // with server timestamps follows.
                        let note = Note {
                            id,
                            title: DEFAULT_NOTE_TITLE.to_string(),
                            folder: String::new(),
                            body: String::new(),
                            pinned: false,
                            created_at: None,
                            updated_at: None,
                        };
                        draft.select_note(&note);
                    }
                    Err(e) => alert(&format!("Creating note failed: {e}")),
                }
                creating.set(false);
            });
        }
    };

    let on_summarize = {
        let draft = draft.clone();
        move |_| {
            let body = draft.machine.with_untracked(|m| m.body.clone());
            if body.trim().is_empty() {
                alert("Nothing to summarize yet.");
                return;
            }

            let draft = draft.clone();
            summarizing.set(true);
            spawn_local(async move {
                match ApiClient::from_env().summarize(&body).await {
                    // Appending counts as an edit, so it autosaves like typing.
                    Ok(summary) => draft.transform_body(move |b| append_summary(b, &summary)),
                    Err(e) => alert(&api_failure("Summarize", &e)),
                }
                summarizing.set(false);
            });
        }
    };

    let on_generate_cards = {
        let app_state = app_state.clone();
        let draft = draft.clone();
        move |_| {
            let Some(uid) = app_state.0.user_id() else {
                return;
            };
            let (note_id, note_title, body) = draft
                .machine
                .with_untracked(|m| (m.note_id.clone(), m.title.clone(), m.body.clone()));
            let Some(note_id) = note_id else {
                return;
            };
            if body.trim().is_empty() {
                alert("Nothing to generate flashcards from yet.");
                return;
            }

            let store = app_state.0.store.clone();
            generating.set(true);
            spawn_local(async move {
                match ApiClient::from_env().generate_flashcards(&body).await {
                    Ok(cards) => {
                        let title = if note_title.trim().is_empty() {
                            UNTITLED.to_string()
                        } else {
                            note_title.trim().to_string()
                        };

                        let mut saved = 0usize;
                        let mut failure = None;
                        for c in &cards {
                            let fields = Flashcard::create_fields(
                                Some(&note_id),
                                &title,
                                &c.question,
                                &c.answer,
                            );
                            match store.create(&uid, Collection::Flashcards, fields).await {
                                Ok(_) => saved += 1,
                                Err(e) => {
                                    failure = Some(e.to_string());
                                    break;
                                }
                            }
                        }

                        match failure {
                            None => alert(&format!("Saved {saved} flashcards.")),
                            Some(e) => {
                                alert(&format!("Saved {saved} flashcards, then saving failed: {e}"))
                            }
                        }
                    }
                    Err(e) => alert(&api_failure("Flashcard generation", &e)),
                }
                generating.set(false);
            });
        }
    };

    let pdf_input_ref: NodeRef<html::Input> = NodeRef::new();
    let on_pdf_change = {
        let draft = draft.clone();
        move |ev: web_sys::Event| {
            let Some(input) = ev
                .target()
                .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
            else {
                return;
            };
            let Some(file) = input.files().and_then(|f| f.get(0)) else {
                return;
            };
            // Allow re-importing the same file later.
            input.set_value("");

            let draft = draft.clone();
            importing_pdf.set(true);
            spawn_local(async move {
                match pdf::extract_text(file).await {
                    Ok(text) if !text.is_empty() => draft.transform_body(move |b| {
                        if b.trim().is_empty() {
                            text
                        } else {
                            format!("{b}\n\n{text}")
                        }
                    }),
                    Ok(_) => alert("No text found in that PDF."),
                    Err(e) => alert(&format!("PDF import failed: {e}")),
                }
                importing_pdf.set(false);
            });
        }
    };

    let speech_state = speech.state;
    let on_insert_transcript = {
        let draft = draft.clone();
        move |_| {
            let transcript = speech_state.with_untracked(|s| s.buffer.clone());
            if transcript.trim().is_empty() {
                return;
            }
            // The buffer is deliberately kept; inserting twice is allowed.
            draft.transform_body(move |b| append_transcript(b, &transcript));
        }
    };

    let speech_toggle = {
        let speech = speech.clone();
        move |_| {
            if speech_state.with_untracked(|s| s.listening) {
                speech.stop();
            } else {
                speech.start();
            }
        }
    };

    let speech_available = speech.available();

    view! {
        <div class="grid gap-4 md:grid-cols-[240px_minmax(0,1fr)]">
            // Left column: search, folders, note list.
            <div class="flex flex-col gap-3">
                <Input
                    placeholder="Search notes..."
                    bind_value=app_state.0.search_query
                    class="h-8 text-sm"
                />

                <div class="flex flex-col gap-0.5">
                    <For
                        each=move || folders.get()
                        key=|f| f.clone()
                        children={
                            let app_state = app_state.clone();
                            move |f: String| {
                                let label = if f == ALL_FOLDERS { "All notes".to_string() } else { f.clone() };
                                let select = {
                                    let app_state = app_state.clone();
                                    let f = f.clone();
                                    move |_| app_state.0.folder_filter.set(f.clone())
                                };
                                let class = {
                                    let app_state = app_state.clone();
                                    let f = f.clone();
                                    move || {
                                        if app_state.0.folder_filter.get() == f {
                                            "rounded-md bg-accent px-2 py-1 text-left text-sm"
                                        } else {
                                            "rounded-md px-2 py-1 text-left text-sm hover:bg-accent"
                                        }
                                    }
                                };
                                view! {
                                    <button class=class on:click=select>
                                        {label}
                                    </button>
                                }
                            }
                        }
                    />
                </div>

                <Button size=ButtonSize::Sm attr:disabled=move || creating.get() on:click=on_new_note>
                    <Plus class="size-4" />
                    "New note"
                </Button>

                <div class="flex flex-col gap-1 overflow-y-auto">
                    <For
                        each=move || visible.get()
                        key=|n| (n.id.clone(), n.title.clone(), n.folder.clone(), n.pinned, n.updated_at)
                        children={
                            let app_state = app_state.clone();
                            let draft = draft.clone();
                            move |n: Note| {
                                let note = n.clone();
                                let is_active = {
                                    let app_state = app_state.clone();
                                    let id = n.id.clone();
                                    move || app_state.0.active_note_id.get().as_deref() == Some(id.as_str())
                                };
                                let on_select = {
                                    let draft = draft.clone();
                                    move |_| draft.select_note(&note)
                                };
                                let on_pin = {
                                    let app_state = app_state.clone();
                                    let id = n.id.clone();
                                    let pinned = n.pinned;
                                    move |ev: web_sys::MouseEvent| {
                                        ev.stop_propagation();
                                        let Some(uid) = app_state.0.user_id() else { return; };
                                        let store = app_state.0.store.clone();
                                        let id = id.clone();
                                        spawn_local(async move {
                                            if let Err(e) = store
                                                .merge(&uid, Collection::Notes, &id, Note::pin_patch(!pinned))
                                                .await
                                            {
                                                alert(&format!("Updating pin failed: {e}"));
                                            }
                                        });
                                    }
                                };
                                let on_delete = {
                                    let app_state = app_state.clone();
                                    let draft = draft.clone();
                                    let id = n.id.clone();
                                    move |ev: web_sys::MouseEvent| {
                                        ev.stop_propagation();
                                        if !confirm("Delete this note?") {
                                            return;
                                        }
                                        let Some(uid) = app_state.0.user_id() else { return; };
                                        if app_state.0.active_note_id.get_untracked().as_deref() == Some(id.as_str()) {
                                            draft.clear_active();
                                        }
                                        let store = app_state.0.store.clone();
                                        let id = id.clone();
                                        spawn_local(async move {
                                            if let Err(e) =
                                                store.remove(&uid, Collection::Notes, &id).await
                                            {
                                                alert(&format!("Deleting note failed: {e}"));
                                            }
                                        });
                                    }
                                };

                                let title = if n.title.trim().is_empty() {
                                    UNTITLED.to_string()
                                } else {
                                    n.title.clone()
                                };
                                let folder = n.folder.trim().to_string();
                                let pinned = n.pinned;

                                let row_class = {
                                    move || {
                                        if is_active() {
                                            "group flex cursor-pointer items-center gap-2 rounded-md border border-primary px-2 py-1.5 hover:bg-accent"
                                        } else {
                                            "group flex cursor-pointer items-center gap-2 rounded-md border px-2 py-1.5 hover:bg-accent"
                                        }
                                    }
                                };
                                let pin_class = if pinned {
                                    "rounded p-1 text-primary hover:bg-border"
                                } else {
                                    "rounded p-1 text-muted-foreground hover:bg-border"
                                };

                                view! {
                                    <div class=row_class on:click=on_select>
                                        <div class="min-w-0 flex-1">
                                            <div class="truncate text-sm">{title}</div>
                                            <Show when={let folder = folder.clone(); move || !folder.is_empty()} fallback=|| ().into_view()>
                                                <div class="truncate text-xs text-muted-foreground">{folder.clone()}</div>
                                            </Show>
                                        </div>

                                        <button class=pin_class on:click=on_pin title="Pin">
                                            <Pin class="size-3.5" />
                                        </button>
                                        <button
                                            class="rounded p-1 text-muted-foreground opacity-0 hover:bg-border group-hover:opacity-100"
                                            on:click=on_delete
                                            title="Delete"
                                        >
                                            <Trash2 class="size-3.5" />
                                        </button>
                                    </div>
                                }
                            }
                        }
                    />

                    <Show when=move || visible.with(|v| v.is_empty()) fallback=|| ().into_view()>
                        <div class="px-2 py-4 text-center text-xs text-muted-foreground">
                            "No notes match."
                        </div>
                    </Show>
                </div>
            </div>

            // Right column: the editor for the active note.
            <Show
                when=has_active
                fallback=|| view! {
                    <div class="flex items-center justify-center rounded-xl border border-dashed py-24 text-sm text-muted-foreground">
                        "Select a note on the left, or create one."
                    </div>
                }
            >
                <div class="flex flex-col gap-3">
                    <div class="flex items-center gap-2">
                        <input
                            class="w-full rounded-md border-0 bg-transparent text-lg font-semibold outline-none placeholder:text-muted-foreground"
                            placeholder="Untitled"
                            prop:value=move || machine.with(|m| m.title.clone())
                            on:input={
                                let draft = draft.clone();
                                move |ev: web_sys::Event| {
                                    if let Some(el) = ev
                                        .target()
                                        .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                                    {
                                        draft.edit_title(el.value());
                                    }
                                }
                            }
                        />
                        {move || save_status_view(machine.with(|m| m.state))}
                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Outline
                            attr:disabled=move || machine.with(|m| m.state == SaveState::Saving)
                            on:click={
                                let draft = draft.clone();
                                move |_| draft.save_now()
                            }
                        >
                            "Save"
                        </Button>
                    </div>

                    <input
                        class="w-40 rounded-md border bg-transparent px-2 py-1 text-xs outline-none placeholder:text-muted-foreground"
                        placeholder="Folder"
                        prop:value=move || machine.with(|m| m.folder.clone())
                        on:input={
                            let draft = draft.clone();
                            move |ev: web_sys::Event| {
                                if let Some(el) = ev
                                    .target()
                                    .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                                {
                                    draft.edit_folder(el.value());
                                }
                            }
                        }
                    />

                    <Show
                        when=move || machine.with(|m| m.state == SaveState::Error)
                        fallback=|| ().into_view()
                    >
                        <Alert class="border-destructive/30">
                            <AlertDescription class="text-destructive text-xs">
                                {move || machine.with(|m| m.error.clone()).unwrap_or_default()}
                                " Your text is kept; use Save to retry."
                            </AlertDescription>
                        </Alert>
                    </Show>

                    <textarea
                        class="min-h-[320px] w-full resize-y rounded-md border bg-transparent px-3 py-2 text-sm outline-none placeholder:text-muted-foreground"
                        placeholder="Write, dictate, or import a PDF..."
                        prop:value=move || machine.with(|m| m.body.clone())
                        on:input={
                            let draft = draft.clone();
                            move |ev: web_sys::Event| {
                                if let Some(el) = ev
                                    .target()
                                    .and_then(|t| t.dyn_into::<web_sys::HtmlTextAreaElement>().ok())
                                {
                                    draft.edit_body(el.value());
                                }
                            }
                        }
                    ></textarea>

                    <div class="flex flex-wrap items-center gap-2">
                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Outline
                            attr:disabled=move || summarizing.get()
                            on:click=on_summarize
                        >
                            <Show when=move || summarizing.get() fallback=|| view! { <Sparkles class="size-4" /> }>
                                <Spinner />
                            </Show>
                            "Summarize"
                        </Button>

                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Outline
                            attr:disabled=move || generating.get()
                            on:click=on_generate_cards
                        >
                            <Show when=move || generating.get() fallback=|| view! { <Sparkles class="size-4" /> }>
                                <Spinner />
                            </Show>
                            "Generate flashcards"
                        </Button>

                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Outline
                            attr:disabled=move || importing_pdf.get()
                            on:click=move |_| {
                                if let Some(input) = pdf_input_ref.get_untracked() {
                                    input.click();
                                }
                            }
                        >
                            <Show when=move || importing_pdf.get() fallback=|| view! { <FileText class="size-4" /> }>
                                <Spinner />
                            </Show>
                            "Import PDF"
                        </Button>
                        <input
                            r#type="file"
                            accept="application/pdf,.pdf"
                            class="hidden"
                            node_ref=pdf_input_ref
                            on:change=on_pdf_change
                        />
                    </div>

                    // Dictation block.
                    <div class="rounded-md border px-3 py-2">
                        <Show
                            when=move || speech_available
                            fallback=|| view! {
                                <div class="text-xs text-muted-foreground">
                                    "Speech recognition is not available in this browser."
                                </div>
                            }
                        >
                            <div class="flex flex-wrap items-center gap-2">
                                <Button
                                    size=ButtonSize::Sm
                                    variant=ButtonVariant::Outline
                                    on:click=speech_toggle
                                >
                                    <Mic class="size-4" />
                                    {move || if speech_state.with(|s| s.listening) { "Stop dictation" } else { "Start dictation" }}
                                </Button>

                                <Show when=move || speech_state.with(|s| s.listening) fallback=|| ().into_view()>
                                    <span class="inline-flex items-center gap-1 text-xs text-destructive">
                                        <span class="size-2 animate-pulse rounded-full bg-destructive"></span>
                                        "Listening"
                                    </span>
                                </Show>

                                <Button
                                    size=ButtonSize::Sm
                                    variant=ButtonVariant::Ghost
                                    attr:disabled=move || speech_state.with(|s| s.buffer.trim().is_empty())
                                    on:click=on_insert_transcript
                                >
                                    "Insert into note"
                                </Button>

                                <Button
                                    size=ButtonSize::Sm
                                    variant=ButtonVariant::Ghost
                                    attr:disabled=move || speech_state.with(|s| s.buffer.is_empty())
                                    on:click=move |_| speech_state.update(|s| s.clear())
                                >
                                    <X class="size-4" />
                                    "Clear"
                                </Button>
                            </div>

                            <Show when=move || !speech_state.with(|s| s.buffer.is_empty()) fallback=|| ().into_view()>
                                <p class="mt-2 line-clamp-3 text-xs text-muted-foreground">
                                    {move || speech_state.with(|s| s.buffer.clone())}
                                </p>
                            </Show>
                        </Show>
                    </div>
                </div>
            </Show>
        </div>
    }
}

#[component]
pub fn CalendarPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let month = RwSignal::new(today_local().with_day(1).unwrap_or_else(today_local));
    let selected: RwSignal<Option<chrono::NaiveDate>> = RwSignal::new(Some(today_local()));

    let tasks = app_state.0.tasks;
    let by_date = Memo::new(move |_| tasks_by_date(&tasks.get()));

    // Task form.
    let task_title: RwSignal<String> = RwSignal::new(String::new());
    let task_folder: RwSignal<String> = RwSignal::new(String::new());
    let task_due: RwSignal<String> = RwSignal::new(date_key(today_local()));

    // Keep the form's due date following the selected day.
    Effect::new(move |_| {
        if let Some(d) = selected.get() {
            task_due.set(date_key(d));
        }
    });

    let adding: RwSignal<bool> = RwSignal::new(false);
    let on_add_task = {
        let app_state = app_state.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();

            let Some(uid) = app_state.0.user_id() else {
                return;
            };
            let title = task_title.get_untracked();
            if title.trim().is_empty() {
                return;
            }

            let fields = Task::create_fields(
                &title,
                &task_folder.get_untracked(),
                &task_due.get_untracked(),
            );
            let store = app_state.0.store.clone();

            adding.set(true);
            spawn_local(async move {
                match store.create(&uid, Collection::Tasks, fields).await {
                    Ok(_) => task_title.set(String::new()),
                    Err(e) => alert(&format!("Adding task failed: {e}")),
                }
                adding.set(false);
            });
        }
    };

    let selected_tasks = move || {
        selected
            .get()
            .and_then(|d| by_date.with(|m| m.get(&date_key(d)).cloned()))
            .unwrap_or_default()
    };

    let today = today_local();

    view! {
        <div class="grid gap-4 md:grid-cols-[minmax(0,1fr)_280px]">
            <div>
                <div class="mb-2 flex items-center gap-2">
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::IconSm
                        on:click=move |_| month.update(|m| *m = prev_month(*m))
                    >
                        <ChevronLeft class="size-4" />
                    </Button>
                    <span class="w-40 text-center text-sm font-medium">
                        {move || month.get().format("%B %Y").to_string()}
                    </span>
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::IconSm
                        on:click=move |_| month.update(|m| *m = next_month(*m))
                    >
                        <ChevronRight class="size-4" />
                    </Button>
                </div>

                <div class="grid grid-cols-7 gap-1 text-center text-xs text-muted-foreground">
                    {["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
                        .into_iter()
                        .map(|d| view! { <div class="py-1">{d}</div> })
                        .collect_view()}
                </div>

                <div class="grid grid-cols-7 gap-1">
                    {move || {
                        let m = month.get();
                        calendar_grid(m)
                            .into_iter()
                            .map(|date| {
                                let key = date_key(date);
                                let in_month = date.month() == m.month() && date.year() == m.year();
                                let is_today = date == today;
                                let day_tasks = by_date.with(|map| map.get(&key).cloned());
                                let count = day_tasks.as_ref().map(|t| t.len()).unwrap_or(0);
                                let open = day_tasks
                                    .as_ref()
                                    .map(|t| day_has_open_tasks(t))
                                    .unwrap_or(false);
                                let is_selected = selected.get() == Some(date);

                                let mut cell_class = String::from(
                                    "flex h-16 flex-col items-start gap-1 rounded-md border p-1.5 text-left text-xs hover:bg-accent",
                                );
                                if !in_month {
                                    cell_class.push_str(" opacity-40");
                                }
                                if is_selected {
                                    cell_class.push_str(" border-primary");
                                }
                                if is_today {
                                    cell_class.push_str(" font-semibold");
                                }
                                let dot_class = if open {
                                    "size-1.5 rounded-full bg-amber-500"
                                } else {
                                    "size-1.5 rounded-full bg-emerald-500"
                                };

                                view! {
                                    <button class=cell_class on:click=move |_| selected.set(Some(date))>
                                        <span>{date.day()}</span>
                                        <Show when=move || { count > 0 } fallback=|| ().into_view()>
                                            <span class="inline-flex items-center gap-1">
                                                <span class=dot_class></span>
                                                <span class="text-muted-foreground">{count}</span>
                                            </span>
                                        </Show>
                                    </button>
                                }
                            })
                            .collect_view()
                    }}
                </div>
            </div>

            <div class="flex flex-col gap-3">
                <Card>
                    <CardHeader>
                        <CardTitle class="text-sm">
                            {move || {
                                selected
                                    .get()
                                    .map(|d| d.format("%A, %b %e").to_string())
                                    .unwrap_or_else(|| "Pick a day".to_string())
                            }}
                        </CardTitle>
                    </CardHeader>
                    <CardContent>
                        <div class="flex flex-col gap-1">
                            <For
                                each=selected_tasks
                                key=|t| (t.id.clone(), t.done, t.title.clone())
                                children={
                                    let app_state = app_state.clone();
                                    move |t: Task| {
                                        let on_toggle = {
                                            let app_state = app_state.clone();
                                            let id = t.id.clone();
                                            let done = t.done;
                                            move |_| {
                                                let Some(uid) = app_state.0.user_id() else { return; };
                                                let store = app_state.0.store.clone();
                                                let id = id.clone();
                                                spawn_local(async move {
                                                    if let Err(e) = store
                                                        .merge(&uid, Collection::Tasks, &id, Task::done_patch(!done))
                                                        .await
                                                    {
                                                        alert(&format!("Updating task failed: {e}"));
                                                    }
                                                });
                                            }
                                        };
                                        let on_delete = {
                                            let app_state = app_state.clone();
                                            let id = t.id.clone();
                                            move |_| {
                                                if !confirm("Delete this task?") {
                                                    return;
                                                }
                                                let Some(uid) = app_state.0.user_id() else { return; };
                                                let store = app_state.0.store.clone();
                                                let id = id.clone();
                                                spawn_local(async move {
                                                    if let Err(e) =
                                                        store.remove(&uid, Collection::Tasks, &id).await
                                                    {
                                                        alert(&format!("Deleting task failed: {e}"));
                                                    }
                                                });
                                            }
                                        };

                                        let done = t.done;
                                        let folder = t.folder.trim().to_string();
                                        let title_class = if done {
                                            "flex-1 truncate text-sm line-through text-muted-foreground"
                                        } else {
                                            "flex-1 truncate text-sm"
                                        };
                                        view! {
                                            <div class="group flex items-center gap-2 rounded-md px-1 py-1 hover:bg-accent">
                                                <input
                                                    r#type="checkbox"
                                                    prop:checked=move || done
                                                    on:change=on_toggle
                                                />
                                                <span class=title_class>
                                                    {t.title.clone()}
                                                </span>
                                                <Show when={let folder = folder.clone(); move || !folder.is_empty()} fallback=|| ().into_view()>
                                                    <span class="rounded bg-accent px-1.5 py-0.5 text-[10px] text-muted-foreground">
                                                        {folder.clone()}
                                                    </span>
                                                </Show>
                                                <button
                                                    class="rounded p-1 text-muted-foreground opacity-0 hover:bg-border group-hover:opacity-100"
                                                    on:click=on_delete
                                                >
                                                    <Trash2 class="size-3.5" />
                                                </button>
                                            </div>
                                        }
                                    }
                                }
                            />

                            <Show when=move || selected_tasks().is_empty() fallback=|| ().into_view()>
                                <div class="py-2 text-xs text-muted-foreground">"No tasks due."</div>
                            </Show>
                        </div>
                    </CardContent>
                </Card>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-sm">"Add task"</CardTitle>
                    </CardHeader>
                    <CardContent>
                        <form class="flex flex-col gap-2" on:submit=on_add_task>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="task-title" class="text-xs">"Title"</Label>
                                <Input
                                    id="task-title"
                                    placeholder="Finish problem set"
                                    bind_value=task_title
                                    required=true
                                    class="h-8 text-sm"
                                />
                            </div>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="task-folder" class="text-xs">"Folder"</Label>
                                <Input
                                    id="task-folder"
                                    placeholder="optional"
                                    bind_value=task_folder
                                    class="h-8 text-sm"
                                />
                            </div>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="task-due" class="text-xs">"Due"</Label>
                                <Input
                                    id="task-due"
                                    r#type="date"
                                    bind_value=task_due
                                    class="h-8 text-sm"
                                />
                            </div>
                            <Button size=ButtonSize::Sm attr:disabled=move || adding.get()>
                                <Plus class="size-4" />
                                "Add"
                            </Button>
                        </form>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn StudyPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let only_active: RwSignal<bool> = RwSignal::new(false);
    let index: RwSignal<usize> = RwSignal::new(0);
    let show_answer: RwSignal<bool> = RwSignal::new(false);

    let flashcards = app_state.0.flashcards;
    let active_note_id = app_state.0.active_note_id;
    let deck = Memo::new(move |_| {
        let filter = if only_active.get() {
            active_note_id.get()
        } else {
            None
        };
        study_deck(&flashcards.get(), filter.as_deref())
    });

    let deck_len = move || deck.with(|d| d.len());

    let current = move || {
        deck.with(|d| {
            if d.is_empty() {
                None
            } else {
                Some(d[index.get().min(d.len() - 1)].clone())
            }
        })
    };

    let on_prev = move |_| {
        let len = deck_len();
        if len == 0 {
            return;
        }
        index.update(|i| *i = (*i + len - 1) % len);
        show_answer.set(false);
    };

    let on_next = move |_| {
        let len = deck_len();
        if len == 0 {
            return;
        }
        index.update(|i| *i = (*i + 1) % len);
        show_answer.set(false);
    };

    let on_toggle_scope = move |_| {
        only_active.update(|v| *v = !*v);
        index.set(0);
        show_answer.set(false);
    };

    view! {
        <div class="mx-auto flex w-full max-w-2xl flex-col gap-4">
            <div class="flex items-center gap-3">
                <h1 class="text-lg font-semibold">"Study"</h1>
                <label class="ml-auto flex items-center gap-2 text-xs text-muted-foreground">
                    <input
                        r#type="checkbox"
                        prop:checked=move || only_active.get()
                        on:change=on_toggle_scope
                    />
                    "Only the open note"
                </label>
            </div>

            <Show
                when=move || { deck_len() > 0 }
                fallback=|| view! {
                    <div class="flex flex-col items-center justify-center gap-2 rounded-xl border border-dashed py-24 text-sm text-muted-foreground">
                        "No flashcards yet."
                        <span class="text-xs">"Generate some from a note to start studying."</span>
                    </div>
                }
            >
                {move || {
                    current()
                        .map(|card| {
                            let question = card.question.clone();
                            let answer = card.answer.clone();
                            let note_title = card.note_title.trim().to_string();
                            let has_source = !note_title.is_empty();
                            view! {
                                <Card class="min-h-[260px]">
                                    <CardHeader>
                                        <CardDescription class="text-xs">
                                            {move || format!("{} / {}", index.get().min(deck_len().saturating_sub(1)) + 1, deck_len())}
                                        </CardDescription>
                                        <CardTitle class="text-base leading-snug">{question}</CardTitle>
                                    </CardHeader>
                                    <CardContent>
                                        <Show
                                            when=move || show_answer.get()
                                            fallback=move || view! {
                                                <Button
                                                    size=ButtonSize::Sm
                                                    variant=ButtonVariant::Outline
                                                    on:click=move |_| show_answer.set(true)
                                                >
                                                    "Show answer"
                                                </Button>
                                            }
                                        >
                                            <p class="whitespace-pre-wrap text-sm">{answer.clone()}</p>
                                        </Show>

                                        <Show when=move || has_source fallback=|| ().into_view()>
                                            <p class="mt-4 text-xs text-muted-foreground">
                                                "From: " {note_title.clone()}
                                            </p>
                                        </Show>
                                    </CardContent>
                                </Card>
                            }
                        })
                }}

                <div class="flex items-center justify-center gap-2">
                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_prev>
                        <ChevronLeft class="size-4" />
                        "Previous"
                    </Button>
                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_next>
                        "Next"
                        <ChevronRight class="size-4" />
                    </Button>
                </div>
            </Show>
        </div>
    }
}

use crate::models::ThemeMode;

pub(crate) const THEME_KEY: &str = "studydesk_theme";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn load_string(key: &str) -> Option<String> {
    local_storage().and_then(|s| s.get_item(key).ok().flatten())
}

pub(crate) fn save_string(key: &str, value: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.set_item(key, value);
    }
}

/// Theme flag read once at startup. Unknown or missing values fall back to
/// light.
pub(crate) fn load_theme() -> ThemeMode {
    load_string(THEME_KEY)
        .and_then(|v| v.parse::<ThemeMode>().ok())
        .unwrap_or_default()
}

/// Written on every toggle.
pub(crate) fn save_theme(theme: ThemeMode) {
    save_string(THEME_KEY, &theme.to_string());
}

/// Mirror the theme onto the document root so the `dark` Tailwind variant
/// takes effect.
pub(crate) fn apply_theme_class(theme: ThemeMode) {
    let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    else {
        return;
    };

    let classes = root.class_list();
    let _ = match theme {
        ThemeMode::Dark => classes.add_1("dark"),
        ThemeMode::Light => classes.remove_1("dark"),
    };
}

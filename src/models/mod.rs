use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{StoreDoc, SERVER_TIMESTAMP};

pub(crate) const DEFAULT_NOTE_TITLE: &str = "New Note";

/// Title written when the user saves a note with an empty title.
pub(crate) const UNTITLED: &str = "Untitled";

/// Identity-provider user, as delivered by the auth bridge.
///
/// Only `uid` is load-bearing (it scopes every store path); the rest is
/// display sugar and kept flexible.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct UserInfo {
    pub uid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

impl UserInfo {
    pub fn from_value(v: &Value) -> Option<Self> {
        let uid = field_str(v, "uid");
        if uid.trim().is_empty() {
            return None;
        }
        Some(Self {
            uid,
            display_name: field_str(v, "displayName"),
            email: field_str(v, "email"),
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Note {
    pub id: String,
    pub title: String,
    /// Folder label; stored under the legacy `className` field. Empty = unfiled.
    pub folder: String,
    pub body: String,
    pub pinned: bool,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Note {
    /// Parse one store document. Documents with a blank id are dropped.
    pub fn from_doc(doc: &StoreDoc) -> Option<Self> {
        if doc.id.trim().is_empty() {
            return None;
        }
        Some(Self {
            id: doc.id.clone(),
            title: field_str(&doc.fields, "title"),
            folder: field_str(&doc.fields, "className"),
            body: field_str(&doc.fields, "body"),
            pinned: field_bool(&doc.fields, "pinned"),
            created_at: field_ms(&doc.fields, "createdAt"),
            updated_at: field_ms(&doc.fields, "updatedAt"),
        })
    }

    /// Fields for a freshly created note.
    pub fn create_fields() -> Value {
        serde_json::json!({
            "title": DEFAULT_NOTE_TITLE,
            "className": "",
            "body": "",
            "pinned": false,
            "createdAt": SERVER_TIMESTAMP,
            "updatedAt": SERVER_TIMESTAMP,
        })
    }

    /// Merge-patch toggling the pinned flag.
    pub fn pin_patch(pinned: bool) -> Value {
        serde_json::json!({
            "pinned": pinned,
            "updatedAt": SERVER_TIMESTAMP,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Task {
    pub id: String,
    pub title: String,
    pub folder: String,
    /// Calendar-date string (`YYYY-MM-DD`), no time component. May be empty.
    pub due: String,
    pub done: bool,
    pub created_at: Option<i64>,
}

impl Task {
    pub fn from_doc(doc: &StoreDoc) -> Option<Self> {
        if doc.id.trim().is_empty() {
            return None;
        }
        Some(Self {
            id: doc.id.clone(),
            title: field_str(&doc.fields, "title"),
            folder: field_str(&doc.fields, "className"),
            due: field_str(&doc.fields, "due"),
            done: field_bool(&doc.fields, "done"),
            created_at: field_ms(&doc.fields, "createdAt"),
        })
    }

    pub fn create_fields(title: &str, folder: &str, due: &str) -> Value {
        serde_json::json!({
            "title": title.trim(),
            "className": folder.trim(),
            "due": due.trim(),
            "done": false,
            "createdAt": SERVER_TIMESTAMP,
        })
    }

    pub fn done_patch(done: bool) -> Value {
        serde_json::json!({ "done": done })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Flashcard {
    pub id: String,
    /// Back-reference to the owning note. Not an ownership relation; the note
    /// may be deleted while the card lives on.
    pub note_id: Option<String>,
    /// Snapshot of the owning note's title at generation time, not live.
    /// Renaming the note does not update it.
    pub note_title: String,
    pub question: String,
    pub answer: String,
    pub created_at: Option<i64>,
}

impl Flashcard {
    pub fn from_doc(doc: &StoreDoc) -> Option<Self> {
        if doc.id.trim().is_empty() {
            return None;
        }
        let note_id = field_str(&doc.fields, "noteId");
        Some(Self {
            id: doc.id.clone(),
            note_id: if note_id.trim().is_empty() {
                None
            } else {
                Some(note_id)
            },
            note_title: field_str(&doc.fields, "noteTitle"),
            question: field_str(&doc.fields, "question"),
            answer: field_str(&doc.fields, "answer"),
            created_at: field_ms(&doc.fields, "createdAt"),
        })
    }

    pub fn create_fields(
        note_id: Option<&str>,
        note_title: &str,
        question: &str,
        answer: &str,
    ) -> Value {
        serde_json::json!({
            "noteId": note_id.unwrap_or(""),
            "noteTitle": note_title,
            "question": question,
            "answer": answer,
            "createdAt": SERVER_TIMESTAMP,
        })
    }
}

/// Theme preference, persisted to localStorage as its lowercase name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

fn field_str(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(|f| f.as_str())
        .unwrap_or_default()
        .to_string()
}

fn field_bool(v: &Value, key: &str) -> bool {
    v.get(key).and_then(|f| f.as_bool()).unwrap_or(false)
}

fn field_ms(v: &Value, key: &str) -> Option<i64> {
    let f = v.get(key)?;
    f.as_i64().or_else(|| f.as_f64().map(|x| x.round() as i64))
}

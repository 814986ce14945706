//! Thin client for the two AI-backed endpoints.
//!
//! Both are single POST round trips with a JSON `{text}` body and no retry;
//! any non-success status is a failure whose detail is the response body.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// At most this many cards are persisted per generation call.
pub(crate) const MAX_CARDS_PER_BATCH: usize = 25;
pub(crate) const MAX_QUESTION_CHARS: usize = 500;
pub(crate) const MAX_ANSWER_CHARS: usize = 1500;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    /// `window.ENV.API_URL` override, else same-origin.
    pub fn new() -> Self {
        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    if let Ok(api_url) = js_sys::Reflect::get(&env, &"API_URL".into()) {
                        if let Some(url_str) = api_url.as_string() {
                            return Self { api_url: url_str };
                        }
                    }
                }
            }

            if let Ok(origin) = window.location().origin() {
                return Self { api_url: origin };
            }
        }

        Self {
            api_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Clone, Debug)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize, Clone, Debug)]
struct SummarizeResponse {
    summary: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CardCandidate {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Deserialize, Clone, Debug)]
struct FlashcardsResponse {
    #[serde(default)]
    cards: Vec<CardCandidate>,
}

/// Drop unusable candidates, enforce the per-field bounds, and cap the batch.
pub(crate) fn clamp_candidates(cards: Vec<CardCandidate>) -> Vec<CardCandidate> {
    cards
        .into_iter()
        .filter(|c| !c.question.trim().is_empty() && !c.answer.trim().is_empty())
        .map(|c| CardCandidate {
            question: truncate_chars(c.question.trim(), MAX_QUESTION_CHARS),
            answer: truncate_chars(c.answer.trim(), MAX_ANSWER_CHARS),
        })
        .take(MAX_CARDS_PER_BATCH)
        .collect()
}

/// Char-boundary-safe truncation.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[derive(Clone)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    pub fn from_env() -> Self {
        Self::new(EnvConfig::new().api_url)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> ApiResult<T> {
        let client = reqwest::Client::new();
        let url = format!("{}{}", self.base_url, path);
        let res = client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, "Request failed"))
        }
    }

    pub async fn summarize(&self, text: &str) -> ApiResult<String> {
        let res: SummarizeResponse = self
            .post_json("/api/summarize", &TextRequest { text })
            .await?;

        let summary = res.summary.trim().to_string();
        if summary.is_empty() {
            return Err(ApiError::parse("summarize returned an empty summary"));
        }
        Ok(summary)
    }

    /// Returns the clamped candidate list; persisting them is the caller's
    /// business so a malformed response stays side-effect free.
    pub async fn generate_flashcards(&self, text: &str) -> ApiResult<Vec<CardCandidate>> {
        let res: FlashcardsResponse = self
            .post_json("/api/flashcards", &TextRequest { text })
            .await?;

        let cards = clamp_candidates(res.cards);
        if cards.is_empty() {
            return Err(ApiError::parse("flashcard generation returned no usable cards"));
        }
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(q: &str, a: &str) -> CardCandidate {
        CardCandidate {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn thirty_candidates_clamp_to_twenty_five() {
        let cards: Vec<_> = (0..30).map(|i| card(&format!("q{i}"), "a")).collect();
        let out = clamp_candidates(cards);
        assert_eq!(out.len(), MAX_CARDS_PER_BATCH);
        assert_eq!(out[0].question, "q0");
        assert_eq!(out[24].question, "q24");
    }

    #[test]
    fn clamped_batch_persists_exactly_twenty_five_cards() {
        use crate::models::Flashcard;
        use crate::store::fake::FakeStore;
        use crate::store::{Collection, DocumentStore};
        use futures::executor::block_on;

        let candidates: Vec<_> = (0..30).map(|i| card(&format!("q{i}"), "a")).collect();
        let cards = clamp_candidates(candidates);

        let store = FakeStore::new();
        for c in &cards {
            let fields = Flashcard::create_fields(Some("n1"), "Bio 101", &c.question, &c.answer);
            block_on(store.create("u1", Collection::Flashcards, fields)).unwrap();
        }
        assert_eq!(store.doc_count("u1", Collection::Flashcards), 25);
    }

    #[test]
    fn blank_candidates_are_dropped() {
        let out = clamp_candidates(vec![
            card("q", "a"),
            card("   ", "a"),
            card("q", ""),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn long_fields_truncate_on_char_boundaries() {
        let long_q = "é".repeat(MAX_QUESTION_CHARS + 10);
        let long_a = "語".repeat(MAX_ANSWER_CHARS + 3);
        let out = clamp_candidates(vec![card(&long_q, &long_a)]);
        assert_eq!(out[0].question.chars().count(), MAX_QUESTION_CHARS);
        assert_eq!(out[0].answer.chars().count(), MAX_ANSWER_CHARS);
    }

    #[test]
    fn flashcards_response_contract_deserialize() {
        let json = r#"{ "cards": [ { "question": "Q1", "answer": "A1" }, { "question": "Q2", "answer": "A2" } ] }"#;
        let parsed: FlashcardsResponse = serde_json::from_str(json).expect("cards should parse");
        assert_eq!(parsed.cards.len(), 2);
        assert_eq!(parsed.cards[1], card("Q2", "A2"));
    }

    #[test]
    fn flashcards_response_tolerates_missing_cards_field() {
        let parsed: FlashcardsResponse = serde_json::from_str("{}").expect("should parse");
        assert!(parsed.cards.is_empty());
    }

    #[test]
    fn summarize_response_contract_deserialize() {
        let parsed: SummarizeResponse =
            serde_json::from_str(r#"{ "summary": "short" }"#).expect("summary should parse");
        assert_eq!(parsed.summary, "short");
    }

    #[test]
    fn api_error_display_is_message() {
        let e = ApiError {
            kind: ApiErrorKind::Http,
            message: "Request failed (500): boom".to_string(),
        };
        assert_eq!(e.to_string(), "Request failed (500): boom");
    }
}

//! PDF text extraction.
//!
//! Decoding is delegated to the host page's PDF library (`window.pdfjsLib`);
//! this module drives it page by page and formats the combined text. One
//! round trip per file, no retry.

use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::bridge::{bridge_fn, js_error_message};

#[derive(Clone, Debug)]
pub(crate) struct PdfError {
    pub message: String,
}

impl PdfError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Whether the host page loaded a PDF library.
pub(crate) fn available() -> bool {
    pdf_lib().is_ok()
}

fn pdf_lib() -> Result<Object, PdfError> {
    let window = web_sys::window().ok_or_else(|| PdfError::new("no window"))?;
    Reflect::get(&window, &"pdfjsLib".into())
        .ok()
        .filter(|v| v.is_object())
        .map(|v| v.unchecked_into())
        .ok_or_else(|| PdfError::new("PDF library is not loaded on this page"))
}

async fn await_promise(value: JsValue, ctx: &str) -> Result<JsValue, PdfError> {
    let promise: js_sys::Promise = value
        .dyn_into()
        .map_err(|_| PdfError::new(format!("{ctx} did not return a promise")))?;
    JsFuture::from(promise)
        .await
        .map_err(|e| PdfError::new(js_error_message(&e)))
}

/// Space-join the text fragments of one page.
fn page_text<I: IntoIterator<Item = String>>(fragments: I) -> String {
    fragments
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `[Page N]`-prefixed pages separated by a blank line, trimmed overall.
pub(crate) fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[Page {}]\n{}", i + 1, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

/// Decode `file` and return its concatenated per-page text.
pub(crate) async fn extract_text(file: web_sys::File) -> Result<String, PdfError> {
    let lib = pdf_lib()?;

    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| PdfError::new(js_error_message(&e)))?;

    let params = Object::new();
    Reflect::set(&params, &"data".into(), &buffer)
        .map_err(|e| PdfError::new(js_error_message(&e)))?;

    let get_document = bridge_fn(&lib, "getDocument").map_err(PdfError::new)?;
    let loading_task = get_document
        .call1(&lib, &params)
        .map_err(|e| PdfError::new(js_error_message(&e)))?;
    let doc_promise = Reflect::get(&loading_task, &"promise".into())
        .map_err(|e| PdfError::new(js_error_message(&e)))?;
    let doc = await_promise(doc_promise, "getDocument").await?;

    let num_pages = Reflect::get(&doc, &"numPages".into())
        .ok()
        .and_then(|v| v.as_f64())
        .map(|n| n as u32)
        .ok_or_else(|| PdfError::new("document has no page count"))?;

    let get_page = bridge_fn(doc.unchecked_ref(), "getPage").map_err(PdfError::new)?;

    let mut pages = Vec::with_capacity(num_pages as usize);
    for page_no in 1..=num_pages {
        let page_value = get_page
            .call1(&doc, &JsValue::from_f64(page_no as f64))
            .map_err(|e| PdfError::new(js_error_message(&e)))?;
        let page = await_promise(page_value, "getPage").await?;

        let get_text = bridge_fn(page.unchecked_ref(), "getTextContent").map_err(PdfError::new)?;
        let content_value = get_text
            .call0(&page)
            .map_err(|e| PdfError::new(js_error_message(&e)))?;
        let content = await_promise(content_value, "getTextContent").await?;

        let items: js_sys::Array = Reflect::get(&content, &"items".into())
            .ok()
            .and_then(|v| v.dyn_into().ok())
            .ok_or_else(|| PdfError::new("page text content has no items"))?;

        let fragments = items.iter().filter_map(|item| {
            Reflect::get(&item, &"str".into())
                .ok()
                .and_then(|v| v.as_string())
        });
        pages.push(page_text(fragments));
    }

    Ok(join_pages(&pages))
}

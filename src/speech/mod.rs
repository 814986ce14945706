//! Live speech-to-text transcription.
//!
//! Wraps the host's continuous recognition capability. Only finalized
//! segments reach the buffer; interim results are discarded, never shown.
//! Errors and natural end-of-stream both drop the listening flag and keep
//! the accumulated text.

use std::rc::Rc;

use js_sys::Reflect;
use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{SpeechRecognition, SpeechRecognitionError, SpeechRecognitionEvent};

/// Pure session state; the recognizer backend drives it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TranscriptionState {
    pub listening: bool,
    pub buffer: String,
}

impl TranscriptionState {
    pub fn on_start(&mut self) {
        self.listening = true;
    }

    /// Append one finalized segment, space-joined. Blank segments are
    /// ignored.
    pub fn push_final(&mut self, segment: &str) {
        let segment = segment.trim();
        if segment.is_empty() {
            return;
        }
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        self.buffer.push_str(segment);
    }

    /// Recognition error: stop listening, keep the buffer.
    pub fn on_error(&mut self) {
        self.listening = false;
    }

    /// Natural end of stream: same as an error, silently.
    pub fn on_end(&mut self) {
        self.listening = false;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

struct Recognizer {
    rec: SpeechRecognition,
    _onresult: Closure<dyn FnMut(SpeechRecognitionEvent)>,
    _onerror: Closure<dyn FnMut(SpeechRecognitionError)>,
    _onend: Closure<dyn FnMut(web_sys::Event)>,
}

#[derive(Clone)]
pub(crate) struct TranscriptionSession {
    pub state: RwSignal<TranscriptionState>,
    recognizer: Rc<Option<Recognizer>>,
}

/// Chrome still ships the capability under the `webkit` prefix only.
fn recognition_constructor() -> Option<js_sys::Function> {
    let window = web_sys::window()?;
    for name in ["SpeechRecognition", "webkitSpeechRecognition"] {
        if let Ok(v) = Reflect::get(&window, &name.into()) {
            if let Ok(ctor) = v.dyn_into::<js_sys::Function>() {
                return Some(ctor);
            }
        }
    }
    None
}

fn build_recognizer(state: RwSignal<TranscriptionState>) -> Option<Recognizer> {
    let ctor = recognition_constructor()?;
    let rec: SpeechRecognition = js_sys::Reflect::construct(&ctor, &js_sys::Array::new())
        .ok()?
        .unchecked_into();

    rec.set_continuous(true);
    rec.set_interim_results(true);

    let onresult = Closure::<dyn FnMut(SpeechRecognitionEvent)>::new(
        move |ev: SpeechRecognitionEvent| {
            let Some(results) = ev.results() else {
                return;
            };
            for i in ev.result_index()..results.length() {
                let Some(result) = results.get(i) else {
                    continue;
                };
                if !result.is_final() {
                    continue;
                }
                if let Some(alt) = result.get(0) {
                    state.update(|s| s.push_final(&alt.transcript()));
                }
            }
        },
    );
    rec.set_onresult(Some(onresult.as_ref().unchecked_ref()));

    let onerror =
        Closure::<dyn FnMut(SpeechRecognitionError)>::new(move |_: SpeechRecognitionError| {
            state.update(|s| s.on_error());
        });
    rec.set_onerror(Some(onerror.as_ref().unchecked_ref()));

    let onend = Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
        state.update(|s| s.on_end());
    });
    rec.set_onend(Some(onend.as_ref().unchecked_ref()));

    Some(Recognizer {
        rec,
        _onresult: onresult,
        _onerror: onerror,
        _onend: onend,
    })
}

impl TranscriptionSession {
    pub fn new() -> Self {
        let state = RwSignal::new(TranscriptionState::default());
        Self {
            state,
            recognizer: Rc::new(build_recognizer(state)),
        }
    }

    /// False when the host runtime offers no recognition capability; the UI
    /// disables the feature and says so.
    pub fn available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn start(&self) {
        let Some(r) = self.recognizer.as_ref() else {
            return;
        };
        match r.rec.start() {
            Ok(()) => self.state.update(|s| s.on_start()),
            Err(e) => {
                leptos::logging::warn!(
                    "speech recognition failed to start: {}",
                    crate::bridge::js_error_message(&JsValue::from(e))
                );
                self.state.update(|s| s.on_error());
            }
        }
    }

    pub fn stop(&self) {
        if let Some(r) = self.recognizer.as_ref() {
            // `onend` fires and clears the listening flag.
            let _ = r.rec.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_segments_accumulate_space_joined() {
        let mut s = TranscriptionState::default();
        s.on_start();
        s.push_final("the krebs cycle ");
        s.push_final("   ");
        s.push_final(" produces ATP");
        assert_eq!(s.buffer, "the krebs cycle produces ATP");
        assert!(s.listening);
    }

    #[test]
    fn error_stops_listening_but_keeps_buffer() {
        let mut s = TranscriptionState::default();
        s.on_start();
        s.push_final("partial notes");
        s.on_error();
        assert!(!s.listening);
        assert_eq!(s.buffer, "partial notes");
    }

    #[test]
    fn natural_end_behaves_like_error() {
        let mut s = TranscriptionState::default();
        s.on_start();
        s.push_final("a");
        s.on_end();
        assert!(!s.listening);
        assert_eq!(s.buffer, "a");
    }

    #[test]
    fn restart_after_end_appends_to_existing_buffer() {
        let mut s = TranscriptionState::default();
        s.on_start();
        s.push_final("first");
        s.on_end();
        s.on_start();
        s.push_final("second");
        assert_eq!(s.buffer, "first second");
    }
}

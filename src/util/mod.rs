pub(crate) const SUMMARY_OPEN: &str = "=== AI SUMMARY ===";
pub(crate) const SUMMARY_CLOSE: &str = "=== /SUMMARY ===";

pub(crate) const TRANSCRIPT_OPEN: &str = "--- TRANSCRIPT ---";
pub(crate) const TRANSCRIPT_CLOSE: &str = "--- /TRANSCRIPT ---";

pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Today in the browser's local timezone.
pub(crate) fn today_local() -> chrono::NaiveDate {
    let d = js_sys::Date::new_0();
    chrono::NaiveDate::from_ymd_opt(d.get_full_year() as i32, d.get_month() + 1, d.get_date())
        .unwrap_or_default()
}

/// The store's calendar-date string format (`YYYY-MM-DD`).
pub(crate) fn date_key(d: chrono::NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Append `text` to `body` between literal marker lines.
///
/// The body keeps whatever trailing content it had; a blank line separates it
/// from the inserted block.
pub(crate) fn append_between_markers(body: &str, text: &str, open: &str, close: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return body.to_string();
    }

    let mut out = String::with_capacity(body.len() + text.len() + open.len() + close.len() + 8);
    out.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        out.push('\n');
    }
    if !body.trim().is_empty() {
        out.push('\n');
    }
    out.push_str(open);
    out.push('\n');
    out.push_str(text);
    out.push('\n');
    out.push_str(close);
    out
}

pub(crate) fn append_summary(body: &str, summary: &str) -> String {
    append_between_markers(body, summary, SUMMARY_OPEN, SUMMARY_CLOSE)
}

pub(crate) fn append_transcript(body: &str, transcript: &str) -> String {
    append_between_markers(body, transcript, TRANSCRIPT_OPEN, TRANSCRIPT_CLOSE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_summary_wraps_in_markers() {
        let out = append_summary("notes so far", "short summary");
        assert_eq!(
            out,
            "notes so far\n\n=== AI SUMMARY ===\nshort summary\n=== /SUMMARY ==="
        );
    }

    #[test]
    fn append_into_empty_body_has_no_leading_gap() {
        let out = append_transcript("", "  hello world  ");
        assert_eq!(out, "--- TRANSCRIPT ---\nhello world\n--- /TRANSCRIPT ---");
    }

    #[test]
    fn append_blank_text_is_a_no_op() {
        assert_eq!(append_summary("body", "   "), "body");
    }

    #[test]
    fn append_after_trailing_newline_keeps_single_blank_line() {
        let out = append_summary("line\n", "s");
        assert_eq!(out, "line\n\n=== AI SUMMARY ===\ns\n=== /SUMMARY ===");
    }
}

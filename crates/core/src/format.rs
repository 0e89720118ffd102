use once_cell::sync::Lazy;
use regex::Regex;

pub const BOLD_OPEN: &str = "<b>";
pub const BOLD_CLOSE: &str = "</b>";
pub const LINE_BREAK: &str = "<br/>";

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

/// Convert `**bold**` spans and newlines into display markup.
///
/// The input is trusted: nothing is escaped, so any markup already present in
/// `raw` passes through to the renderer untouched.
pub fn format_response(raw: &str) -> String {
    let bolded = BOLD_RE.replace_all(raw, |caps: &regex::Captures| {
        format!("{}{}{}", BOLD_OPEN, &caps[1], BOLD_CLOSE)
    });
    bolded.replace('\n', LINE_BREAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_then_break() {
        assert_eq!(
            format_response("**hi** there\nfriend"),
            "<b>hi</b> there<br/>friend"
        );
    }

    #[test]
    fn multiple_spans_are_non_greedy() {
        assert_eq!(
            format_response("**a** and **b**"),
            "<b>a</b> and <b>b</b>"
        );
    }

    #[test]
    fn unmatched_markers_are_left_alone() {
        assert_eq!(format_response("2 ** 3"), "2 ** 3");
    }

    #[test]
    fn bold_does_not_span_lines() {
        assert_eq!(format_response("**a\nb**"), "**a<br/>b**");
    }

    #[test]
    fn no_escaping() {
        assert_eq!(format_response("<i>x</i>"), "<i>x</i>");
    }
}

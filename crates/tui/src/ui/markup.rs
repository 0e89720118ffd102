//! Renders the formatter's markup (`<b>`, `</b>`, `<br/>`) as styled lines.
//! Unknown text passes through untouched; an unterminated bold runs to the
//! end of the input, which is what a half-revealed response looks like.

use chat_core::format::{BOLD_CLOSE, BOLD_OPEN, LINE_BREAK};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

pub fn to_lines(markup: &str, base: Style) -> Vec<Line<'static>> {
    let bold = base.add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut in_bold = false;
    let mut rest = markup;

    while !rest.is_empty() {
        let next = [BOLD_OPEN, BOLD_CLOSE, LINE_BREAK]
            .iter()
            .filter_map(|tag| rest.find(tag).map(|at| (at, *tag)))
            .min_by_key(|(at, _)| *at);
        let (text, tag) = match next {
            Some((at, tag)) => (&rest[..at], Some(tag)),
            None => (rest, None),
        };
        if !text.is_empty() {
            let style = if in_bold { bold } else { base };
            spans.push(Span::styled(text.to_string(), style));
        }
        match tag {
            Some(t) => {
                if t == BOLD_OPEN {
                    in_bold = true;
                } else if t == BOLD_CLOSE {
                    in_bold = false;
                } else {
                    lines.push(Line::from(std::mem::take(&mut spans)));
                }
                rest = &rest[text.len() + t.len()..];
            }
            None => rest = "",
        }
    }
    lines.push(Line::from(spans));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn bold_and_breaks() {
        let lines = to_lines("<b>hi</b> there<br/>friend ", Style::default());
        assert_eq!(plain(&lines), vec!["hi there", "friend "]);
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(!lines[0].spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn partial_bold_stays_bold() {
        let lines = to_lines("<b>still ", Style::default());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn plain_text_is_one_line() {
        let lines = to_lines("a < b > c", Style::default());
        assert_eq!(plain(&lines), vec!["a < b > c"]);
        assert_eq!(to_lines("", Style::default()).len(), 1);
    }
}

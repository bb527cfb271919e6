use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

const ENTITIES: [(&str, char); 5] = [
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#39;", '\''),
];

fn flush(spans: &mut Vec<Span<'static>>, current: &mut String, style: Style) {
    if !current.is_empty() {
        spans.push(Span::styled(std::mem::take(current), style));
    }
}

/// Convert renderer markup into terminal lines.
///
/// Understands only what `bizchat_core::render` emits: `<strong>`, `</strong>`,
/// `<br/>` and the escape entities. A raw newline (user text) also breaks the
/// line. Anything else is shown as-is.
pub fn markup_lines(markup: &str, base: Style) -> Vec<Line<'static>> {
    let bold = base.add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current = String::new();
    let mut in_bold = false;
    let mut rest = markup;

    while !rest.is_empty() {
        let style = if in_bold { bold } else { base };

        if let Some(after) = rest.strip_prefix("<strong>") {
            flush(&mut spans, &mut current, style);
            in_bold = true;
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix("</strong>") {
            flush(&mut spans, &mut current, style);
            in_bold = false;
            rest = after;
            continue;
        }
        let line_break = rest
            .strip_prefix("<br/>")
            .or_else(|| rest.strip_prefix('\n'));
        if let Some(after) = line_break {
            flush(&mut spans, &mut current, style);
            lines.push(Line::from(std::mem::take(&mut spans)));
            rest = after;
            continue;
        }
        if let Some((after, c)) = ENTITIES
            .iter()
            .find_map(|&(entity, c)| rest.strip_prefix(entity).map(|after| (after, c)))
        {
            current.push(c);
            rest = after;
            continue;
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            current.push(c);
        }
        rest = chars.as_str();
    }

    flush(&mut spans, &mut current, if in_bold { bold } else { base });
    lines.push(Line::from(spans));
    lines
}

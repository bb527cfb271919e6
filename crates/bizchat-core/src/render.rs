//! Turn message text into display markup.
//!
//! Text is always HTML-escaped first. Assistant text then gets a small set of
//! markdown-like rewrites (bold, bullets, line breaks); user text is shown
//! exactly as typed. The output vocabulary is closed: `<strong>`,
//! `</strong>`, `<br/>` and the entities produced by [`escape`].

use std::sync::OnceLock;

use regex::Regex;

use crate::state::{Message, Origin};

pub const BULLET: &str = "•";

fn bold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"))
}

/// Neutralize characters that are structural in markup.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape, then apply the assistant formatting passes in order.
pub fn format_assistant_text(text: &str) -> String {
    let escaped = escape(text);
    let bolded = bold_regex().replace_all(&escaped, "<strong>$1</strong>");
    bolded
        .replace("* ", &format!("<br/>{} ", BULLET))
        .replace("\n\n", "<br/><br/>")
        .replace('\n', "<br/>")
}

pub fn render_text(text: &str, origin: Origin) -> String {
    match origin {
        Origin::User => escape(text),
        Origin::Assistant => format_assistant_text(text),
    }
}

pub fn render(message: &Message) -> String {
    render_text(message.text(), message.origin())
}

/// Standalone HTML page with one bubble per message, for exporting a chat.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Business assistant chat</title>\n");
    html.push_str(
        "<style>.chat-bubble{padding:8px 12px;margin:6px 0;border-radius:12px;max-width:70%;}\
         .chat-bubble-user{margin-left:auto;background:#dbeafe;white-space:pre-wrap;}\
         .chat-bubble-bot{background:#f3f4f6;}</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    for message in messages {
        let class = match message.origin() {
            Origin::User => "chat-bubble chat-bubble-user",
            Origin::Assistant => "chat-bubble chat-bubble-bot",
        };
        html.push_str(&format!(
            "<div class=\"{}\" data-id=\"{}\" title=\"{}\">{}</div>\n",
            class,
            message.id().0,
            message.timestamp().format("%Y-%m-%d %H:%M"),
            render(message)
        ));
    }
    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionState;

    #[test]
    fn test_bold() {
        assert_eq!(
            render_text("**bold**", Origin::Assistant),
            "<strong>bold</strong>"
        );
    }

    #[test]
    fn test_bold_is_non_greedy() {
        assert_eq!(
            render_text("**a** and **b**", Origin::Assistant),
            "<strong>a</strong> and <strong>b</strong>"
        );
    }

    #[test]
    fn test_bullets() {
        assert_eq!(
            render_text("* item1\n* item2", Origin::Assistant),
            "<br/>• item1<br/><br/>• item2"
        );
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(
            render_text("one\n\ntwo\nthree", Origin::Assistant),
            "one<br/><br/>two<br/>three"
        );
    }

    #[test]
    fn test_user_text_is_literal() {
        let rendered = render_text("**not bold**\n* not a bullet", Origin::User);
        assert_eq!(rendered, "**not bold**\n* not a bullet");
        assert!(!rendered.contains("<strong>"));
        assert!(!rendered.contains("<br/>"));
    }

    #[test]
    fn test_user_text_escaped() {
        assert_eq!(
            render_text("<b>hi</b> & \"bye\"", Origin::User),
            "&lt;b&gt;hi&lt;/b&gt; &amp; &quot;bye&quot;"
        );
    }

    #[test]
    fn test_assistant_markup_neutralized() {
        let rendered = render_text("<script>alert('x')</script> **ok**", Origin::Assistant);
        assert!(!rendered.contains("<script>"));
        assert!(rendered.starts_with("&lt;script&gt;alert(&#39;x&#39;)"));
        assert!(rendered.ends_with("<strong>ok</strong>"));
    }

    #[test]
    fn test_not_idempotent_on_output() {
        let once = render_text("* item\nnext", Origin::Assistant);
        let twice = render_text(&once, Origin::Assistant);
        assert_ne!(once, twice);
    }

    #[test]
    fn test_same_input_same_output() {
        let text = "**Plan**\n* one\n* two";
        assert_eq!(
            render_text(text, Origin::Assistant),
            render_text(text, Origin::Assistant)
        );
    }

    #[test]
    fn test_transcript_has_one_bubble_per_message() {
        let mut state = SessionState::new();
        state.append_user_message("<hi>");
        state.append_assistant_message("**hello**");

        let html = render_transcript(state.messages());
        assert_eq!(html.matches("class=\"chat-bubble ").count(), 2);
        assert!(html.contains("&lt;hi&gt;"));
        assert!(html.contains("<strong>hello</strong>"));
    }
}

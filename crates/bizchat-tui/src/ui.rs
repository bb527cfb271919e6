use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use bizchat_core::{render, NoticeLevel, Origin};

use crate::app::{App, InputMode, IntakeForm, Screen};
use crate::markup::markup_lines;

pub fn render_app(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Landing => render_landing(frame, body_area),
        Screen::Intake => render_intake(app, frame, body_area),
        Screen::Chat => render_chat(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
    render_toasts(app, frame, body_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mode = if app.session.fallback_mode().is_engaged() {
        Span::styled(" offline ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::raw("")
    };

    let title = Line::from(vec![
        Span::styled(" Business Assistant ", Style::default().fg(Color::Cyan).bold()),
        mode,
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match (app.screen, app.input_mode) {
        (Screen::Landing, _) => &[("Enter", "get started"), ("q", "quit")],
        (Screen::Intake, _) => &[
            ("Tab", "next"),
            ("S-Tab", "prev"),
            ("Enter", "next/submit"),
            ("C-s", "submit"),
            ("Esc", "back"),
        ],
        (Screen::Chat, InputMode::Editing) => &[
            ("Enter", "send"),
            ("A-Enter", "newline"),
            ("Esc", "stop typing"),
        ],
        (Screen::Chat, InputMode::Normal) => &[
            ("i", "type"),
            ("↑/↓", "select"),
            ("j/k", "scroll"),
            ("c", "copy"),
            ("e", "export"),
            ("p", "profile"),
            ("q", "quit"),
        ],
    };

    let mode_text = match app.screen {
        Screen::Landing => " WELCOME ",
        Screen::Intake => " PROFILE ",
        Screen::Chat => " CHAT ",
    };
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    for (key, label) in pairs {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_landing(frame: &mut Frame, area: Rect) {
    let [_, center, _] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(9),
        Constraint::Min(0),
    ])
    .areas(area);

    let text = Text::from(vec![
        Line::from(Span::styled(
            "Your AI Business Assistant",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from("Tell us about your business and get tailored advice on"),
        Line::from("customers, pricing, markets and channels."),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to get started",
            Style::default().fg(Color::Yellow),
        )),
    ]);

    let landing = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(landing, center);
}

fn render_intake(app: &App, frame: &mut Frame, area: Rect) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Tell us about your business ");
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let mut constraints = vec![Constraint::Length(3); IntakeForm::LABELS.len()];
    constraints.push(Constraint::Length(1));
    constraints.push(Constraint::Min(0));
    let rows = Layout::vertical(constraints).split(inner);

    for (i, label) in IntakeForm::LABELS.iter().enumerate() {
        let focused = app.form.focused == i;
        let border = if focused { Color::Yellow } else { Color::DarkGray };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(format!(" {} ", label));

        let value = &app.form.values[i];
        let field = Paragraph::new(value.as_str())
            .style(Style::default().fg(Color::Cyan))
            .block(block);
        frame.render_widget(field, rows[i]);

        if focused {
            // Keep the cursor inside the box for long answers
            let inner_width = rows[i].width.saturating_sub(2);
            let cursor_x = (value.chars().count() as u16).min(inner_width.saturating_sub(1));
            frame.set_cursor_position((rows[i].x + 1 + cursor_x, rows[i].y + 1));
        }
    }

    if let Some(error) = &app.form.error {
        let row = rows[IntakeForm::LABELS.len()];
        frame.render_widget(
            Paragraph::new(Span::styled(error.as_str(), Style::default().fg(Color::Red))),
            row,
        );
    }
}

/// Lines for the whole transcript, bubbles in order.
fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (i, message) in app.session.messages().iter().enumerate() {
        let selected = app.selected_message == Some(i);
        let (label, color, alignment) = match message.origin() {
            Origin::User => ("You", Color::Cyan, Alignment::Right),
            Origin::Assistant => ("Assistant", Color::Yellow, Alignment::Left),
        };

        let mut label_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
        if selected {
            label_style = label_style.bg(Color::DarkGray);
        }
        let marker = if selected { "> " } else { "" };
        let time = message.timestamp().format("%H:%M").to_string();
        lines.push(
            Line::from(vec![
                Span::styled(format!("{}{}", marker, label), label_style),
                Span::styled(format!(" {}", time), Style::default().fg(Color::DarkGray)),
            ])
            .alignment(alignment),
        );

        for line in markup_lines(&render(message), Style::default()) {
            lines.push(line.alignment(alignment));
        }
        lines.push(Line::default());
    }

    if app.is_waiting() {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Rows the lines take once word-wrapped to `width`, as the chat paragraph
/// lays them out.
fn wrapped_height(lines: &[Line<'static>], width: u16) -> u16 {
    Paragraph::new(Text::from(lines.to_vec()))
        .wrap(Wrap { trim: false })
        .line_count(width.max(1))
        .min(u16::MAX as usize) as u16
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let input_height = (app.session.pending_input().lines().count().max(1) as u16 + 2).min(8);
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_height),
    ])
    .areas(area);

    // Store chat area for mouse hit-testing and scroll math (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let lines = transcript_lines(app);
    let total = wrapped_height(&lines, app.chat_width);
    let max_scroll = total.saturating_sub(app.chat_height);
    if app.follow_bottom || app.chat_scroll > max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_bottom = true;
    }

    let chat_border = if app.input_mode == InputMode::Normal { Color::Cyan } else { Color::DarkGray };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(chat_border))
        .title(format!(" Chat: {} ", app.session.profile().product));

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    // Input box - highlight when editing
    let editing = app.input_mode == InputMode::Editing;
    let input_border = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.is_waiting() {
        " Message (waiting for reply) "
    } else {
        " Message "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border))
        .title(title);

    let input = app.session.pending_input();
    let before_cursor: String = input.chars().take(app.input_cursor).collect();
    let cursor_row = before_cursor.matches('\n').count() as u16;
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0) as u16;

    // Horizontal scroll keeps the cursor visible on long lines
    let inner_width = input_area.width.saturating_sub(2);
    let inner_height = input_area.height.saturating_sub(2);
    let h_scroll = if inner_width > 0 && cursor_col >= inner_width {
        cursor_col - inner_width + 1
    } else {
        0
    };
    let v_scroll = cursor_row.saturating_sub(inner_height.saturating_sub(1));

    let input_widget = Paragraph::new(input)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block)
        .scroll((v_scroll, h_scroll));
    frame.render_widget(input_widget, input_area);

    if editing {
        frame.set_cursor_position((
            input_area.x + 1 + cursor_col - h_scroll,
            input_area.y + 1 + cursor_row - v_scroll,
        ));
    }
}

fn render_toasts(app: &App, frame: &mut Frame, area: Rect) {
    let Some(toast) = app.toasts.last() else {
        return;
    };
    let (color, prefix) = match toast.notice.level {
        NoticeLevel::Info => (Color::Green, ""),
        NoticeLevel::Error => (Color::Red, "! "),
    };
    let text = format!(" {}{} ", prefix, toast.notice.text);
    let width = (text.chars().count() as u16 + 2).min(area.width);
    let toast_area = Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y,
        width,
        height: 3.min(area.height),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    frame.render_widget(Clear, toast_area);
    frame.render_widget(Paragraph::new(text).block(block), toast_area);
}

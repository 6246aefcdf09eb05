//! Rendering of the form screen

use crate::tui::form::{Field, FormState, Status};
use crate::tui::theme::theme;
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::Style,
    text::Line,
    widgets::{Block, BorderType, Paragraph, Wrap},
};
use std::path::Path;

/// Width of the label column of text inputs
const LABEL_WIDTH: u16 = 11;

/// Draw the whole screen
pub fn render(
    terminal: &mut DefaultTerminal,
    state: &FormState,
    log_path: Option<&Path>,
) -> std::io::Result<()> {
    terminal.draw(|frame| draw(frame, state, log_path))?;
    Ok(())
}

fn draw(frame: &mut Frame, state: &FormState, log_path: Option<&Path>) {
    let area = frame.area();
    frame.render_widget(Block::new().style(theme().normal()), area);

    let [header, body, status, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(Field::ALL.len() as u16 + 2),
        Constraint::Length(4),
        Constraint::Length(1),
    ])
    .areas(area);

    let title = Line::from(" Photo Sorter ").centered().style(theme().title());
    frame.render_widget(bordered().title(title), header);

    draw_fields(frame, body, state);
    draw_status(frame, status, state, log_path);

    let hint = if state.busy {
        "Working, please wait..."
    } else {
        "Tab/↑↓ move · Space toggle · Enter start · Esc quit"
    };
    frame.render_widget(
        Paragraph::new(hint)
            .style(theme().hint())
            .alignment(Alignment::Center),
        footer,
    );
}

fn bordered<'a>() -> Block<'a> {
    Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(theme().border())
        .style(theme().normal())
}

fn field_style(state: &FormState, field: Field) -> Style {
    if state.busy {
        theme().disabled()
    } else if state.focus == field {
        theme().selected()
    } else {
        theme().normal()
    }
}

fn draw_fields(frame: &mut Frame, area: Rect, state: &FormState) {
    let block = bordered().title(" Options ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical(Field::ALL.map(|_| Constraint::Length(1))).split(inner);

    for (field, row) in Field::ALL.into_iter().zip(rows.iter().copied()) {
        let style = field_style(state, field);
        let line = match field {
            Field::Directory => text_line(field, state.directory.value()),
            Field::Suffix => text_line(field, state.suffix.value()),
            Field::Start if state.busy => Line::from("[ Running... ]").centered(),
            Field::Start => Line::from("[ Start ]").centered(),
            toggle => {
                let checked = state.toggle_value(toggle).unwrap_or(false);
                Line::from(format!("[{}] {}", if checked { "x" } else { " " }, toggle.label()))
            }
        };
        frame.render_widget(Paragraph::new(line).style(style), row);
    }

    if !state.busy && state.focus.is_text() {
        let input = match state.focus {
            Field::Suffix => &state.suffix,
            _ => &state.directory,
        };
        if let Some(row) = Field::ALL
            .iter()
            .position(|f| *f == state.focus)
            .and_then(|i| rows.get(i))
        {
            let column = LABEL_WIDTH.saturating_add(input.cursor_column() as u16);
            frame.set_cursor_position(Position {
                x: row.x + column.min(row.width.saturating_sub(1)),
                y: row.y,
            });
        }
    }
}

fn text_line(field: Field, value: &str) -> Line<'static> {
    Line::from(format!(
        "{:<width$}{}",
        format!("{}:", field.label()),
        value,
        width = LABEL_WIDTH as usize
    ))
}

fn draw_status(frame: &mut Frame, area: Rect, state: &FormState, log_path: Option<&Path>) {
    let (text, style) = match &state.status {
        Status::Idle => ("Ready".to_string(), theme().hint()),
        Status::Running(message) => (message.clone(), theme().normal()),
        Status::Done(message) => (message.clone(), theme().success()),
        Status::Failed(message) => (message.clone(), theme().error()),
    };

    let mut lines = vec![Line::from(text).style(style)];
    if let Some(path) = log_path {
        lines.push(Line::from(format!("Log: {}", path.display())).style(theme().hint()));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(bordered().title(" Status "))
            .wrap(Wrap { trim: true }),
        area,
    );
}

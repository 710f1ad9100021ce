//! Variables pane: the snapshot of the current step and its call stack

use crate::snapshot::Snapshot;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};
use serde_json::Value as Json;

fn value_style(value: &Json) -> Style {
    let color = match value {
        Json::Number(_) => DEFAULT_THEME.number,
        Json::String(_) => DEFAULT_THEME.string,
        Json::Bool(_) | Json::Null => DEFAULT_THEME.keyword,
        Json::Array(_) | Json::Object(_) => DEFAULT_THEME.fg,
    };
    Style::default().fg(color)
}

/// Compact one-line rendering of a snapshot value
pub fn format_value(value: &Json) -> String {
    match value {
        Json::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

/// Render the variables pane
pub fn render_variables_pane(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    stack_trace: &[String],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Variables ")
        .borders(Borders::ALL)
        .border_style(border_style)
        .padding(Padding::new(1, 0, 0, 0));

    let Some(snapshot) = snapshot else {
        let paragraph = Paragraph::new("(not started)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    };

    let mut lines = Vec::new();

    if !stack_trace.is_empty() {
        let mut spans = vec![Span::styled("in ", Style::default().fg(DEFAULT_THEME.comment))];
        for (i, name) in stack_trace.iter().rev().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" ← ", Style::default().fg(DEFAULT_THEME.comment)));
            }
            let color = if i == 0 {
                DEFAULT_THEME.function
            } else {
                DEFAULT_THEME.muted_function
            };
            spans.push(Span::styled(name.clone(), Style::default().fg(color)));
        }
        lines.push(Line::from(spans));
    }

    if let Some(value) = &snapshot.current_value {
        lines.push(Line::from(vec![
            Span::styled("→ ", Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(format_value(value), value_style(value)),
        ]));
    }

    if snapshot.values.is_empty() {
        lines.push(Line::styled(
            "(no variables in scope)",
            Style::default().fg(DEFAULT_THEME.comment),
        ));
    }

    for (name, value) in &snapshot.values {
        lines.push(Line::from(vec![
            Span::styled(
                name.clone(),
                Style::default()
                    .fg(DEFAULT_THEME.fg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(format_value(value), value_style(value)),
        ]));
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll_offset = (*scroll_offset).min(lines.len().saturating_sub(visible_height));

    let visible: Vec<Line> = lines
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();
    frame.render_widget(Paragraph::new(visible).block(block), area);
}

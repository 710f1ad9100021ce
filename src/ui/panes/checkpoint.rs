//! Checkpoint pane

use super::variables::format_value;
use crate::session::checkpoint::CheckpointPayload;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph, Wrap},
    Frame,
};

fn payload_lines(payload: &CheckpointPayload) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(id) = &payload.id {
        lines.push(Line::styled(
            format!("#{id}"),
            Style::default().fg(DEFAULT_THEME.comment),
        ));
    }

    for (key, target) in &payload.targets {
        let label = if key.is_empty() { "all" } else { key.as_str() };
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{label}] "),
                Style::default().fg(DEFAULT_THEME.checkpoint),
            ),
            Span::styled(
                target.description.clone(),
                Style::default()
                    .fg(DEFAULT_THEME.fg)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));

        for (name, value) in target.values.iter().flatten() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(name.clone(), Style::default().fg(DEFAULT_THEME.fg)),
                Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(format_value(value), Style::default().fg(DEFAULT_THEME.number)),
            ]));
        }

        if let Some(expression) = &target.expression {
            lines.push(Line::styled(
                format!("  {expression}"),
                Style::default().fg(DEFAULT_THEME.secondary),
            ));
        }
    }
    lines
}

/// Render the checkpoint recorded at the current step, if any
pub fn render_checkpoint_pane(
    frame: &mut Frame,
    area: Rect,
    checkpoint: Option<&CheckpointPayload>,
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
        .title(" Checkpoint ")
        .borders(Borders::ALL)
        .border_style(border_style)
        .padding(Padding::new(1, 0, 0, 0));

    match checkpoint.filter(|c| !c.targets.is_empty()) {
        None => {
            *scroll_offset = 0;
            let paragraph = Paragraph::new("(none at this step)")
                .block(block)
                .style(Style::default().fg(DEFAULT_THEME.comment));
            frame.render_widget(paragraph, area);
        }
        Some(payload) => {
            let lines = payload_lines(payload);
            let visible_height = area.height.saturating_sub(2).max(1) as usize;
            *scroll_offset = (*scroll_offset).min(lines.len().saturating_sub(visible_height));
            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((*scroll_offset as u16, 0));
            frame.render_widget(paragraph, area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::checkpoint::CheckpointTarget;
    use serde_json::json;

    #[test]
    fn test_payload_lines() {
        let mut payload = CheckpointPayload {
            id: Some("split".into()),
            ..Default::default()
        };
        payload.targets.insert(
            String::new(),
            CheckpointTarget {
                description: "half".into(),
                values: Some(vec![("m".into(), json!(5))]),
                expression: None,
            },
        );

        let text: Vec<String> = payload_lines(&payload)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["#split", "[all] half", "  m = 5"]);
    }
}

pub mod components;
pub mod render;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::{ListState, Paragraph};

use crate::app::{App, Mode};
use view::View;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  draw_status_bar(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
  let header = Line::from(vec![
    Span::styled(" marquee ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", app.header_title()), Style::default().fg(Color::White)),
    Span::raw("  "),
    Span::styled("<:>", Style::default().fg(Color::Cyan)),
    Span::styled(" command", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<q>", Style::default().fg(Color::Cyan)),
    Span::styled(" back", Style::default().fg(Color::DarkGray)),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let line = match app.mode() {
    Mode::Normal => {
      let mut spans = vec![Span::raw(" ")];
      for (i, part) in app.view_breadcrumb().iter().enumerate() {
        if i > 0 {
          spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(
          part.clone(),
          Style::default().fg(Color::Cyan),
        ));
      }
      spans.push(Span::styled(
        "   j/k:nav  Enter:select  Ctrl-C:quit",
        Style::default().fg(Color::DarkGray),
      ));
      Line::from(spans)
    }
    Mode::Command => {
      let mut spans = vec![
        Span::styled(":", Style::default().fg(Color::Yellow)),
        Span::raw(app.command_input().to_string()),
        Span::styled("_ ", Style::default().fg(Color::Yellow)),
      ];
      for (i, cmd) in app.autocomplete_suggestions().iter().enumerate() {
        let style = if i == app.selected_suggestion() {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {}", cmd.name), style));
      }
      Line::from(spans)
    }
  };

  frame.render_widget(Paragraph::new(line), area);
}

/// Keep the list selection inside bounds as data changes under it
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

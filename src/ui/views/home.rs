use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use crate::app::Ctx;
use crate::commands;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::view_for_command;
use crate::ui::ensure_valid_selection;

/// Menu of data-fetching patterns, one entry per demo screen
pub struct HomeView {
  ctx: Ctx,
  entries: Vec<&'static commands::Command>,
  list_state: ListState,
}

impl HomeView {
  pub fn new(ctx: Ctx) -> Self {
    let entries = commands::COMMANDS
      .iter()
      .filter(|cmd| !matches!(cmd.name, "home" | "quit"))
      .collect();

    Self {
      ctx,
      entries,
      list_state: ListState::default(),
    }
  }
}

impl View for HomeView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter => {
        if let Some(cmd) = self
          .list_state
          .selected()
          .and_then(|idx| self.entries.get(idx))
        {
          if let Some(view) = view_for_command(cmd.name, &self.ctx) {
            return ViewAction::Push(view);
          }
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    ensure_valid_selection(&mut self.list_state, self.entries.len());

    let block = Block::default()
      .title(" Data-Fetching Patterns ")
      .title_alignment(Alignment::Center)
      .title_bottom(Line::from(" Enter:open  ::command  q:quit "))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let items: Vec<ListItem> = self
      .entries
      .iter()
      .map(|cmd| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<14}", cmd.name),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn breadcrumb_label(&self) -> String {
    "home".to_string()
  }
}

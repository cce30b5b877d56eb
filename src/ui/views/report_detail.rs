use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::Ctx;
use crate::models::{Entity, Report};
use crate::query::{CachedQuery, QueryKey};
use crate::ui::view::{View, ViewAction};

/// Detail view for one report. When the list prefetched it, this renders
/// from the cache with no loading state at all.
pub struct ReportDetailView {
  id: u64,
  query: CachedQuery<Report>,
}

impl ReportDetailView {
  pub fn new(ctx: Ctx, id: u64) -> Self {
    let api = ctx.api.clone();
    let mut query = CachedQuery::new(
      &ctx.cache,
      QueryKey::item(Report::resource(), id),
      move || {
        let api = api.clone();
        async move { api.report(id).await }
      },
    )
    .with_stale_time(None);
    query.fetch();

    Self { id, query }
  }
}

impl View for ReportDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Report {} ", self.id))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph = Paragraph::new("Loading. Please wait. (one-time only)")
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(report) = self.query.data() else {
      return;
    };

    let lines = vec![
      Line::from(Span::styled(
        report.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
      )),
      Line::from(Span::styled(
        report.date.clone(),
        Style::default().fg(Color::DarkGray),
      )),
      Line::raw(""),
      Line::raw(report.description.clone()),
    ];
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
  }

  fn breadcrumb_label(&self) -> String {
    format!("report {}", self.id)
  }

  fn tick(&mut self) {
    self.query.poll();
  }
}

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::app::Ctx;
use crate::models::{Entity, Report};
use crate::query::{prefetch, CachedQuery, QueryKey};
use crate::ui::render::truncate;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::ReportDetailView;
use crate::ui::ensure_valid_selection;

/// Only the first reports are worth warming; deep entries are rarely opened
const PREFETCH_ID_LIMIT: u64 = 20;

/// Report list that warms detail entries ahead of navigation.
///
/// Moving the selection prefetches that report's detail, so opening it is
/// instant. The list itself never goes stale: reports are immutable in the
/// demo data set.
pub struct ReportListView {
  ctx: Ctx,
  query: CachedQuery<Vec<Report>>,
  list_state: ListState,
}

impl ReportListView {
  pub fn new(ctx: Ctx) -> Self {
    let api = ctx.api.clone();
    let mut query = CachedQuery::new(
      &ctx.cache,
      QueryKey::collection(Report::resource()),
      move || {
        let api = api.clone();
        async move { api.reports().await }
      },
    )
    .with_stale_time(None);
    query.fetch();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
    }
  }

  fn reports(&self) -> &[Report] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn prefetch_selected(&self) {
    let Some(report) = self
      .list_state
      .selected()
      .and_then(|idx| self.reports().get(idx))
    else {
      return;
    };
    if report.id >= PREFETCH_ID_LIMIT {
      return;
    }

    let id = report.id;
    let api = self.ctx.api.clone();
    prefetch(
      &self.ctx.cache,
      QueryKey::item(Report::resource(), id),
      move || async move { api.report(id).await },
    );
  }
}

impl View for ReportListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        self.prefetch_selected();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        self.prefetch_selected();
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Enter => {
        if let Some(report) = self
          .list_state
          .selected()
          .and_then(|idx| self.reports().get(idx))
        {
          return ViewAction::Push(Box::new(ReportDetailView::new(
            self.ctx.clone(),
            report.id,
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.reports().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(format!(" Reports ({}) ", len))
      .title_alignment(Alignment::Center)
      .title_bottom(Line::from(" Enter:open (● = prefetched) "))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.query.is_loading() {
      let paragraph = Paragraph::new("Loading reports...")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error loading reports: {}", error))
        .block(block)
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .reports()
      .iter()
      .map(|report| {
        let warmed = self
          .ctx
          .cache
          .contains(&QueryKey::item(Report::resource(), report.id));
        let marker = if warmed { "● " } else { "  " };
        let line = Line::from(vec![
          Span::styled(marker, Style::default().fg(Color::Cyan)),
          Span::raw(truncate(&report.title, 50)),
          Span::styled(
            format!("  {}", report.date),
            Style::default().fg(Color::DarkGray),
          ),
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
    "reports".to_string()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      // Warm the first selection as soon as the list arrives
      let len = self.reports().len();
      crate::ui::ensure_valid_selection(&mut self.list_state, len);
      self.prefetch_selected();
    }
  }
}

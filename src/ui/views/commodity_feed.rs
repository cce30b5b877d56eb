use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::app::Ctx;
use crate::models::{Commodity, CommodityPage, Entity};
use crate::query::{InfiniteQuery, QueryKey};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::commodity_pages::commodity_line;
use crate::ui::ensure_valid_selection;

/// Infinite commodity feed.
///
/// Scrolling past the bottom loads the next page; the window keeps a
/// bounded number of pages, so scrolling far enough forward drops the
/// oldest page (reload it with 'u').
pub struct CommodityFeedView {
  query: InfiniteQuery<CommodityPage>,
  list_state: ListState,
}

impl CommodityFeedView {
  pub fn new(ctx: Ctx) -> Self {
    let api = ctx.api.clone();
    let per_page = ctx.config.feed_page_size;
    let mut query = InfiniteQuery::new(
      &ctx.cache,
      QueryKey::feed(Commodity::resource()),
      1,
      ctx.config.max_feed_pages,
      move |page| {
        let api = api.clone();
        async move { api.commodities(page, per_page).await }
      },
    );
    query.fetch();

    Self {
      query,
      list_state: ListState::default(),
    }
  }

  fn items(&self) -> Vec<&Commodity> {
    self.query.pages().iter().flat_map(|p| &p.data).collect()
  }

  fn scroll_down(&mut self) {
    let len = self.items().len();
    let at_bottom = self.list_state.selected() == Some(len.saturating_sub(1));
    if at_bottom {
      // Reaching the end of the window is the TUI version of the
      // scroll-to-bottom trigger
      self.query.fetch_next();
    } else {
      self.list_state.select_next();
    }
  }

  fn header_line(&self) -> Line<'static> {
    if self.query.is_fetching_previous() {
      Line::from(Span::styled(
        "Loading previous...",
        Style::default().fg(Color::Green),
      ))
    } else if self.query.has_previous() {
      Line::from(Span::styled(
        "u: load previous page (dropped from the window)",
        Style::default().fg(Color::DarkGray),
      ))
    } else {
      Line::from(Span::styled(
        "Top of the feed",
        Style::default().fg(Color::DarkGray),
      ))
    }
  }

  fn footer_line(&self) -> Line<'static> {
    if self.query.is_fetching_next() {
      Line::from(Span::styled(
        "Loading more...",
        Style::default().fg(Color::Green),
      ))
    } else if self.query.has_next() {
      Line::from(Span::styled(
        "Scroll down to load more...",
        Style::default().fg(Color::DarkGray),
      ))
    } else {
      Line::from(Span::styled(
        "Nothing more to load",
        Style::default().fg(Color::DarkGray),
      ))
    }
  }
}

impl View for CommodityFeedView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.scroll_down(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('u') => self.query.fetch_previous(),
      KeyCode::Char('g') => self.list_state.select_first(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    // Rows own their content, so the borrow of self ends here
    let rows: Vec<ListItem> = self
      .items()
      .iter()
      .map(|commodity| ListItem::new(commodity_line(commodity)))
      .collect();
    let window_pages = self.query.pages().len();

    let block = Block::default()
      .title(format!(
        " Commodity Feed ({} rows, {} page window) ",
        rows.len(),
        window_pages
      ))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading... Please wait...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph =
        Paragraph::new(format!("Error: {}", error)).style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // previous-page hint
        Constraint::Min(1),    // feed
        Constraint::Length(1), // next-page hint
      ])
      .split(inner);

    frame.render_widget(Paragraph::new(self.header_line()), chunks[0]);

    ensure_valid_selection(&mut self.list_state, rows.len());
    let list = List::new(rows)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[1], &mut self.list_state);

    frame.render_widget(Paragraph::new(self.footer_line()), chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    "feed".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
  }
}

use chrono::Duration;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use crate::app::Ctx;
use crate::models::{Commodity, CommodityPage, Entity};
use crate::query::{CachedQuery, QueryKey};
use crate::ui::render::truncate;
use crate::ui::view::{View, ViewAction};

/// Page-by-page commodity browsing.
///
/// Each page lives under its own cache key, so revisiting a page within the
/// stale window is instant. While the next page loads, the last loaded page
/// stays on screen instead of flashing a spinner.
pub struct CommodityPagesView {
  ctx: Ctx,
  page: u32,
  query: CachedQuery<CommodityPage>,
  /// Placeholder shown while the current page is still loading
  previous: Option<CommodityPage>,
}

impl CommodityPagesView {
  pub fn new(ctx: Ctx) -> Self {
    let query = Self::page_query(&ctx, 1);
    Self {
      ctx,
      page: 1,
      query,
      previous: None,
    }
  }

  fn page_query(ctx: &Ctx, page: u32) -> CachedQuery<CommodityPage> {
    let api = ctx.api.clone();
    let per_page = ctx.config.page_size;
    let mut query = CachedQuery::new(
      &ctx.cache,
      QueryKey::page(Commodity::resource(), page),
      move || {
        let api = api.clone();
        async move { api.commodities(page, per_page).await }
      },
    )
    .with_stale_time(Some(Duration::seconds(i64::from(ctx.config.stale_secs))));
    query.fetch();
    query
  }

  /// The page to render: current data, or the previous page as placeholder
  fn current(&self) -> Option<&CommodityPage> {
    self.query.data().or(self.previous.as_ref())
  }

  fn set_page(&mut self, page: u32) {
    if page < 1 || page == self.page {
      return;
    }
    if let Some(data) = self.query.data().cloned() {
      self.previous = Some(data);
    }
    self.page = page;
    self.query = Self::page_query(&self.ctx, page);
  }

  fn next_page(&mut self) {
    // Mirror the buttons of the original: next is unavailable while the
    // current page is still being confirmed
    if self.query.is_fetching() {
      return;
    }
    if let Some(next) = self.query.data().and_then(|p| p.next) {
      self.set_page(next);
    }
  }

  fn prev_page(&mut self) {
    if self.page > 1 {
      self.set_page(self.page - 1);
    }
  }
}

impl View for CommodityPagesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('n') | KeyCode::Char('l') | KeyCode::Right => self.next_page(),
      KeyCode::Char('p') | KeyCode::Char('h') | KeyCode::Left => self.prev_page(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let total = self.current().map(|p| p.pages);
    let mut title = match total {
      Some(total) => format!(" Commodities - page {}/{} ", self.page, total),
      None => format!(" Commodities - page {} ", self.page),
    };
    if self.query.data().is_none() && self.previous.is_some() {
      title.push_str("(loading) ");
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .title_bottom(Line::from(" n:next page  p:previous page  r:refresh "))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}", error))
        .block(block)
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, area);
      return;
    }

    let Some(page) = self.current() else {
      let paragraph = Paragraph::new("Loading commodities...")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    if page.data.is_empty() {
      let paragraph = Paragraph::new("No items found")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = page
      .data
      .iter()
      .map(|commodity| ListItem::new(commodity_line(commodity)))
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("commodities p{}", self.page)
  }

  fn tick(&mut self) {
    if self.query.poll() && self.query.data().is_some() {
      // Fresh page arrived; the placeholder is no longer needed
      self.previous = None;
    }
  }
}

pub(super) fn commodity_line(commodity: &Commodity) -> Line<'static> {
  Line::from(vec![
    Span::raw(format!("{:<28}", truncate(&commodity.name, 28))),
    Span::styled(
      format!("{:>10.2}", commodity.price),
      Style::default().fg(Color::Yellow),
    ),
    Span::styled(
      format!("  x{}", commodity.quantity),
      Style::default().fg(Color::DarkGray),
    ),
  ])
}

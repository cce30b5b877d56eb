use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use crate::app::Ctx;
use crate::models::{Entity, Post};
use crate::query::{CachedQuery, QueryKey, QueryState};
use crate::ui::render::truncate;
use crate::ui::view::{View, ViewAction};

/// Request deduplication demo: two independent panels each own a query for
/// the posts key, yet the cache admits a single network request and both
/// panels render from its result. The counter at the bottom proves it.
pub struct DedupeView {
  ctx: Ctx,
  left: CachedQuery<Vec<Post>>,
  right: CachedQuery<Vec<Post>>,
}

impl DedupeView {
  pub fn new(ctx: Ctx) -> Self {
    let mut left = Self::posts_query(&ctx);
    let mut right = Self::posts_query(&ctx);
    // Both start fetching; the second call coalesces onto the first
    left.fetch();
    right.fetch();

    Self { ctx, left, right }
  }

  fn posts_query(ctx: &Ctx) -> CachedQuery<Vec<Post>> {
    let api = ctx.api.clone();
    CachedQuery::new(
      &ctx.cache,
      QueryKey::collection(Post::resource()),
      move || {
        let api = api.clone();
        async move { api.posts().await }
      },
    )
  }

  fn request_count(&self) -> u64 {
    self
      .ctx
      .cache
      .meta(&QueryKey::collection(Post::resource()))
      .map(|meta| meta.fetches)
      .unwrap_or(0)
  }
}

fn render_panel(frame: &mut Frame, area: Rect, name: &str, query: &CachedQuery<Vec<Post>>) {
  let status = match query.state() {
    QueryState::Idle => "idle",
    QueryState::Loading => "loading",
    QueryState::Success(_) => "success",
    QueryState::Error(_) => "error",
  };

  let block = Block::default()
    .title(format!(" Sample {} ({}) ", name, status))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  match query.state() {
    QueryState::Error(e) => {
      let paragraph = Paragraph::new(format!("Error: {}", e))
        .block(block)
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, area);
    }
    QueryState::Success(posts) => {
      let items: Vec<ListItem> = posts
        .iter()
        .map(|post| {
          ListItem::new(Line::from(vec![
            Span::styled(
              format!("{:>3} ", post.id),
              Style::default().fg(Color::DarkGray),
            ),
            Span::raw(truncate(&post.title, 40)),
          ]))
        })
        .collect();
      frame.render_widget(List::new(items).block(block), area);
    }
    _ => {
      let paragraph = Paragraph::new("Loading posts...")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
    }
  }
}

impl View for DedupeView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        // One refetch is enough: the other panel is subscribed to the same
        // key and picks the result up on its next poll
        self.left.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);

    let panels = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
      .split(chunks[0]);

    render_panel(frame, panels[0], "A", &self.left);
    render_panel(frame, panels[1], "B", &self.right);

    let counter = Line::from(vec![
      Span::styled(
        " Network requests issued for this key: ",
        Style::default().fg(Color::DarkGray),
      ),
      Span::styled(
        self.request_count().to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
      ),
      Span::styled(
        "  (r: refetch - still one request)",
        Style::default().fg(Color::DarkGray),
      ),
    ]);
    frame.render_widget(Paragraph::new(counter), chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "dedupe".to_string()
  }

  fn tick(&mut self) {
    self.left.poll();
    self.right.poll();
  }
}

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::Ctx;
use crate::models::{Entity, Movie};
use crate::query::{CachedQuery, QueryKey};
use crate::ui::render::rating_color;
use crate::ui::view::{View, ViewAction};

/// Detail view for a single movie, cached under its own item key with a
/// lifecycle independent from the list.
pub struct MovieDetailView {
  id: u64,
  query: CachedQuery<Movie>,
}

impl MovieDetailView {
  pub fn new(ctx: Ctx, id: u64) -> Self {
    let api = ctx.api.clone();
    let mut query = CachedQuery::new(
      &ctx.cache,
      QueryKey::item(Movie::resource(), id),
      move || {
        let api = api.clone();
        async move { api.movie(id).await }
      },
    );
    query.fetch();

    Self { id, query }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.data() {
      Some(movie) => format!(" {} ({}) ", movie.title, movie.year),
      None => format!(" movie {} ", self.id),
    };

    let block = Block::default()
      .title(title)
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
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(movie) = self.query.data() else {
      return;
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3), // rating, director, duration
        Constraint::Min(1),    // description
        Constraint::Length(1), // background fetch indicator
      ])
      .split(inner);

    let header = vec![
      Line::from(vec![
        Span::styled("Rating: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          format!("{:.1}/10", movie.rate),
          Style::default().fg(rating_color(movie.rate)),
        ),
      ]),
      Line::from(vec![
        Span::styled("Director: ", Style::default().fg(Color::DarkGray)),
        Span::raw(movie.director.clone()),
        Span::raw("  "),
        Span::styled("Duration: ", Style::default().fg(Color::DarkGray)),
        Span::raw(movie.duration.clone()),
      ]),
      Line::from(vec![
        Span::styled("Genre: ", Style::default().fg(Color::DarkGray)),
        Span::raw(movie.genre.join(", ")),
      ]),
    ];
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let description = Paragraph::new(movie.description.clone()).wrap(Wrap { trim: true });
    frame.render_widget(description, chunks[1]);

    if self.query.is_fetching() {
      let indicator = Paragraph::new("Fetching in the background...")
        .style(Style::default().fg(Color::Green));
      frame.render_widget(indicator, chunks[2]);
    }
  }
}

impl View for MovieDetailView {
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
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(movie) => movie.title.clone(),
      None => format!("movie {}", self.id),
    }
  }

  fn tick(&mut self) {
    self.query.poll();
  }
}

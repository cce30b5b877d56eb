use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::app::Ctx;
use crate::models::{Entity, Movie};
use crate::query::{
  delete_with_rollback, CachedQuery, Mutation, MutationState, QueryKey, QueryState,
};
use crate::ui::render::{age, rating_color, truncate};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::MovieDetailView;
use crate::ui::ensure_valid_selection;

/// Watch history list with optimistic delete.
///
/// Deleting removes the row immediately; if the server refuses, the row
/// comes back and the failure is shown below the list.
pub struct MovieListView {
  ctx: Ctx,
  query: CachedQuery<Vec<Movie>>,
  delete: Mutation,
  list_state: ListState,
}

impl MovieListView {
  pub fn new(ctx: Ctx) -> Self {
    let api = ctx.api.clone();
    let mut query = CachedQuery::new(
      &ctx.cache,
      QueryKey::collection(Movie::resource()),
      move || {
        let api = api.clone();
        async move { api.movies().await }
      },
    );
    query.fetch();

    Self {
      ctx,
      query,
      delete: Mutation::new(),
      list_state: ListState::default(),
    }
  }

  fn movies(&self) -> &[Movie] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn delete_selected(&mut self) {
    let Some(id) = self
      .list_state
      .selected()
      .and_then(|idx| self.movies().get(idx))
      .map(|movie| movie.id)
    else {
      return;
    };

    let api = self.ctx.api.clone();
    self.delete.run(delete_with_rollback::<Movie, _, _>(
      self.ctx.cache.clone(),
      id,
      move |id| async move { api.delete_movie(id).await },
    ));
  }

  fn title_line(&self) -> Line<'static> {
    let mut spans = vec![Span::raw(format!(" Watch History ({}) ", self.movies().len()))];
    match self.query.state() {
      QueryState::Loading => spans.push(Span::styled(
        "loading... ",
        Style::default().fg(Color::DarkGray),
      )),
      QueryState::Error(e) => spans.push(Span::styled(
        format!("error: {} ", truncate(e, 40)),
        Style::default().fg(Color::Red),
      )),
      _ if self.query.is_fetching() => spans.push(Span::styled(
        "fetching in the background ",
        Style::default().fg(Color::Green),
      )),
      _ => spans.push(Span::styled(
        format!("updated {} ", age(self.query.fetched_at())),
        Style::default().fg(Color::DarkGray),
      )),
    }
    Line::from(spans)
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.movies().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(self.title_line())
      .title_alignment(Alignment::Center)
      .title_bottom(Line::from(" x:delete  Enter:details  r:refresh "))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load the watch history. Press 'r' to retry."
      } else {
        "Nothing watched this week."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .movies()
      .iter()
      .map(|movie| {
        // A dot marks movies whose detail entry is already warmed in the
        // cache - opening them is instant
        let warmed = self
          .ctx
          .cache
          .contains(&QueryKey::item(Movie::resource(), movie.id));
        let marker = if warmed { "● " } else { "  " };

        let line = Line::from(vec![
          Span::styled(marker, Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:<34}", truncate(&format!("{} ({})", movie.title, movie.year), 34)),
            if warmed {
              Style::default().fg(Color::Cyan)
            } else {
              Style::default()
            },
          ),
          Span::styled(
            format!("{:>4.1} ", movie.rate),
            Style::default().fg(rating_color(movie.rate)),
          ),
          Span::styled(
            truncate(&movie.director, 24),
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

  fn render_mutation_status(&self, frame: &mut Frame, area: Rect) {
    let (content, color) = match self.delete.state() {
      MutationState::Pending => ("Deleting...".to_string(), Color::Yellow),
      MutationState::Failed(e) => (
        format!("Delete failed: {} (list restored)", truncate(e, 60)),
        Color::Red,
      ),
      _ => return,
    };
    let paragraph = Paragraph::new(content).style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
  }
}

impl View for MovieListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('x') => {
        self.delete_selected();
      }
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Enter => {
        if let Some(movie) = self
          .list_state
          .selected()
          .and_then(|idx| self.movies().get(idx))
        {
          return ViewAction::Push(Box::new(MovieDetailView::new(
            self.ctx.clone(),
            movie.id,
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    if matches!(self.delete.state(), MutationState::Idle | MutationState::Success) {
      self.render_list(frame, area);
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);
    self.render_list(frame, chunks[0]);
    self.render_mutation_status(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "movies".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.delete.poll();
  }
}

use chrono::Duration;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use crate::app::Ctx;
use crate::models::{Entity, Todo};
use crate::query::{CachedQuery, Mutation, MutationState, QueryKey, QueryState};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::render::{age, truncate};
use crate::ui::view::{View, ViewAction};

/// Polling interval bounds, in seconds
const MIN_INTERVAL_SECS: i64 = 1;
const MAX_INTERVAL_SECS: i64 = 10;

/// Todo list that re-fetches itself on a fixed interval.
///
/// New todos are created through a mutation and picked up by the next poll;
/// the interval is adjustable at runtime with + and -.
pub struct TodoListView {
  ctx: Ctx,
  query: CachedQuery<Vec<Todo>>,
  add: Mutation,
  input: TextInput,
  adding: bool,
  interval_secs: i64,
}

impl TodoListView {
  pub fn new(ctx: Ctx) -> Self {
    let interval_secs =
      i64::from(ctx.config.poll_secs).clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);

    let api = ctx.api.clone();
    let mut query = CachedQuery::new(
      &ctx.cache,
      QueryKey::collection(Todo::resource()),
      move || {
        let api = api.clone();
        async move { api.todos().await }
      },
    )
    .with_refetch_interval(Duration::seconds(interval_secs));
    query.fetch();

    Self {
      ctx,
      query,
      add: Mutation::new(),
      input: TextInput::new(),
      adding: false,
      interval_secs,
    }
  }

  fn todos(&self) -> &[Todo] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn adjust_interval(&mut self, delta: i64) {
    self.interval_secs =
      (self.interval_secs + delta).clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);
    self
      .query
      .set_refetch_interval(Duration::seconds(self.interval_secs));
  }

  fn submit_todo(&mut self, title: String) {
    let title = title.trim().to_string();
    if title.is_empty() {
      return;
    }

    let api = self.ctx.api.clone();
    let cache = self.ctx.cache.clone();
    self.add.run(async move {
      api.create_todo(&title).await?;
      // The next poll would pick the new todo up anyway; marking the list
      // stale makes it show up on the very next tick
      cache.mark_stale(&QueryKey::collection(Todo::resource()));
      Ok(())
    });
  }

  fn title_line(&self) -> Line<'static> {
    let mut spans = vec![Span::raw(format!(
      " To Dos - refetch every {}s ",
      self.interval_secs
    ))];
    if self.query.is_fetching() {
      spans.push(Span::styled("● ", Style::default().fg(Color::Green)));
    } else {
      spans.push(Span::styled(
        format!("updated {} ", age(self.query.fetched_at())),
        Style::default().fg(Color::DarkGray),
      ));
    }
    Line::from(spans)
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title_line())
      .title_alignment(Alignment::Center)
      .title_bottom(Line::from(" a:new todo  +/-:interval  r:refresh "))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    match self.query.state() {
      QueryState::Loading => {
        let paragraph = Paragraph::new("Loading. Please wait. (one-time only)")
          .block(block)
          .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
      }
      QueryState::Error(e) => {
        let paragraph = Paragraph::new(format!("Error: {}", e))
          .block(block)
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, area);
      }
      _ => {
        let items: Vec<ListItem> = self
          .todos()
          .iter()
          .enumerate()
          .map(|(i, todo)| {
            let check = if todo.completed { "✓" } else { " " };
            let line = Line::from(vec![
              Span::styled(
                format!("{:>3}. ", i + 1),
                Style::default().fg(Color::DarkGray),
              ),
              Span::raw(truncate(&todo.title, 60)),
              Span::styled(format!("  {}", check), Style::default().fg(Color::Green)),
            ]);
            ListItem::new(line)
          })
          .collect();

        frame.render_widget(List::new(items).block(block), area);
      }
    }
  }

  fn render_prompt(&self, frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
      Span::styled("new todo> ", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value().to_string()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_mutation_status(&self, frame: &mut Frame, area: Rect) {
    let (content, color) = match self.add.state() {
      MutationState::Pending => ("Adding todo...".to_string(), Color::Yellow),
      MutationState::Failed(e) => (format!("Error: {}", truncate(e, 60)), Color::Red),
      _ => return,
    };
    frame.render_widget(
      Paragraph::new(content).style(Style::default().fg(color)),
      area,
    );
  }
}

impl View for TodoListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.adding {
      match self.input.handle_key(key) {
        InputResult::Submitted(title) => {
          self.adding = false;
          self.input.clear();
          self.submit_todo(title);
        }
        InputResult::Cancelled => {
          self.adding = false;
          self.input.clear();
        }
        _ => {}
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('a') => {
        self.adding = true;
        self.input.clear();
      }
      KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_interval(1),
      KeyCode::Char('-') => self.adjust_interval(-1),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let needs_status =
      self.adding || !matches!(self.add.state(), MutationState::Idle | MutationState::Success);
    if !needs_status {
      self.render_list(frame, area);
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);
    self.render_list(frame, chunks[0]);
    if self.adding {
      self.render_prompt(frame, chunks[1]);
    } else {
      self.render_mutation_status(frame, chunks[1]);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "todos".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.add.poll();
  }
}

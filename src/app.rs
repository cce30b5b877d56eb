use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;

use crate::api::ApiClient;
use crate::commands;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::QueryCache;
use crate::ui;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{View, ViewAction};
use crate::ui::views;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// Shared handles passed to every view.
///
/// The cache is the single shared mutable state of the application; views
/// get a clone of this context and go through the cache's write API for
/// every change.
#[derive(Clone)]
pub struct Ctx {
  pub cache: QueryCache,
  pub api: ApiClient,
  pub config: Arc<Config>,
}

/// Main application state
pub struct App {
  ctx: Ctx,

  /// Navigation stack - the home menu is always at index 0
  views: Vec<Box<dyn View>>,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command: TextInput,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let api = ApiClient::new(&config)?;
    let ctx = Ctx {
      cache: QueryCache::new(),
      api,
      config: Arc::new(config),
    };

    Ok(Self {
      views: vec![Box::new(views::HomeView::new(ctx.clone()))],
      ctx,
      mode: Mode::Normal,
      command: TextInput::new(),
      selected_suggestion: 0,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        // Queries are polled by the current view; background results land
        // in the cache either way and are picked up when a view returns
        if let Some(view) = self.views.last_mut() {
          view.tick();
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.mode {
      Mode::Command => self.handle_command_mode_key(key),
      Mode::Normal => {
        if key.code == KeyCode::Char(':') {
          self.mode = Mode::Command;
          self.command.clear();
          self.selected_suggestion = 0;
          return;
        }

        let action = self
          .views
          .last_mut()
          .map(|view| view.handle_key(key))
          .unwrap_or(ViewAction::None);
        match action {
          ViewAction::Push(view) => self.views.push(view),
          ViewAction::Pop => self.pop_view(),
          ViewAction::None => {}
        }
      }
    }
  }

  fn pop_view(&mut self) {
    if self.views.len() > 1 {
      self.views.pop();
    } else {
      self.should_quit = true;
    }
  }

  fn handle_command_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(self.command.value());
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(self.command.value());
        if !suggestions.is_empty() {
          self.selected_suggestion = self
            .selected_suggestion
            .checked_sub(1)
            .unwrap_or(suggestions.len() - 1);
        }
      }
      _ => match self.command.handle_key(key) {
        InputResult::Submitted(_) => {
          self.execute_command();
          self.mode = Mode::Normal;
        }
        InputResult::Cancelled => {
          self.mode = Mode::Normal;
          self.command.clear();
        }
        InputResult::Consumed => {
          self.selected_suggestion = 0;
        }
        InputResult::NotHandled => {}
      },
    }
  }

  fn execute_command(&mut self) {
    if self.command.value().trim().is_empty() {
      self.command.clear();
      return;
    }

    // Execute the selected suggestion, or the raw input as typed
    let suggestions = commands::get_suggestions(self.command.value());
    let name = suggestions
      .get(self.selected_suggestion)
      .map(|cmd| cmd.name.to_string())
      .unwrap_or_else(|| self.command.value().trim().to_lowercase());
    self.command.clear();
    self.selected_suggestion = 0;

    match name.as_str() {
      "quit" => self.should_quit = true,
      "home" => self.views.truncate(1),
      other => {
        if let Some(view) = views::view_for_command(other, &self.ctx) {
          self.views.truncate(1);
          self.views.push(view);
        }
      }
    }
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.views.last_mut()
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    self.command.value()
  }

  pub fn header_title(&self) -> String {
    self
      .ctx
      .config
      .title
      .clone()
      .unwrap_or_else(|| self.ctx.api.server_label())
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static commands::Command> {
    commands::get_suggestions(self.command.value())
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}

use crate::cache::ErrorHook;
use crate::commands;
use crate::config::Config;
use crate::credentials::{CredentialProvider, LocalStorage, TOKEN_KEY};
use crate::event::{Event, EventHandler};
use crate::route::{Location, Navigator, Route};
use crate::rpc::{shop_store, AuthRedirect, HttpTransport, ShopClient};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::extract_host;
use crate::ui::view::{View, ViewAction};
use crate::ui::views;
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The client every view talks to
pub type Client = ShopClient<HttpTransport>;

const TICK_RATE: Duration = Duration::from_millis(100);
const GC_INTERVAL: Duration = Duration::from_secs(30);

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  /// Persisted key/value storage holding the token
  storage: Arc<LocalStorage>,

  /// Current location, shared with the auth redirect hook
  location: Location,

  transport: Arc<HttpTransport>,

  /// Client with the query store of the current session
  client: Client,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command palette (opened with :)
  command: CommandInput,

  /// Last app level message for the footer
  status: Option<String>,

  /// Whether to quit
  should_quit: bool,

  last_gc: Instant,
}

impl App {
  pub fn new(config: Config, storage: Arc<LocalStorage>) -> Result<Self> {
    let route = Route::parse(&config.start_path)
      .ok_or_else(|| eyre!("Unknown start path: {}", config.start_path))?;

    let credentials: Arc<dyn CredentialProvider> = storage.clone();
    let transport = Arc::new(HttpTransport::new(
      &config.api.url,
      credentials,
      config.api.timeout(),
    )?);

    let location = Location::new(route.path());
    let client = build_client(&config, &transport, &location);
    let root = views::for_route(&route, &client, &storage);

    Ok(Self {
      config,
      storage,
      location,
      transport,
      client,
      view_stack: vec![root],
      command: CommandInput::new(),
      status: None,
      should_quit: false,
      last_gc: Instant::now(),
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableFocusChange)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Cleanup terminal, also when the loop failed
    stdout().execute(DisableFocusChange)?;
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }

      // An unauthenticated failure may have asked for a login page
      if let Some(path) = self.location.take_redirect() {
        self.hard_reload(&path);
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::FocusGained => self.on_focus(),
    }
  }

  fn tick(&mut self) {
    for view in &mut self.view_stack {
      view.tick();
    }

    if self.last_gc.elapsed() >= GC_INTERVAL {
      self.last_gc = Instant::now();
      let evicted = self.client.store().collect_garbage();
      debug!(evicted, remaining = self.client.store().len(), "cache gc");
    }
  }

  fn on_focus(&mut self) {
    if self.client.store().on_window_focus() == 0 {
      return;
    }
    if let Some(view) = self.view_stack.last_mut() {
      view.revalidate();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // Text prompts inside the view get the keyboard, `:` included
    let view_capturing = self
      .current_view()
      .is_some_and(|view| view.is_capturing_input());
    if !self.command.is_active() && view_capturing {
      self.forward_to_view(key);
      return;
    }

    match self.command.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(name)) => self.execute_command(&name),
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => {}
      KeyResult::NotHandled => self.forward_to_view(key),
    }
  }

  fn forward_to_view(&mut self, key: KeyEvent) {
    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => return,
    };
    self.apply_action(action);
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        self.location.set_path(view.path());
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          self.sync_location();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Redirect(path) => self.hard_reload(&path),
    }
  }

  fn execute_command(&mut self, name: &str) {
    let Some(command) = commands::find(name) else {
      self.status = Some(format!("Unknown command: {}", name));
      return;
    };
    self.status = None;

    if let Some(path) = command.path {
      self.navigate(path);
      return;
    }

    match command.name {
      "logout" => self.logout(),
      "quit" => self.should_quit = true,
      _ => {}
    }
  }

  /// Soft navigation: keeps the query store, replaces the view stack.
  fn navigate(&mut self, path: &str) {
    let Some(route) = Route::parse(path) else {
      self.status = Some(format!("Unknown location: {}", path));
      return;
    };
    debug!(to = %route, "navigate");
    self.location.set_path(route.path());
    self.view_stack = vec![views::for_route(&route, &self.client, &self.storage)];
  }

  /// Full navigation: a fresh query store and view stack, like a page load.
  fn hard_reload(&mut self, path: &str) {
    let route = Route::parse(path).unwrap_or(Route::Catalog);
    info!(to = %route, "reloading");

    self.client.store().clear();
    self.client = build_client(&self.config, &self.transport, &self.location);
    self.location.set_path(route.path());
    self.view_stack = vec![views::for_route(&route, &self.client, &self.storage)];
    self.last_gc = Instant::now();
  }

  fn logout(&mut self) {
    if let Err(e) = self.storage.remove(TOKEN_KEY) {
      warn!("Failed to remove token: {}", e);
      self.status = Some(format!("Logout failed: {}", e));
      return;
    }
    info!("logged out");
    let path = self.location.current_path();
    self.hard_reload(&path);
    self.status = Some("Logged out".to_string());
  }

  fn sync_location(&self) {
    if let Some(view) = self.view_stack.last() {
      self.location.set_path(view.path());
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|view| view.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut (dyn View + 'static)> {
    self.view_stack.last_mut().map(|view| view.as_mut())
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn title(&self) -> String {
    match &self.config.title {
      Some(title) => title.clone(),
      None => extract_host(&self.config.api.url).to_string(),
    }
  }

  pub fn current_path(&self) -> String {
    self.location.current_path()
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }
}

/// A client with a new query store whose unauthenticated failures redirect through `location`.
fn build_client(config: &Config, transport: &Arc<HttpTransport>, location: &Location) -> Client {
  let hook: Arc<dyn ErrorHook> = Arc::new(AuthRedirect::new(Arc::new(location.clone())));
  let store = shop_store(
    config.cache.enabled,
    config.cache.store_options(),
    Some(hook),
  );
  ShopClient::new(Arc::clone(transport), store, config.paging.page_size)
}

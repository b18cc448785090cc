use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::{info, warn};

use crate::credentials::{LocalStorage, TOKEN_KEY};
use crate::route::Route;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Token entry for `/login` and `/admin-login`.
///
/// Sessions are issued elsewhere; this screen only stores the token the
/// client sends from then on.
pub struct LoginView {
  route: Route,
  storage: Arc<LocalStorage>,
  input: TextInput,
  error: Option<String>,
}

impl LoginView {
  pub fn new(route: Route, storage: Arc<LocalStorage>) -> Self {
    Self {
      route,
      storage,
      input: TextInput::new(),
      error: None,
    }
  }

  fn submit(&mut self, token: String) -> ViewAction {
    let token = token.trim();
    if token.is_empty() {
      self.error = Some("Token must not be empty".to_string());
      return ViewAction::None;
    }

    match self.storage.set(TOKEN_KEY, token) {
      Ok(()) => {
        let next = self.route.after_login();
        info!(to = %next, "token saved");
        ViewAction::Redirect(next.path())
      }
      Err(e) => {
        warn!("Failed to save token: {}", e);
        self.error = Some(e.to_string());
        ViewAction::None
      }
    }
  }

  fn heading(&self) -> &'static str {
    match self.route {
      Route::AdminLogin => "Admin login",
      _ => "Login",
    }
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.input.handle_key(key) {
      InputResult::Submitted(token) => self.submit(token),
      InputResult::Cancelled => ViewAction::Pop,
      InputResult::Consumed => {
        self.error = None;
        ViewAction::None
      }
      InputResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 60u16.min(area.width);
    let height = 7u16.min(area.height);
    let dialog = Rect::new(
      area.x + (area.width - width) / 2,
      area.y + (area.height - height) / 3,
      width,
      height,
    );

    let border = if self.route == Route::AdminLogin {
      Color::Magenta
    } else {
      Color::Cyan
    };
    let block = Block::default()
      .title(format!(" {} ", self.heading()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    let mut lines = vec![
      Line::styled(
        "Paste your access token and press Enter.",
        Style::default().fg(Color::DarkGray),
      ),
      Line::raw(""),
      Line::from(vec![
        Span::styled("token: ", Style::default().fg(Color::Yellow)),
        Span::raw(self.input.masked()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
      ]),
    ];
    if let Some(error) = &self.error {
      lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(lines).block(block), dialog);
  }

  fn breadcrumb_label(&self) -> String {
    self.heading().to_string()
  }

  fn path(&self) -> String {
    self.route.path()
  }

  fn is_capturing_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "save token").with_priority(10),
      ShortcutInfo::new("esc", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyModifiers};
  use std::path::PathBuf;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn storage(name: &str) -> Arc<LocalStorage> {
    let path: PathBuf = std::env::temp_dir()
      .join(format!("shopnexus-login-{}-{}", name, std::process::id()))
      .join("storage.json");
    let _ = std::fs::remove_file(&path);
    Arc::new(LocalStorage::open_at(path).unwrap())
  }

  fn type_str(view: &mut LoginView, text: &str) {
    for c in text.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_admin_login_saves_token_and_redirects() {
    let storage = storage("admin");
    let mut view = LoginView::new(Route::AdminLogin, Arc::clone(&storage));
    type_str(&mut view, "secret");

    match view.handle_key(key(KeyCode::Enter)) {
      ViewAction::Redirect(path) => assert_eq!(path, "/admin/products"),
      _ => panic!("expected a redirect"),
    }
    assert_eq!(storage.get(TOKEN_KEY), Some("secret".to_string()));
  }

  #[test]
  fn test_empty_token_is_rejected() {
    let storage = storage("empty");
    let mut view = LoginView::new(Route::Login, Arc::clone(&storage));
    type_str(&mut view, "   ");

    assert!(matches!(view.handle_key(key(KeyCode::Enter)), ViewAction::None));
    assert!(view.error.is_some());
    assert_eq!(storage.get(TOKEN_KEY), None);
  }
}

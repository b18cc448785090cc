use crossterm::event::{KeyCode, KeyEvent};
use futures::future::BoxFuture;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::Client;
use crate::error::ApiError;
use crate::paging::{PageSource, PagedList};
use crate::query::{Query, QueryState};
use crate::route::LOGIN_PATH;
use crate::rpc::Family;
use crate::ui::components::{KeyResult, PagedTable, SearchEvent, SearchInput, TableEvent, TableRow};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Builds the list for a search term (`None` lists everything)
type ListFactory<R, P> = Box<dyn Fn(Option<String>) -> PagedList<R, P>>;

/// Opens the view for a selected row
pub type OpenFn<R> = fn(&Client, &R) -> Box<dyn View>;

/// Deletes the row with the given id
pub type DeleteFn = fn(Client, String) -> BoxFuture<'static, Result<(), ApiError>>;

/// A paged table of one resource, used for the catalog and the admin tables.
pub struct ListView<R, P> {
  title: &'static str,
  path: String,
  client: Client,
  family: Family,
  factory: ListFactory<R, P>,
  table: PagedTable<R, P>,
  search: Option<SearchInput>,
  search_term: Option<String>,
  open: Option<OpenFn<R>>,
  delete: Option<DeleteFn>,
  /// Row waiting for a y/n confirmation
  pending_delete: Option<String>,
  mutation: Query<String>,
  status: Option<String>,
  border: Color,
}

impl<R, P> ListView<R, P>
where
  R: TableRow + Clone + Send + Sync + 'static,
  P: PageSource<R> + 'static,
{
  pub fn new(
    title: &'static str,
    path: String,
    client: Client,
    family: Family,
    factory: impl Fn(Option<String>) -> PagedList<R, P> + 'static,
  ) -> Self {
    let table = PagedTable::new(factory(None));
    Self {
      title,
      path,
      client,
      family,
      factory: Box::new(factory),
      table,
      search: None,
      search_term: None,
      open: None,
      delete: None,
      pending_delete: None,
      mutation: Query::idle(),
      status: None,
      border: Color::Blue,
    }
  }

  /// Enable `/` to search server side
  pub fn searchable(mut self) -> Self {
    self.search = Some(SearchInput::new());
    self
  }

  pub fn on_open(mut self, open: OpenFn<R>) -> Self {
    self.open = Some(open);
    self
  }

  /// Enable `d` to delete the selected row
  pub fn on_delete(mut self, delete: DeleteFn) -> Self {
    self.delete = Some(delete);
    self.border = Color::Magenta;
    self
  }

  fn apply_search(&mut self, term: String) {
    let term = (!term.is_empty()).then_some(term);
    if term == self.search_term {
      return;
    }
    self.search_term = term.clone();
    self.table.replace((self.factory)(term));
  }

  fn refresh(&mut self) {
    self.client.invalidate(self.family);
    self.table.reload();
  }

  fn confirm_delete(&mut self) {
    let (Some(id), Some(delete)) = (self.pending_delete.take(), self.delete) else {
      return;
    };
    self.status = Some(format!("Deleting {}...", id));
    let future = delete(self.client.clone(), id.clone());
    self.mutation.start(async move {
      future.await?;
      Ok(format!("Deleted {}", id))
    });
  }

  fn title_line(&self) -> String {
    match &self.search_term {
      Some(term) => format!("{} [/{}]", self.title, term),
      None => self.title.to_string(),
    }
  }

  fn render_guest(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.title))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(self.border));
    let paragraph = Paragraph::new("You are browsing as a guest. Press 'l' to log in.")
      .block(block)
      .wrap(Wrap { trim: true })
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
  }

  fn is_guest(&self) -> bool {
    self.table.error().is_some_and(|e| e.is_unauthenticated())
  }
}

impl<R, P> View for ListView<R, P>
where
  R: TableRow + Clone + Send + Sync + 'static,
  P: PageSource<R> + 'static,
{
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(search) = &mut self.search {
      match search.handle_key(key) {
        KeyResult::Event(SearchEvent::Submitted(term)) => {
          self.apply_search(term);
          return ViewAction::None;
        }
        KeyResult::Event(SearchEvent::Cancelled) | KeyResult::Handled => {
          return ViewAction::None;
        }
        KeyResult::NotHandled => {}
      }
    }

    if self.pending_delete.is_some() {
      if key.code == KeyCode::Char('y') {
        self.confirm_delete();
      } else {
        self.pending_delete = None;
        self.status = None;
      }
      return ViewAction::None;
    }

    match self.table.handle_key(key) {
      KeyResult::Event(TableEvent::Open(id)) => {
        if let (Some(open), Some(row)) = (self.open, self.table.selected()) {
          if row.row_id() == id {
            return ViewAction::Push(open(&self.client, row));
          }
        }
        return ViewAction::None;
      }
      KeyResult::Event(TableEvent::Delete(id)) => {
        if self.delete.is_some() {
          self.status = Some(format!("Delete {}? (y/n)", id));
          self.pending_delete = Some(id);
        }
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('l') if self.is_guest() => {
        return ViewAction::Redirect(LOGIN_PATH.to_string());
      }
      KeyCode::Esc if self.search_term.is_some() => self.apply_search(String::new()),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    if self.is_guest() {
      self.render_guest(frame, area);
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);

    self.table.render(frame, chunks[0], &self.title_line(), self.border);

    if let Some(status) = &self.status {
      let style = if self.mutation.is_error() {
        Style::default().fg(Color::Red)
      } else {
        Style::default().fg(Color::Yellow)
      };
      frame.render_widget(Paragraph::new(format!(" {}", status)).style(style), chunks[1]);
    }

    if let Some(search) = &self.search {
      search.render_overlay(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    self.title_line()
  }

  fn path(&self) -> String {
    self.path.clone()
  }

  fn tick(&mut self) {
    self.table.tick();
    if self.mutation.poll() {
      match self.mutation.state() {
        QueryState::Success(message) => {
          self.status = Some(message.clone());
          self.table.reload();
        }
        QueryState::Error(e) => {
          self.status = Some(format!("Delete failed: {}", e));
        }
        _ => {}
      }
    }
  }

  fn revalidate(&mut self) {
    self.table.revalidate();
  }

  fn is_capturing_input(&self) -> bool {
    self.search.as_ref().is_some_and(|s| s.is_active()) || self.pending_delete.is_some()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("<n>g", "go to page").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    if self.search.is_some() {
      shortcuts.push(ShortcutInfo::new("/", "search").with_priority(20));
    }
    if self.open.is_some() {
      shortcuts.push(ShortcutInfo::new("enter", "open").with_priority(60));
    }
    if self.delete.is_some() {
      shortcuts.push(ShortcutInfo::new("d", "delete").with_priority(70));
    }
    shortcuts
  }
}

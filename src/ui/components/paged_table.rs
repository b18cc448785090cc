use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use tokio::sync::Mutex;

use super::KeyResult;
use crate::error::ApiError;
use crate::paging::{DisplayRange, PageCursor, PageSource, PageWindow, PagedList};
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;

/// How a list item is shown in a table.
pub trait TableRow {
  fn header() -> &'static [&'static str];

  fn widths() -> Vec<Constraint>;

  fn cells(&self) -> Vec<String>;

  /// Identifier passed to open/delete actions
  fn row_id(&self) -> String;
}

/// One page ready for display.
#[derive(Debug, Clone)]
pub struct PageView<R> {
  pub window: PageWindow<R>,
  pub range: Option<DisplayRange>,
  pub page_count: Option<usize>,
}

/// Events the table hands to its view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
  /// Enter on a row
  Open(String),
  /// `d` on a row
  Delete(String),
}

/// A table over one page of a `PagedList` at a time.
///
/// Keys: `n`/`p` next and previous page, digits then `g` to jump,
/// `j`/`k` to move, Enter to open, `d` to delete.
pub struct PagedTable<R, P> {
  list: Arc<Mutex<PagedList<R, P>>>,
  /// Page currently shown (1-based)
  page: usize,
  query: Query<PageView<R>>,
  shown: Option<PageView<R>>,
  state: TableState,
  jump: String,
}

impl<R, P> PagedTable<R, P>
where
  R: TableRow + Clone + Send + Sync + 'static,
  P: PageSource<R> + 'static,
{
  pub fn new(list: PagedList<R, P>) -> Self {
    let mut table = Self {
      list: Arc::new(Mutex::new(list)),
      page: 1,
      query: Query::idle(),
      shown: None,
      state: TableState::default(),
      jump: String::new(),
    };
    table.load(1);
    table
  }

  /// Swap in another list (a new search) and show its first page.
  pub fn replace(&mut self, list: PagedList<R, P>) {
    self.list = Arc::new(Mutex::new(list));
    self.shown = None;
    self.state = TableState::default();
    self.load(1);
  }

  pub fn page(&self) -> usize {
    self.page
  }

  pub fn items(&self) -> &[R] {
    self
      .shown
      .as_ref()
      .map(|v| v.window.items.as_slice())
      .unwrap_or(&[])
  }

  pub fn selected(&self) -> Option<&R> {
    self.state.selected().and_then(|i| self.items().get(i))
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.query.error()
  }

  /// Show `page`, fetching the pages up to it if needed.
  pub fn load(&mut self, page: usize) {
    let list = Arc::clone(&self.list);
    self.query.start(async move {
      let mut list = list.lock().await;
      let window = list.jump_to(page).await?.cloned();
      Ok(page_view(&list, window))
    });
  }

  /// Show the current page again. After an invalidation the list starts over.
  pub fn reload(&mut self) {
    self.load(self.page);
  }

  /// Re-fetch the current page in place.
  pub fn revalidate(&mut self) {
    let list = Arc::clone(&self.list);
    let page = self.page;
    self.query.start(async move {
      let mut list = list.lock().await;
      let window = list.refresh_page(page).await?.cloned();
      Ok(page_view(&list, window))
    });
  }

  /// Poll the pending page. Returns true when something arrived.
  pub fn tick(&mut self) -> bool {
    if !self.query.poll() {
      return false;
    }
    if let Some(view) = self.query.data() {
      self.page = view.window.ordinal;
      self.shown = Some(view.clone());
      ensure_valid_selection(&mut self.state, view.window.items.len());
    }
    true
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<TableEvent> {
    match key.code {
      KeyCode::Char(c) if c.is_ascii_digit() => {
        if self.jump.len() < 6 {
          self.jump.push(c);
        }
        KeyResult::Handled
      }
      KeyCode::Char('g') if !self.jump.is_empty() => {
        if let Ok(page) = self.jump.parse::<usize>() {
          self.load(page.max(1));
        }
        self.jump.clear();
        KeyResult::Handled
      }
      KeyCode::Esc if !self.jump.is_empty() => {
        self.jump.clear();
        KeyResult::Handled
      }
      KeyCode::Char('n') | KeyCode::Right => {
        let at_end = self.shown.as_ref().is_some_and(|v| v.window.is_last());
        if !at_end {
          self.load(self.page + 1);
        }
        KeyResult::Handled
      }
      KeyCode::Char('p') | KeyCode::Left => {
        if self.page > 1 {
          self.load(self.page - 1);
        }
        KeyResult::Handled
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.state.select_next();
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.state.select_previous();
        KeyResult::Handled
      }
      KeyCode::Enter => match self.selected() {
        Some(row) => KeyResult::Event(TableEvent::Open(row.row_id())),
        None => KeyResult::Handled,
      },
      KeyCode::Char('d') => match self.selected() {
        Some(row) => KeyResult::Event(TableEvent::Delete(row.row_id())),
        None => KeyResult::Handled,
      },
      _ => KeyResult::NotHandled,
    }
  }

  /// Title suffix: position, loading and error state.
  pub fn status_line(&self) -> String {
    let position = match &self.shown {
      Some(view) => {
        let range = view
          .range
          .map(|r| r.to_string())
          .unwrap_or_else(|| "no results".to_string());
        match view.page_count {
          Some(count) => format!("page {}/{} · {}", self.page, count, range),
          None => format!("page {} · {}", self.page, range),
        }
      }
      None => String::new(),
    };

    let mut status = match self.query.state() {
      QueryState::Loading => format!("{} (loading...)", position),
      QueryState::Error(e) => format!("{} (error: {})", position, e),
      _ => position,
    };
    if !self.jump.is_empty() {
      status.push_str(&format!(" [go to {}]", self.jump));
    }
    status.trim().to_string()
  }

  pub fn render(&mut self, frame: &mut Frame, area: Rect, title: &str, border: Color) {
    let block = Block::default()
      .title(format!(" {} {} ", title, self.status_line()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    if self.items().is_empty() {
      let content = if self.shown.is_none() && self.query.is_loading() {
        "Loading..."
      } else if self.query.is_error() {
        "Failed to load. Press 'r' to retry."
      } else {
        "Nothing here yet."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(R::header().iter().map(|h| Cell::from(*h)))
      .style(Style::default().fg(Color::Yellow).bold());
    let rows: Vec<Row> = self
      .items()
      .iter()
      .map(|item| Row::new(item.cells().into_iter().map(Cell::from)))
      .collect();

    let table = Table::new(rows, R::widths())
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.state);
  }
}

fn page_view<R, P: PageSource<R>>(
  list: &PagedList<R, P>,
  window: Option<PageWindow<R>>,
) -> PageView<R>
where
  R: Clone,
{
  let window = window.unwrap_or_else(|| PageWindow {
    ordinal: 1,
    cursor: PageCursor::Start,
    items: Vec::new(),
    next: None,
    total: list.total(),
  });
  PageView {
    range: list.display_range(window.ordinal),
    page_count: list.page_count(),
    window,
  }
}

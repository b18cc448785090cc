use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

use crate::app::Client;
use crate::query::{Query, QueryState};
use crate::route::LOGIN_PATH;
use crate::rpc::types::Cart;
use crate::rpc::Family;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_price, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// The signed-in user's cart
pub struct CartView {
  client: Client,
  query: Query<Cart>,
  mutation: Query<String>,
  table_state: TableState,
  status: Option<String>,
}

impl CartView {
  pub fn new(client: Client) -> Self {
    let query_client = client.clone();
    let mut query = Query::new(move || {
      let client = query_client.clone();
      async move { client.get_cart().await.map(|r| r.data) }
    });

    // Start fetching immediately
    query.fetch();

    Self {
      client,
      query,
      mutation: Query::idle(),
      table_state: TableState::default(),
      status: None,
    }
  }

  fn is_guest(&self) -> bool {
    self.query.error().is_some_and(|e| e.is_unauthenticated())
  }

  fn remove_selected(&mut self) {
    let Some(item) = self
      .table_state
      .selected()
      .and_then(|i| self.query.data().and_then(|cart| cart.items.get(i)))
    else {
      return;
    };

    let client = self.client.clone();
    let product_id = item.product_id.clone();
    self.status = Some(format!("Removing {}...", item.name));
    self.mutation.start(async move {
      client.remove_from_cart(&product_id).await?;
      Ok(format!("Removed {}", product_id))
    });
  }

  fn render_cart(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => " Cart (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Cart (error: {}) ", e),
      QueryState::Success(cart) => format!(
        " Cart ({} items, total {}) ",
        cart.items.len(),
        format_price(cart.total())
      ),
      QueryState::Idle => " Cart ".to_string(),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Green));

    let items = self.query.data().map(|c| c.items.as_slice()).unwrap_or(&[]);
    if items.is_empty() {
      let content = if self.is_guest() {
        "You are browsing as a guest. Press 'l' to log in and see your cart."
      } else if self.query.is_error() {
        "Failed to load the cart. Press 'r' to retry."
      } else if self.query.is_loading() {
        "Loading..."
      } else {
        "Your cart is empty."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(["PRODUCT", "NAME", "QTY", "PRICE", "SUBTOTAL"].map(Cell::from))
      .style(Style::default().fg(Color::Yellow).bold());
    let rows: Vec<Row> = items
      .iter()
      .map(|item| {
        Row::new(vec![
          Cell::from(item.product_id.clone()),
          Cell::from(truncate(&item.name, 40)),
          Cell::from(item.quantity.to_string()),
          Cell::from(format_price(item.price)),
          Cell::from(format_price(item.price * item.quantity)),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Length(10),
        Constraint::Min(20),
        Constraint::Length(5),
        Constraint::Length(12),
        Constraint::Length(12),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl View for CartView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('x') => self.remove_selected(),
      KeyCode::Char('r') => {
        self.client.invalidate(Family::Cart);
        self.query.refetch();
      }
      KeyCode::Char('l') if self.is_guest() => {
        return ViewAction::Redirect(LOGIN_PATH.to_string());
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

    self.render_cart(frame, chunks[0]);

    if let Some(status) = &self.status {
      let style = if self.mutation.is_error() {
        Style::default().fg(Color::Red)
      } else {
        Style::default().fg(Color::Yellow)
      };
      frame.render_widget(Paragraph::new(format!(" {}", status)).style(style), chunks[1]);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Cart".to_string()
  }

  fn path(&self) -> String {
    "/cart".to_string()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      let len = self.query.data().map(|c| c.items.len()).unwrap_or(0);
      ensure_valid_selection(&mut self.table_state, len);
    }
    if self.mutation.poll() {
      match self.mutation.state() {
        QueryState::Success(message) => {
          self.status = Some(message.clone());
          self.query.refetch();
        }
        QueryState::Error(e) => self.status = Some(format!("Failed: {}", e)),
        _ => {}
      }
    }
  }

  fn revalidate(&mut self) {
    self.query.refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("x", "remove").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

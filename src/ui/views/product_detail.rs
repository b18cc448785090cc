use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::Client;
use crate::paging::{PageSource, PagedList};
use crate::query::{Query, QueryState};
use crate::rpc::types::{Comment, NewComment, Product};
use crate::rpc::Family;
use crate::ui::components::{InputResult, KeyResult, PagedTable, TextInput};
use crate::ui::renderfns::{format_price, stock_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// One product with its comment thread
pub struct ProductDetailView<P> {
  id: String,
  client: Client,
  product: Query<Product>,
  comments: PagedTable<Comment, P>,
  /// Comment being written, when composing
  compose: Option<TextInput>,
  mutation: Query<String>,
  status: Option<String>,
}

impl<P> ProductDetailView<P>
where
  P: PageSource<Comment> + 'static,
{
  pub fn with_comments(id: String, client: Client, comments: PagedList<Comment, P>) -> Self {
    let product_id = id.clone();
    let product_client = client.clone();
    let mut product = Query::new(move || {
      let client = product_client.clone();
      let id = product_id.clone();
      async move { client.get_product(&id).await.map(|r| r.data) }
    });

    // Start fetching immediately
    product.fetch();

    Self {
      id,
      client,
      product,
      comments: PagedTable::new(comments),
      compose: None,
      mutation: Query::idle(),
      status: None,
    }
  }

  fn add_to_cart(&mut self) {
    let client = self.client.clone();
    let id = self.id.clone();
    self.status = Some("Adding to cart...".to_string());
    self.mutation.start(async move {
      client.add_to_cart(&id, 1).await?;
      Ok("Added to cart".to_string())
    });
  }

  fn submit_comment(&mut self, body: String) {
    let body = body.trim().to_string();
    if body.is_empty() {
      return;
    }
    let client = self.client.clone();
    let comment = NewComment {
      product_id: self.id.clone(),
      body,
      rating: None,
    };
    self.status = Some("Posting comment...".to_string());
    self.mutation.start(async move {
      client.create_comment(&comment).await?;
      Ok("Comment posted".to_string())
    });
  }

  fn handle_compose_key(&mut self, key: KeyEvent) {
    let Some(input) = &mut self.compose else {
      return;
    };
    match input.handle_key(key) {
      InputResult::Submitted(body) => {
        self.compose = None;
        self.submit_comment(body);
      }
      InputResult::Cancelled => self.compose = None,
      InputResult::Consumed | InputResult::NotHandled => {}
    }
  }

  fn render_product(&self, frame: &mut Frame, area: Rect) {
    let title = match self.product.state() {
      QueryState::Loading => format!(" Product {} (loading...) ", self.id),
      QueryState::Error(e) => format!(" Product {} (error: {}) ", self.id, e),
      _ => format!(" Product {} ", self.id),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(product) = self.product.data() else {
      let content = if self.product.is_error() {
        "Failed to load product. Press 'r' to retry."
      } else {
        "Loading product..."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let lines = vec![
      Line::from(vec![
        Span::styled("Name: ", label),
        Span::styled(product.name.as_str(), Style::default().bold()),
        Span::raw("  "),
        Span::styled("Model: ", label),
        Span::raw(product.product_model_id.as_str()),
      ]),
      Line::from(vec![
        Span::styled("Price: ", label),
        Span::styled(format_price(product.price), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled("Stock: ", label),
        Span::styled(
          product.quantity.to_string(),
          Style::default().fg(stock_color(product.quantity)),
        ),
        Span::raw("  "),
        Span::styled("Sold: ", label),
        Span::raw(product.sold.to_string()),
      ]),
      Line::from(vec![
        Span::styled("Size: ", label),
        Span::raw(product.size.as_deref().unwrap_or("-")),
        Span::raw("  "),
        Span::styled("Color: ", label),
        Span::raw(product.color.as_deref().unwrap_or("-")),
      ]),
    ];

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let line = match &self.compose {
      Some(input) => Line::from(vec![
        Span::styled(" comment> ", Style::default().fg(Color::Yellow)),
        Span::raw(input.value()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
      ]),
      None => {
        let style = if self.mutation.is_error() {
          Style::default().fg(Color::Red)
        } else {
          Style::default().fg(Color::Yellow)
        };
        Line::styled(format!(" {}", self.status.as_deref().unwrap_or_default()), style)
      }
    };
    frame.render_widget(Paragraph::new(line), area);
  }
}

impl<P> View for ProductDetailView<P>
where
  P: PageSource<Comment> + 'static,
{
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.compose.is_some() {
      self.handle_compose_key(key);
      return ViewAction::None;
    }

    // The comment table owns paging keys; Enter and `d` are not used here
    if let KeyResult::Handled = self.comments.handle_key(key) {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('a') => self.add_to_cart(),
      KeyCode::Char('c') => self.compose = Some(TextInput::new()),
      KeyCode::Char('r') => {
        self.client.invalidate(Family::Products);
        self.client.invalidate(Family::Comments);
        self.product.refetch();
        self.comments.reload();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(5), // Product
        Constraint::Min(3),    // Comments
        Constraint::Length(1), // Status / compose line
      ])
      .split(area);

    self.render_product(frame, chunks[0]);
    self.comments.render(frame, chunks[1], "Comments", Color::Cyan);
    self.render_status(frame, chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    match self.product.data() {
      Some(product) if !product.name.is_empty() => product.name.clone(),
      _ => self.id.clone(),
    }
  }

  fn path(&self) -> String {
    format!("/products/{}", self.id)
  }

  fn tick(&mut self) {
    self.product.poll();
    self.comments.tick();
    if self.mutation.poll() {
      match self.mutation.state() {
        QueryState::Success(message) => {
          self.status = Some(message.clone());
          self.comments.reload();
        }
        QueryState::Error(e) => self.status = Some(format!("Failed: {}", e)),
        _ => {}
      }
    }
  }

  fn revalidate(&mut self) {
    self.product.refetch();
    self.comments.revalidate();
  }

  fn is_capturing_input(&self) -> bool {
    self.compose.is_some()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "add to cart").with_priority(20),
      ShortcutInfo::new("c", "comment").with_priority(30),
      ShortcutInfo::new("n/p", "comments page").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

use ratatui::layout::Constraint;

use crate::rpc::types::{Comment, Product, ProductModel, Sale, Tag};
use crate::ui::components::TableRow;
use crate::ui::renderfns::{format_price, truncate};

impl TableRow for Product {
  fn header() -> &'static [&'static str] {
    &["ID", "MODEL", "NAME", "SIZE", "COLOR", "PRICE", "STOCK", "SOLD"]
  }

  fn widths() -> Vec<Constraint> {
    vec![
      Constraint::Length(10),
      Constraint::Length(10),
      Constraint::Min(20),
      Constraint::Length(6),
      Constraint::Length(10),
      Constraint::Length(12),
      Constraint::Length(6),
      Constraint::Length(6),
    ]
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.clone(),
      self.product_model_id.clone(),
      truncate(&self.name, 40),
      self.size.clone().unwrap_or_default(),
      self.color.clone().unwrap_or_default(),
      format_price(self.price),
      self.quantity.to_string(),
      self.sold.to_string(),
    ]
  }

  fn row_id(&self) -> String {
    self.id.clone()
  }
}

impl TableRow for ProductModel {
  fn header() -> &'static [&'static str] {
    &["ID", "BRAND", "NAME", "LIST PRICE", "TAGS"]
  }

  fn widths() -> Vec<Constraint> {
    vec![
      Constraint::Length(10),
      Constraint::Length(14),
      Constraint::Min(20),
      Constraint::Length(12),
      Constraint::Length(24),
    ]
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.clone(),
      truncate(&self.brand, 14),
      truncate(&self.name, 40),
      format_price(self.list_price),
      truncate(&self.tags.join(", "), 24),
    ]
  }

  fn row_id(&self) -> String {
    self.id.clone()
  }
}

impl TableRow for Comment {
  fn header() -> &'static [&'static str] {
    &["ID", "PRODUCT", "USER", "RATING", "COMMENT", "UPVOTES"]
  }

  fn widths() -> Vec<Constraint> {
    vec![
      Constraint::Length(10),
      Constraint::Length(10),
      Constraint::Length(14),
      Constraint::Length(6),
      Constraint::Min(30),
      Constraint::Length(7),
    ]
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.clone(),
      self.product_id.clone(),
      truncate(&self.username, 14),
      self.rating.map(|r| "★".repeat(r as usize)).unwrap_or_default(),
      truncate(&self.body, 60),
      self.upvotes.to_string(),
    ]
  }

  fn row_id(&self) -> String {
    self.id.clone()
  }
}

impl TableRow for Tag {
  fn header() -> &'static [&'static str] {
    &["TAG", "DESCRIPTION", "PRODUCTS"]
  }

  fn widths() -> Vec<Constraint> {
    vec![
      Constraint::Length(20),
      Constraint::Min(30),
      Constraint::Length(9),
    ]
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.tag.clone(),
      truncate(&self.description, 60),
      self.product_count.to_string(),
    ]
  }

  fn row_id(&self) -> String {
    self.tag.clone()
  }
}

impl TableRow for Sale {
  fn header() -> &'static [&'static str] {
    &["ID", "TARGET", "DISCOUNT", "STARTS", "ENDS", "ACTIVE"]
  }

  fn widths() -> Vec<Constraint> {
    vec![
      Constraint::Length(10),
      Constraint::Min(16),
      Constraint::Length(9),
      Constraint::Length(20),
      Constraint::Length(20),
      Constraint::Length(6),
    ]
  }

  fn cells(&self) -> Vec<String> {
    let target = match (&self.tag, &self.product_model_id) {
      (Some(tag), _) => format!("tag {}", tag),
      (None, Some(model)) => format!("model {}", model),
      (None, None) => "-".to_string(),
    };
    vec![
      self.id.clone(),
      target,
      self
        .discount_percent
        .map(|d| format!("{}%", d))
        .unwrap_or_default(),
      self.starts_at.clone(),
      self.ends_at.clone(),
      if self.is_active { "yes" } else { "no" }.to_string(),
    ]
  }

  fn row_id(&self) -> String {
    self.id.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cells_match_header() {
    let product = Product {
      id: "p1".into(),
      product_model_id: "m1".into(),
      name: "Runner".into(),
      size: Some("42".into()),
      color: None,
      price: 1290000,
      quantity: 3,
      sold: 10,
      is_active: true,
    };
    assert_eq!(product.cells().len(), Product::header().len());
    assert_eq!(product.cells()[5], "1,290,000");
    assert_eq!(Product::widths().len(), Product::header().len());
  }

  #[test]
  fn test_sale_target() {
    let sale = Sale {
      id: "s1".into(),
      tag: None,
      product_model_id: Some("m9".into()),
      discount_percent: Some(15),
      starts_at: String::new(),
      ends_at: String::new(),
      is_active: false,
    };
    let cells = sale.cells();
    assert_eq!(cells[1], "model m9");
    assert_eq!(cells[2], "15%");
    assert_eq!(cells[5], "no");
  }

  #[test]
  fn test_tag_row_id_is_the_tag() {
    let tag = Tag {
      tag: "running".into(),
      description: "Shoes for running".into(),
      product_count: 4,
    };
    assert_eq!(tag.row_id(), "running");
  }
}

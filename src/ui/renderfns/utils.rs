use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Group digits in thousands: 1290000 -> "1,290,000"
pub fn format_price(amount: u64) -> String {
  let digits = amount.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

/// Display color for a stock level
pub fn stock_color(quantity: u64) -> Color {
  match quantity {
    0 => Color::Red,
    1..=5 => Color::Yellow,
    _ => Color::Green,
  }
}

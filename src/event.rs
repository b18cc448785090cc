use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// The terminal window regained focus
  FocusGained,
  /// Periodic tick for UI refresh and query polling
  Tick,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm reads block, so they get their own thread
    tokio::task::spawn_blocking(move || loop {
      let event = if event::poll(tick_rate).unwrap_or(false) {
        match event::read() {
          Ok(evt) => translate(evt),
          Err(_) => None,
        }
      } else {
        Some(Event::Tick)
      };

      if let Some(event) = event {
        if tx.send(event).is_err() {
          break;
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

fn translate(event: CrosstermEvent) -> Option<Event> {
  match event {
    // Windows reports releases too
    CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
    CrosstermEvent::FocusGained => Some(Event::FocusGained),
    // Resizes are picked up by the next draw
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

  #[test]
  fn test_translate() {
    let press = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE);
    assert!(matches!(
      translate(CrosstermEvent::Key(press)),
      Some(Event::Key(_))
    ));

    let release = KeyEvent {
      code: KeyCode::Char('n'),
      modifiers: KeyModifiers::NONE,
      kind: KeyEventKind::Release,
      state: KeyEventState::NONE,
    };
    assert!(translate(CrosstermEvent::Key(release)).is_none());

    assert!(matches!(
      translate(CrosstermEvent::FocusGained),
      Some(Event::FocusGained)
    ));
    assert!(translate(CrosstermEvent::FocusLost).is_none());
    assert!(translate(CrosstermEvent::Resize(80, 24)).is_none());
  }
}

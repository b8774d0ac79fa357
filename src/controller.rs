use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, UTConfig, UTError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &UTConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, UTError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                // crossterm also emits key release and repeat events on Windows
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    return Ok(self.handle_key(key, model.is_filter_mode()));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent, filter_mode: bool) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left, _) | (KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right, _) | (KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Tab, _) | (KeyCode::Char('/'), _) => Some(Message::FocusFilters),
            _ if filter_mode => None,
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Home, _) | (KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End, _) | (KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::Char('s'), _) => Some(Message::Sort),
            (KeyCode::Char('x'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('c'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Char(d), _) if d.is_ascii_digit() && d != '0' => {
                d.to_digit(10).map(|n| Message::SortColumn(n as usize))
            }
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn controller() -> Controller {
        Controller::new(&UTConfig::default())
    }

    #[test]
    fn table_keys() {
        let c = controller();
        assert_eq!(c.handle_key(key(KeyCode::Char('q')), false), Some(Message::Quit));
        assert_eq!(c.handle_key(key(KeyCode::Char('s')), false), Some(Message::Sort));
        assert_eq!(c.handle_key(key(KeyCode::Enter), false), Some(Message::Enter));
        assert_eq!(c.handle_key(key(KeyCode::Char('j')), false), Some(Message::MoveDown));
        assert_eq!(
            c.handle_key(key(KeyCode::Char('5')), false),
            Some(Message::SortColumn(5))
        );
        assert_eq!(c.handle_key(key(KeyCode::Char('0')), false), None);
        assert_eq!(
            c.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), false),
            Some(Message::Quit)
        );
        assert_eq!(c.handle_key(key(KeyCode::Char('c')), false), Some(Message::CopyRow));
    }

    #[test]
    fn filter_mode_only_maps_navigation() {
        let c = controller();
        assert_eq!(c.handle_key(key(KeyCode::Up), true), Some(Message::MoveUp));
        assert_eq!(c.handle_key(key(KeyCode::Esc), true), Some(Message::Exit));
        assert_eq!(c.handle_key(key(KeyCode::Tab), true), Some(Message::FocusFilters));
        assert_eq!(c.handle_key(key(KeyCode::Char('s')), true), None);
        assert_eq!(c.handle_key(key(KeyCode::Char('3')), true), None);
    }

    #[test]
    fn poll_time_comes_from_config() {
        let cfg = UTConfig::default().event_poll_time(250u64);
        assert_eq!(Controller::new(&cfg).event_poll_time, 250);
    }
}

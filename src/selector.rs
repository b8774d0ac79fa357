use tracing::trace;

use crate::domain::Message;
use crate::filter::{FilterControl, FilterOption};

/// Cycles through the options of the focused filter control.
///
/// Every move yields a new value that is applied right away; `Exit` restores
/// the value the control had when the selector was opened.
#[derive(Default)]
pub struct Selector {
    name: String,
    options: Vec<FilterOption>,
    initial_pos: usize,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct SelectResult {
    pub name: String,
    pub value: String,
    pub changed: bool,
    pub finished: bool,
    pub canceled: bool,
}

impl Selector {
    pub fn open(&mut self, control: &FilterControl) {
        self.name = control.name.clone();
        self.options = control.options.clone();
        self.initial_pos = control.selected_position();
        self.curser_pos = self.initial_pos;
        self.finished = false;
        self.canceled = false;
        trace!("Selector opened on {} at {}", self.name, self.curser_pos);
    }

    pub fn read(&mut self, message: &Message) -> SelectResult {
        match message {
            Message::MoveDown => self.step(1),
            Message::MoveUp => self.step(-1),
            Message::Enter => self.enter(),
            Message::Exit => self.escape(),
            _ => self.result(false),
        }
    }

    fn value(&self) -> String {
        self.options
            .get(self.curser_pos)
            .map(|o| o.value.clone())
            .unwrap_or_default()
    }

    fn result(&self, changed: bool) -> SelectResult {
        SelectResult {
            name: self.name.clone(),
            value: self.value(),
            changed,
            finished: self.finished,
            canceled: self.canceled,
        }
    }

    fn step(&mut self, step: i32) -> SelectResult {
        let n = self.options.len();
        if n == 0 {
            return self.result(false);
        }
        // Wraps around at both ends
        self.curser_pos = if step >= 0 {
            (self.curser_pos + step as usize) % n
        } else {
            (self.curser_pos + n - (step.unsigned_abs() as usize % n)) % n
        };
        self.result(true)
    }

    fn enter(&mut self) -> SelectResult {
        self.finished = true;
        self.result(false)
    }

    fn escape(&mut self) -> SelectResult {
        let changed = self.curser_pos != self.initial_pos;
        self.curser_pos = self.initial_pos;
        self.canceled = true;
        self.finished = true;
        self.result(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RateBuckets;

    fn opened() -> Selector {
        let mut s = Selector::default();
        s.open(&FilterControl::rate(5, "录取率", RateBuckets::default()));
        s
    }

    #[test]
    fn steps_wrap_around() {
        let mut s = opened();
        assert_eq!(s.read(&Message::MoveUp).value, "low");
        assert_eq!(s.read(&Message::MoveDown).value, "");
        assert_eq!(s.read(&Message::MoveDown).value, "high");
        assert_eq!(s.read(&Message::MoveDown).value, "medium");
    }

    #[test]
    fn enter_keeps_the_selection() {
        let mut s = opened();
        s.read(&Message::MoveDown);
        let r = s.read(&Message::Enter);
        assert!(r.finished && !r.canceled && !r.changed);
        assert_eq!(r.value, "high");
    }

    #[test]
    fn escape_restores_initial_value() {
        let mut control = FilterControl::rate(5, "录取率", RateBuckets::default());
        control.selected = "medium".to_string();
        let mut s = Selector::default();
        s.open(&control);
        s.read(&Message::MoveDown);
        let r = s.read(&Message::Exit);
        assert!(r.canceled && r.changed);
        assert_eq!(r.value, "medium");
        assert_eq!(r.name, "rate-filter");
    }

    #[test]
    fn unrelated_messages_change_nothing() {
        let mut s = opened();
        let r = s.read(&Message::CopyRow);
        assert!(!r.changed && !r.finished);
        assert_eq!(r.value, "");
    }
}

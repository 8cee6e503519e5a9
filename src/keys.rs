use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use tabview::TableError;

/// What a key press asks the terminal front end to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextTab,
    PreviousTab,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Sort,
    SearchInColumn,
    StartSearch,
    RawKey(event::KeyEvent),
}

pub struct KeyMapper {
    event_poll_time: u64,
}

impl KeyMapper {
    pub fn new(event_poll_time: u64) -> Self {
        Self { event_poll_time }
    }

    /// Polls one terminal event. With `raw` set every key is passed through
    /// untouched for the search box.
    pub fn handle_event(&self, raw: bool) -> Result<Option<Action>, TableError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            if raw {
                return Ok(Some(Action::RawKey(key)));
            }
            return Ok(self.handle_key(key));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Action> {
        let action = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(Action::Quit),
            (KeyCode::Char(']'), _) | (KeyCode::Tab, _) => Some(Action::NextTab),
            (KeyCode::Char('['), _) | (KeyCode::BackTab, _) => Some(Action::PreviousTab),
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(Action::MoveLeft),
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(Action::MoveRight),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Action::MoveUp),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Action::MoveDown),
            (KeyCode::PageUp, _) | (KeyCode::Char('b'), KeyModifiers::CONTROL) => {
                Some(Action::MovePageUp)
            }
            (KeyCode::PageDown, _) | (KeyCode::Char('f'), KeyModifiers::CONTROL) => {
                Some(Action::MovePageDown)
            }
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Action::MoveBeginning),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Action::MoveEnd),
            (KeyCode::Char('s'), _) => Some(Action::Sort),
            (KeyCode::Char('c'), _) => Some(Action::SearchInColumn),
            (KeyCode::Char('/'), _) => Some(Action::StartSearch),
            _ => None,
        };
        trace!("Mapped: {key:?} => {action:?}");
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn map(code: KeyCode) -> Option<Action> {
        KeyMapper::new(0).handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn table_keys() {
        assert_eq!(map(KeyCode::Char('q')), Some(Action::Quit));
        assert_eq!(map(KeyCode::Tab), Some(Action::NextTab));
        assert_eq!(map(KeyCode::Char('[')), Some(Action::PreviousTab));
        assert_eq!(map(KeyCode::Char('s')), Some(Action::Sort));
        assert_eq!(map(KeyCode::Char('/')), Some(Action::StartSearch));
        assert_eq!(map(KeyCode::Char('x')), None);
    }
}

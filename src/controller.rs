use std::time::Duration;
use tracing::trace;

use crate::domain::{DiamondConfig, DiamondError, Message};
use crate::views::ViewId;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &DiamondConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self) -> Result<Option<Message>, DiamondError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => Ok(self.handle_key(key)),
            Event::Resize(width, height) => {
                Ok(Some(Message::Resize(width as usize, height as usize)))
            }
            _ => Ok(None),
        }
    }

    pub fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Message::Quit)
            }
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('h') | KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::MoveRight),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::MoveBeginning),
            KeyCode::Char('G') | KeyCode::End => Some(Message::MoveEnd),
            KeyCode::Tab => Some(Message::NextView),
            KeyCode::BackTab => Some(Message::PrevView),
            KeyCode::Char(c @ '1'..='5') => ViewId::ALL
                .get(c as usize - '1' as usize)
                .map(|&v| Message::SelectView(v)),
            KeyCode::Char(']') => Some(Message::NextSeason),
            KeyCode::Char('[') => Some(Message::PrevSeason),
            KeyCode::Char('s') => Some(Message::ToggleSort),
            KeyCode::Char('f') => Some(Message::Filter),
            KeyCode::Char('x') => Some(Message::ClearFilter),
            KeyCode::Char('X') => Some(Message::ClearAllFilters),
            KeyCode::Char('c') => Some(Message::ToggleCompact),
            KeyCode::Char('y') => Some(Message::CopyRow),
            KeyCode::Char('r') => Some(Message::Reload),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

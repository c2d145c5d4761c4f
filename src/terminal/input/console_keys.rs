//! 控制台按键来源
//!
//! 基于 crossterm 的原始模式按键事件，转换为与后端无关的 [`KeyEvent`]。

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use linkterm_core::{Key, KeyEvent, Modifiers};

use super::key_reader::KeySource;
use crate::terminal::error::TerminalError;

/// crossterm 按键来源
///
/// 需要控制台处于原始模式，否则按键会被行缓冲。
#[derive(Debug, Default)]
pub struct CrosstermKeySource;

impl KeySource for CrosstermKeySource {
    fn poll_key(&mut self) -> Result<Option<KeyEvent>, TerminalError> {
        loop {
            if !event::poll(Duration::ZERO).map_err(console_error)? {
                return Ok(None);
            }
            // 非按键事件（窗口大小、鼠标、释放）直接丢弃
            if let Event::Key(key) = event::read().map_err(console_error)? {
                if let Some(event) = convert_key(&key) {
                    return Ok(Some(event));
                }
            }
        }
    }
}

fn console_error(err: std::io::Error) -> TerminalError {
    TerminalError::Console(err.to_string())
}

/// 转换 crossterm 按键事件，忽略按键释放
pub fn convert_key(event: &event::KeyEvent) -> Option<KeyEvent> {
    if !matches!(event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return None;
    }

    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Esc => Key::Escape,
        _ => Key::Other,
    };

    let modifiers = Modifiers {
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
        control: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
    };

    Some(KeyEvent::new(key, modifiers))
}

//! 中止序列检测
//!
//! 把按键事件映射为「中止」「转发字符」或「忽略」三种动作。
//!
//! ## 功能
//! - ctrlc / ctrlb 模式：单键中止
//! - tildedot 模式：`~` 后接 `.` 中止，两键之间的状态由检测器保存
//! - 非中止按键翻译为发送给端点的字符

use linkterm_core::{AbortMode, Key, KeyEvent};

/// 对一个按键的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// 用户请求结束会话
    Abort,
    /// 发送该字符到端点
    Forward(char),
    /// 没有对应字符，丢弃
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    Idle,
    TildeSeen,
}

/// 中止序列检测器
#[derive(Debug, Clone)]
pub struct AbortDetector {
    mode: AbortMode,
    state: DetectorState,
}

impl AbortDetector {
    pub fn new(mode: AbortMode) -> Self {
        Self {
            mode,
            state: DetectorState::Idle,
        }
    }

    pub fn mode(&self) -> AbortMode {
        self.mode
    }

    /// 是否已看到 `~`，正在等待 `.`
    pub fn is_armed(&self) -> bool {
        self.state == DetectorState::TildeSeen
    }

    /// 处理一个按键
    ///
    /// tildedot 模式下 `~` 会照常转发；紧随其后的 `.` 触发中止且不转发，
    /// 其他按键让检测器回到初始状态并按普通按键处理。
    pub fn feed(&mut self, event: &KeyEvent) -> KeyAction {
        match self.mode {
            AbortMode::CtrlC if event.is_ctrl_char('c') => return KeyAction::Abort,
            AbortMode::CtrlB if event.is_ctrl_char('b') => return KeyAction::Abort,
            AbortMode::TildeDot => match self.state {
                DetectorState::TildeSeen => {
                    self.state = DetectorState::Idle;
                    if is_dot(event) {
                        return KeyAction::Abort;
                    }
                }
                DetectorState::Idle if event.is_tilde() => {
                    self.state = DetectorState::TildeSeen;
                    return KeyAction::Forward('~');
                }
                DetectorState::Idle => {}
            },
            _ => {}
        }

        translate_key(event).map_or(KeyAction::Ignore, KeyAction::Forward)
    }
}

fn is_dot(event: &KeyEvent) -> bool {
    event.key == Key::Char('.') && !event.modifiers.control && !event.modifiers.alt
}

/// 把按键翻译为发送给端点的字符
///
/// 方向键固定映射为 Ctrl+P / Ctrl+N / Ctrl+B / Ctrl+F 对应的控制码，
/// 与中止模式无关。没有字符的按键返回 `None`。
pub fn translate_key(event: &KeyEvent) -> Option<char> {
    match event.key {
        Key::Up => Some('\x10'),
        Key::Down => Some('\x0e'),
        Key::Left => Some('\x02'),
        Key::Right => Some('\x06'),
        Key::Enter => Some('\r'),
        Key::Tab => Some('\t'),
        Key::Backspace => Some('\x08'),
        Key::Escape => Some('\x1b'),
        Key::Char(c) if event.modifiers.control && c.is_ascii_alphabetic() => {
            Some(char::from(c.to_ascii_uppercase() as u8 & 0x1f))
        }
        Key::Char(c) => Some(c),
        Key::Other => None,
    }
}

//! 按键事件类型
//!
//! 与具体控制台后端无关的按键描述，供中止检测器和按键翻译使用。

/// 按键事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// 按下的键
    pub key: Key,
    /// 同时按住的修饰键
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// 无修饰键的普通按键
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::default())
    }

    /// 无修饰键的字符
    pub fn char(ch: char) -> Self {
        Self::plain(Key::Char(ch))
    }

    /// 按住 Shift 的字符
    pub fn shifted(ch: char) -> Self {
        Self::new(
            Key::Char(ch),
            Modifiers {
                shift: true,
                ..Default::default()
            },
        )
    }

    /// 按住 Ctrl 的字符
    pub fn ctrl(ch: char) -> Self {
        Self::new(
            Key::Char(ch),
            Modifiers {
                control: true,
                ..Default::default()
            },
        )
    }

    /// 是否为 Ctrl + 指定字母（不区分大小写）
    pub fn is_ctrl_char(&self, letter: char) -> bool {
        self.modifiers.control
            && matches!(self.key, Key::Char(c) if c.eq_ignore_ascii_case(&letter))
    }

    /// 是否为波浪号键（`~`，或 Shift + 反引号）
    pub fn is_tilde(&self) -> bool {
        match self.key {
            Key::Char('~') => true,
            Key::Char('`') => self.modifiers.shift,
            _ => false,
        }
    }
}

/// 修饰键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
}

/// 按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// 可打印字符（已计入 Shift 状态）
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Enter,
    Tab,
    Backspace,
    Escape,
    /// 没有对应字符的其他键（功能键等）
    Other,
}

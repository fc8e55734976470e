use std::env;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::style::Color;

use crate::bus::BUS_CAPACITY;
use crate::terminal::Style;

/// Key plus the exact modifier set that must be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn ctrl(ch: char) -> Self {
        Self::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        let code = match event.code {
            // Shift may upper-case the reported character.
            KeyCode::Char(ch) => KeyCode::Char(ch.to_ascii_lowercase()),
            code => code,
        };
        code == self.code && event.modifiers == self.modifiers
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    pub exit_on_ctrl_c: bool,
    pub quit_key: KeyBinding,
    /// Draws an inverted cell under the pointer.
    pub show_mouse_cursor: bool,
    /// Brush the screen is cleared with before windows are drawn.
    pub screen_style: Style,
    pub bus_capacity: usize,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            exit_on_ctrl_c: true,
            quit_key: KeyBinding::ctrl('c'),
            show_mouse_cursor: false,
            screen_style: Style::new(Color::White, Color::Black),
            bus_capacity: BUS_CAPACITY,
        }
    }
}

impl ApplicationConfig {
    /// Defaults with `TERMVISION_MOUSE_CURSOR=1` and
    /// `TERMVISION_NO_CTRL_C_EXIT=1` applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).is_some_and(|value| value.trim() == "1");
        let mut config = Self::default();
        if flag("TERMVISION_MOUSE_CURSOR") {
            config.show_mouse_cursor = true;
        }
        if flag("TERMVISION_NO_CTRL_C_EXIT") {
            config.exit_on_ctrl_c = false;
        }
        config
    }

    pub fn with_exit_on_ctrl_c(mut self, exit: bool) -> Self {
        self.exit_on_ctrl_c = exit;
        self
    }

    pub fn with_quit_key(mut self, key: KeyBinding) -> Self {
        self.quit_key = key;
        self
    }

    pub fn with_mouse_cursor(mut self, show: bool) -> Self {
        self.show_mouse_cursor = show;
        self
    }

    pub fn with_screen_style(mut self, style: Style) -> Self {
        self.screen_style = style;
        self
    }

    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_key_needs_exact_modifiers() {
        let quit = KeyBinding::ctrl('c');
        assert!(quit.matches(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!quit.matches(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!quit.matches(&KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL | KeyModifiers::ALT
        )));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = ApplicationConfig::from_lookup(|key| match key {
            "TERMVISION_MOUSE_CURSOR" => Some("1".to_string()),
            "TERMVISION_NO_CTRL_C_EXIT" => Some("0".to_string()),
            _ => None,
        });
        assert!(config.show_mouse_cursor);
        assert!(config.exit_on_ctrl_c);

        let config = ApplicationConfig::from_lookup(|key| {
            (key == "TERMVISION_NO_CTRL_C_EXIT").then(|| "1".to_string())
        });
        assert!(!config.exit_on_ctrl_c);
        assert!(!config.show_mouse_cursor);
        assert_eq!(config.bus_capacity, BUS_CAPACITY);
    }
}

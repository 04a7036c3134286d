/// Key presses the composer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter { shift: bool },
    Backspace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerAction {
    None,
    Submit(String),
}

/// Multi-line message input. Enter submits, Shift+Enter breaks the line.
#[derive(Debug, Clone)]
pub struct Composer {
    text: String,
    focused: bool,
}

pub const PLACEHOLDER: &str = "Write a message... (Shift+Enter for new line)";

impl Default for Composer {
    fn default() -> Self {
        Composer {
            text: String::new(),
            focused: true,
        }
    }
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, key: KeyInput) -> ComposerAction {
        match key {
            KeyInput::Char(c) => {
                self.text.push(c);
                ComposerAction::None
            }
            KeyInput::Backspace => {
                self.text.pop();
                ComposerAction::None
            }
            KeyInput::Enter { shift: true } => {
                self.text.push('\n');
                ComposerAction::None
            }
            KeyInput::Enter { shift: false } => match self.submit() {
                Some(text) => ComposerAction::Submit(text),
                None => ComposerAction::None,
            },
        }
    }

    /// Takes the trimmed text out of the composer. Blank input is left as is.
    pub fn submit(&mut self) -> Option<String> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let text = trimmed.to_string();
        self.text.clear();
        Some(text)
    }

    /// Types a terminal line key by key and presses Enter.
    pub fn enter_line(&mut self, line: &str) -> ComposerAction {
        for c in line.chars() {
            self.handle_key(KeyInput::Char(c));
        }
        self.handle_key(KeyInput::Enter { shift: false })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

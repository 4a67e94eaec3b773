// src/system/input.rs

//! Interactive value sources used by flags with an `external_editor`.

use crate::constants::DEFAULT_EDITOR;
use crate::core::errors::EngineError;
use dialoguer::{Editor, Password, theme::ColorfulTheme};

/// Reads flag values from the user. The engine holds one boxed helper that
/// tests replace with a stub.
pub trait InputHelper: std::fmt::Debug {
    /// Prompts for a hidden value.
    fn read_secret(&self, prompt: &str) -> Result<String, EngineError>;

    /// Opens `editor` (a program name) on `initial` and returns the saved text.
    fn edit_text(&self, editor: &str, initial: &str) -> Result<String, EngineError>;
}

/// The terminal-backed helper.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl InputHelper for TerminalInput {
    fn read_secret(&self, prompt: &str) -> Result<String, EngineError> {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| EngineError::Input(e.to_string()))
    }

    fn edit_text(&self, editor: &str, initial: &str) -> Result<String, EngineError> {
        let edited = Editor::new()
            .executable(editor)
            .edit(initial)
            .map_err(|e| EngineError::Input(e.to_string()))?;
        // `None` means the user quit without saving.
        Ok(edited.unwrap_or_default())
    }
}

/// Resolves the editor program named by the env var `source`, defaulting to
/// `vi`.
pub fn editor_program<F>(source: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(source)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_program_falls_back_to_default() {
        assert_eq!(editor_program("EDITOR", |_| None), "vi");
        assert_eq!(editor_program("EDITOR", |_| Some("  ".into())), "vi");
        assert_eq!(
            editor_program("EDITOR", |k| (k == "EDITOR").then(|| "nano".to_string())),
            "nano"
        );
    }
}

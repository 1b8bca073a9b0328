//! Interactive input
//!
//! Opens $EDITOR for paste content and prompts for short values.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process::Command;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

/// Open content in the user's preferred editor
///
/// Uses $EDITOR, $VISUAL, or falls back to common editors.
pub fn edit_text(initial_content: &str) -> Result<String> {
    let editor = find_editor()?;

    let temp_path = env::temp_dir().join(format!("paste_edit_{}.txt", std::process::id()));

    fs::write(&temp_path, initial_content)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let status = Command::new(&editor)
        .arg(&temp_path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        let _ = fs::remove_file(&temp_path);
        bail!(
            "Editor '{}' exited with non-zero status. Check that your editor is configured correctly.",
            editor
        );
    }

    let content = fs::read_to_string(&temp_path)
        .with_context(|| format!("Failed to read edited file: {:?}", temp_path))?;

    let _ = fs::remove_file(&temp_path);

    Ok(content)
}

/// Read paste content when none was given on the command line
///
/// Piped stdin is read to the end; on a terminal the editor is opened.
pub fn read_content(initial_content: &str) -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        return edit_text(initial_content);
    }

    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read content from stdin")?;
    Ok(content)
}

/// Find the user's preferred editor
fn find_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.is_empty() {
                return Ok(editor);
            }
        }
    }

    let common_editors = ["nano", "vim", "vi", "emacs", "code", "notepad"];

    for editor in common_editors {
        if command_exists(editor) {
            return Ok(editor.to_string());
        }
    }

    bail!(
        "No editor found. Set $EDITOR environment variable.\n\
         Example: export EDITOR=nano"
    )
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Prompt for a single line
pub fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Prompt with a default value, returns None if user keeps default
pub fn prompt_with_default(label: &str, default: &str) -> Result<Option<String>> {
    let input = if default.is_empty() {
        prompt(label)?
    } else {
        prompt(&format!("{} [{}]", label, default))?
    };

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input))
    }
}

/// Outcome of one key press while reading a password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasswordKey {
    Continue,
    Submit,
    Cancel,
}

/// Apply a key press to the password buffer
fn apply_password_key(buffer: &mut String, key: KeyEvent) -> PasswordKey {
    if key.kind != KeyEventKind::Press {
        return PasswordKey::Continue;
    }

    match key.code {
        KeyCode::Enter => PasswordKey::Submit,
        KeyCode::Esc => PasswordKey::Cancel,
        KeyCode::Char('c') | KeyCode::Char('d')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            PasswordKey::Cancel
        }
        KeyCode::Backspace => {
            buffer.pop();
            PasswordKey::Continue
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            PasswordKey::Continue
        }
        _ => PasswordKey::Continue,
    }
}

/// Leaves raw mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to switch terminal to raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Prompt for a password without echoing it
///
/// Requires a terminal. Scripts pass `--password-stdin` instead.
pub fn prompt_password(label: &str) -> Result<String> {
    if !atty::is(atty::Stream::Stdin) {
        bail!("No terminal to prompt for a password. Use --password-stdin.");
    }

    print!("{}: ", label);
    io::stdout().flush()?;

    let mut password = String::new();
    let outcome = {
        let _raw = RawModeGuard::enable()?;
        loop {
            if let Event::Key(key) = event::read().context("Failed to read key press")? {
                match apply_password_key(&mut password, key) {
                    PasswordKey::Continue => continue,
                    done => break done,
                }
            }
        }
    };
    println!();

    if outcome == PasswordKey::Cancel {
        bail!("Cancelled.");
    }
    Ok(password)
}

/// Read a password from the first line of stdin
pub fn password_from_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read password from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_editor_with_env() {
        // Depends on the environment, so just verify it doesn't panic
        let _ = find_editor();
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_password_keys() {
        let mut buffer = String::new();
        for c in "pa$s".chars() {
            assert_eq!(
                apply_password_key(&mut buffer, press(KeyCode::Char(c))),
                PasswordKey::Continue
            );
        }
        apply_password_key(&mut buffer, press(KeyCode::Backspace));
        assert_eq!(buffer, "pa$");

        assert_eq!(
            apply_password_key(&mut buffer, press(KeyCode::Enter)),
            PasswordKey::Submit
        );
        assert_eq!(
            apply_password_key(
                &mut buffer,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
            ),
            PasswordKey::Cancel
        );
        assert_eq!(buffer, "pa$");
    }

    #[test]
    fn test_password_ignores_key_release() {
        let mut buffer = String::new();
        let mut release = press(KeyCode::Char('x'));
        release.kind = KeyEventKind::Release;
        apply_password_key(&mut buffer, release);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_command_exists() {
        #[cfg(unix)]
        assert!(command_exists("ls"));

        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }
}

//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! Public listings and details print `Paste` values only, which carry no
//! owner id.

use pastebin_core::{ImportReport, Notice, NoticeLevel, Paste, PasteDetail, Session};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a paste with its counts and the actions available to the viewer
    pub fn print_detail(&self, detail: &PasteDetail) {
        match self.format {
            OutputFormat::Human => {
                let paste = &detail.paste;
                println!("ID:      {}", paste.id);
                println!("Title:   {}", paste.title);
                println!("Created: {}", paste.created_at.format("%Y-%m-%d %H:%M"));
                println!(
                    "Size:    {} line(s), {} char(s)",
                    detail.line_count, detail.char_count
                );
                let mut actions = Vec::new();
                if detail.affordances.edit {
                    actions.push("edit");
                }
                if detail.affordances.delete {
                    actions.push("delete");
                }
                if !actions.is_empty() {
                    println!("Actions: {}", actions.join(", "));
                }
                println!("────────────────────────────────────────");
                println!("{}", paste.content);
            }
            OutputFormat::Json => print_json(detail),
            OutputFormat::Quiet => {
                println!("{}", detail.paste.id);
            }
        }
    }

    /// Print a list of pastes
    pub fn print_pastes(&self, pastes: &[&Paste]) {
        match self.format {
            OutputFormat::Human => {
                if pastes.is_empty() {
                    println!("No pastes found.");
                    return;
                }
                for paste in pastes {
                    println!(
                        "{} | {} | {}",
                        short_id(&paste.id),
                        truncate(&paste.title, 40),
                        truncate_line(&paste.content, 40)
                    );
                }
                println!("\n{} paste(s)", pastes.len());
            }
            OutputFormat::Json => print_json(&pastes),
            OutputFormat::Quiet => {
                for paste in pastes {
                    println!("{}", paste.id);
                }
            }
        }
    }

    /// Print the signed-in identity (never its tokens)
    pub fn print_session(&self, session: Option<&Session>) {
        match (self.format, session) {
            (OutputFormat::Human, Some(session)) => {
                println!("Logged in as {} ({})", session.email, session.uid);
            }
            (OutputFormat::Human, None) => println!("Not logged in."),
            (OutputFormat::Json, session) => {
                println!(
                    "{}",
                    serde_json::json!({
                        "uid": session.map(|s| s.uid.as_str()),
                        "email": session.map(|s| s.email.as_str()),
                    })
                );
            }
            (OutputFormat::Quiet, Some(session)) => println!("{}", session.uid),
            (OutputFormat::Quiet, None) => {}
        }
    }

    /// Print the outcome of a legacy import
    pub fn print_import(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!("Imported {} paste(s).", report.imported.len());
                if !report.rejected.is_empty() {
                    println!("Skipped {}:", report.rejected.len());
                    for (title, error) in &report.rejected {
                        let title = if title.trim().is_empty() {
                            "(untitled)"
                        } else {
                            title.as_str()
                        };
                        println!("  {} - {}", truncate(title, 40), error);
                    }
                }
            }
            OutputFormat::Json => {
                let rejected: Vec<_> = report
                    .rejected
                    .iter()
                    .map(|(title, error)| {
                        serde_json::json!({"title": title, "reason": error.reason()})
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({"imported": report.imported, "rejected": rejected})
                );
            }
            OutputFormat::Quiet => {
                for paste in &report.imported {
                    println!("{}", paste.id);
                }
            }
        }
    }

    /// Print a client notice
    ///
    /// Errors go to stderr, and are shown even in quiet mode.
    pub fn notice(&self, notice: &Notice) {
        match (self.format, notice.level) {
            (_, NoticeLevel::Success) => self.success(&notice.message),
            (OutputFormat::Json, NoticeLevel::Error) => {
                println!(
                    "{}",
                    serde_json::json!({"status": "error", "message": notice.message})
                );
            }
            (_, NoticeLevel::Error) => eprintln!("✗ {}", notice.message),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// First eight characters of an id
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Truncate a string to max length in characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pastebin_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
///
/// The API key is shown as set/unset only.
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backend": config.backend.to_string(),
                    "firebase_api_key": config.firebase_api_key.is_some(),
                    "firebase_project_id": config.firebase_project_id,
                    "share_url": config.share_url,
                    "log_file": config.log_path(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:            {}", config.data_dir.display());
            println!("  backend:             {}", config.backend);
            println!(
                "  firebase_api_key:    {}",
                if config.firebase_api_key.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!(
                "  firebase_project_id: {}",
                config.firebase_project_id.as_deref().unwrap_or("(not set)")
            );
            println!("  share_url:           {}", config.share_url);
            println!("  log_file:            {}", config.log_path().display());
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "backend" => {
            config.backend = value.parse()?;
        }
        "firebase_api_key" => {
            config.firebase_api_key = optional(&value);
        }
        "firebase_project_id" => {
            config.firebase_project_id = optional(&value);
        }
        "share_url" => {
            if value.is_empty() {
                bail!("share_url cannot be empty");
            }
            config.share_url = value.clone();
        }
        "log_file" => {
            config.log_file = optional(&value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, backend, firebase_api_key, firebase_project_id, share_url, log_file",
                key
            );
        }
    }

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    if key == "firebase_api_key" {
        output.success("Set firebase_api_key");
    } else {
        output.success(&format!("Set {} = {}", key, value));
    }

    Ok(())
}

/// Empty or "none" clears an optional value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

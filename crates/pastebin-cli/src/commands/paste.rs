//! Paste command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pastebin_core::{parse_export, CreatePasteRequest, Paste, UpdatePasteRequest};

use crate::app::{resolve_id, App};
use crate::editor::{confirm, prompt, prompt_with_default, read_content};
use crate::output::Output;

/// Create a new paste
pub async fn create(
    app: &mut App,
    title: Option<String>,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    let title = match title {
        Some(title) => title,
        None => prompt("Title")?,
    };
    let content = match content {
        Some(content) => content,
        None => read_content("")?,
    };

    // Duplicate titles are checked against the public list
    app.refresh(output).await?;

    let result = app
        .client
        .create(CreatePasteRequest::new(title, content))
        .await;
    app.flush(output);
    let paste = result?;

    output.message(&format!("Share: {}", app.config.share_link(&paste.id)));
    if let Some(detail) = app.client.detail(&paste.id) {
        output.print_detail(&detail);
    }
    Ok(())
}

/// List all pastes, optionally filtered by title
pub async fn list(app: &mut App, search: Option<String>, output: &Output) -> Result<()> {
    app.refresh(output).await?;
    let pastes = app.client.search_all(search.as_deref().unwrap_or(""));
    output.print_pastes(&pastes);
    Ok(())
}

/// List the signed-in user's pastes, optionally filtered by title
pub async fn mine(app: &mut App, search: Option<String>, output: &Output) -> Result<()> {
    app.refresh_mine(output).await?;
    let pastes = app.client.search_mine(search.as_deref().unwrap_or(""));
    output.print_pastes(&pastes);
    Ok(())
}

/// Show a single paste
pub async fn show(app: &mut App, id: String, output: &Output) -> Result<()> {
    app.refresh(output).await?;
    if app.client.session().current().is_some() {
        app.refresh_mine(output).await?;
    }
    let id = resolve_id(app, &id)?;

    let result = app.client.load_detail(&id).await;
    app.flush(output);
    let detail = result?.ok_or_else(|| anyhow::anyhow!("Paste not found: {}", id))?;

    output.print_detail(&detail);
    Ok(())
}

/// Edit a paste owned by the signed-in user
pub async fn edit(
    app: &mut App,
    id: String,
    title: Option<String>,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    let (id, current) = owned_paste(app, &id, "edit", output).await?;

    let interactive = title.is_none() && content.is_none();
    let title = match title {
        Some(title) => title,
        None if interactive => {
            println!("Editing paste: {}", id);
            println!("Press Enter to keep current value.\n");
            prompt_with_default("Title", &current.title)?.unwrap_or_else(|| current.title.clone())
        }
        None => current.title.clone(),
    };
    let content = match content {
        Some(content) => content,
        None if interactive => read_content(&current.content)?,
        None => current.content.clone(),
    };

    let result = app
        .client
        .update(UpdatePasteRequest::new(id.clone(), title, content))
        .await;
    app.flush(output);
    result?;

    if let Some(detail) = app.client.detail(&id) {
        output.print_detail(&detail);
    }
    Ok(())
}

/// Delete a paste owned by the signed-in user
pub async fn delete(app: &mut App, id: String, output: &Output) -> Result<()> {
    let (id, paste) = owned_paste(app, &id, "delete", output).await?;

    if output.should_prompt() {
        println!("Delete paste: {} - {}", id, paste.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let result = app.client.remove(&id).await;
    app.flush(output);
    Ok(result?)
}

/// Print the direct link of a paste
pub async fn share(app: &mut App, id: String, output: &Output) -> Result<()> {
    app.refresh(output).await?;
    let id = resolve_id(app, &id)?;
    if app.client.pastes().find(&id).is_none() {
        bail!("No paste found matching: {}", id);
    }

    let link = app.config.share_link(&id);
    if output.is_quiet() {
        println!("{}", link);
    } else {
        output.message(&link);
    }
    Ok(())
}

/// Re-create the pastes of a legacy local-storage export
pub async fn import(app: &mut App, file: PathBuf, output: &Output) -> Result<()> {
    let json = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read export file: {:?}", file))?;
    let entries =
        parse_export(&json).with_context(|| format!("Not a paste export: {:?}", file))?;

    app.refresh(output).await?;

    let result = app.client.import_legacy(&entries).await;
    app.flush(output);
    let report = result?;

    output.print_import(&report);
    Ok(())
}

/// Resolve `id` to a cached paste the session may modify
async fn owned_paste(
    app: &mut App,
    id: &str,
    action: &str,
    output: &Output,
) -> Result<(String, Paste)> {
    app.refresh(output).await?;
    let id = resolve_id(app, id)?;
    let Some(paste) = app.client.pastes().find(&id).cloned() else {
        bail!("No paste found matching: {}", id);
    };

    app.refresh_mine(output).await?;
    if !app.client.can_modify(&id) {
        bail!("You can only {} your own pastes.", action);
    }
    Ok((id, paste))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use pastebin_core::Config;
    use tempfile::TempDir;

    async fn open_app(dir: &TempDir) -> App {
        let mut config = Config::default();
        config.data_dir = dir.path().to_path_buf();
        App::open(config).await.unwrap()
    }

    /// u1 creates a paste, then u2 signs in on the same data directory
    async fn paste_owned_by_someone_else(app: &mut App) -> Paste {
        app.client
            .register("first@example.com", "secret-pw")
            .await
            .unwrap();
        let paste = app
            .client
            .create(CreatePasteRequest::new("Owned by first", "body"))
            .await
            .unwrap();
        app.client.logout().await.unwrap();
        app.client
            .register("second@example.com", "secret-pw")
            .await
            .unwrap();
        paste
    }

    #[tokio::test]
    async fn test_edit_and_delete_refused_for_non_owner() {
        let dir = TempDir::new().unwrap();
        let mut app = open_app(&dir).await;
        let output = Output::new(OutputFormat::Quiet);
        let paste = paste_owned_by_someone_else(&mut app).await;

        let err = edit(
            &mut app,
            paste.id.clone(),
            Some("Taken over".to_string()),
            Some("new body".to_string()),
            &output,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "You can only edit your own pastes.");

        let err = delete(&mut app, paste.id.clone(), &output)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "You can only delete your own pastes.");

        // The stored paste is untouched
        app.refresh(&output).await.unwrap();
        let stored = app.client.pastes().find(&paste.id).unwrap();
        assert_eq!(stored.title, "Owned by first");
        assert_eq!(stored.content, "body");
        assert_eq!(app.client.pastes().all().len(), 1);
    }

    #[tokio::test]
    async fn test_owner_can_edit_with_flags() {
        let dir = TempDir::new().unwrap();
        let mut app = open_app(&dir).await;
        let output = Output::new(OutputFormat::Quiet);

        app.client
            .register("first@example.com", "secret-pw")
            .await
            .unwrap();
        let paste = app
            .client
            .create(CreatePasteRequest::new("Mine", "body"))
            .await
            .unwrap();

        edit(
            &mut app,
            paste.id[..8].to_string(),
            Some("Renamed".to_string()),
            None,
            &output,
        )
        .await
        .unwrap();

        app.refresh(&output).await.unwrap();
        let stored = app.client.pastes().find(&paste.id).unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.content, "body");
    }

    #[tokio::test]
    async fn test_edit_unknown_id() {
        let dir = TempDir::new().unwrap();
        let mut app = open_app(&dir).await;
        let output = Output::new(OutputFormat::Quiet);

        let err = edit(&mut app, "missing".to_string(), None, None, &output)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No paste found"));
    }
}

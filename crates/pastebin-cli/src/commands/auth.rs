//! Account command handlers

use anyhow::Result;

use crate::app::App;
use crate::editor::{password_from_stdin, prompt_password};
use crate::output::Output;

fn read_password(password_stdin: bool) -> Result<String> {
    if password_stdin {
        password_from_stdin()
    } else {
        prompt_password("Password")
    }
}

/// Create an account and sign in
pub async fn register(
    app: &mut App,
    email: String,
    password_stdin: bool,
    output: &Output,
) -> Result<()> {
    let password = read_password(password_stdin)?;
    let result = app.client.register(email.trim(), &password).await;
    app.flush(output);
    result?;
    Ok(())
}

/// Sign in to an existing account
pub async fn login(
    app: &mut App,
    email: String,
    password_stdin: bool,
    output: &Output,
) -> Result<()> {
    let password = read_password(password_stdin)?;
    let result = app.client.login(email.trim(), &password).await;
    app.flush(output);
    result?;
    Ok(())
}

/// Sign out
pub async fn logout(app: &mut App, output: &Output) -> Result<()> {
    if app.client.session().current().is_none() {
        output.message("Not logged in.");
        return Ok(());
    }

    let result = app.client.logout().await;
    app.flush(output);
    Ok(result?)
}

/// Show the signed-in account
pub fn whoami(app: &App, output: &Output) -> Result<()> {
    output.print_session(app.client.session().current().as_ref());
    Ok(())
}

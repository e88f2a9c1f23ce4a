//! CLI command implementations

pub mod auth;
pub mod queries;
pub mod recommend;
pub mod status;

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use dialoguer::{Input, Password};

use altrec_core::{AltrecContext, Identity, Route, RouteDecision, SessionSubscription};

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "ALTREC_PASSWORD";

/// A context whose stored session has been restored
///
/// The subscription keeps following provider session changes for as long as
/// the command runs.
pub struct Session {
    pub ctx: AltrecContext,
    _subscription: SessionSubscription,
}

/// Get the altrec directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var("ALTREC_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".altrec"))
        .ok_or_else(|| anyhow!("Could not find home directory; set ALTREC_DIR"))
}

/// Build the context without touching the backend
pub fn get_context() -> Result<AltrecContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create altrec directory: {:?}", data_dir))?;

    AltrecContext::new(&data_dir).context("Failed to initialize altrec context")
}

/// Build the context and restore the stored session
pub async fn get_session() -> Result<Session> {
    let ctx = get_context()?;
    let subscription = ctx.restore_session().await;

    Ok(Session {
        ctx,
        _subscription: subscription,
    })
}

/// Fail with a sign-in hint unless the current session may open `route`
pub fn require_route(ctx: &AltrecContext, route: &Route) -> Result<Identity> {
    match ctx.evaluate_route(route) {
        RouteDecision::Allow => ctx
            .session
            .current_identity()
            .ok_or_else(|| anyhow!("Not signed in. Run `altrec login` first.")),
        RouteDecision::Loading => bail!("Session is still being restored, try again"),
        RouteDecision::Redirect { to, .. } => bail!(
            "Not signed in. Run `altrec {}` first.",
            to.trim_start_matches('/')
        ),
    }
}

/// Fail with a registration hint unless someone is signed in to write
pub fn require_writer(ctx: &AltrecContext, route: &Route) -> Result<Identity> {
    if let Some(identity) = ctx.session.current_identity() {
        return Ok(identity);
    }
    match RouteDecision::for_unauthenticated_write(route) {
        RouteDecision::Redirect { to, .. } => bail!(
            "You need an account for this. Run `altrec {}` (or `altrec login`) first.",
            to.trim_start_matches('/')
        ),
        _ => bail!("Not signed in. Run `altrec login` first."),
    }
}

/// Use `value` when given, otherwise prompt for it
pub fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    let v: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(v)
}

/// Use `value` when given, otherwise prompt with `current` prefilled
pub fn value_or_edit(value: Option<String>, prompt: &str, current: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    let v: String = Input::new()
        .with_prompt(prompt)
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()?;
    Ok(v)
}

/// Get password from --password flag, ALTREC_PASSWORD env var, or prompt
pub fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    if let Ok(p) = env::var(PASSWORD_ENV) {
        return Ok(p);
    }
    let p = Password::new().with_prompt("Password").interact()?;
    Ok(p)
}

/// Like `password_or_prompt`, but an interactive password is asked twice
pub fn new_password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    if let Ok(p) = env::var(PASSWORD_ENV) {
        return Ok(p);
    }
    let p = Password::new()
        .with_prompt("Choose a password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;
    Ok(p)
}

//! Account commands - register, login, logout, profile

use anyhow::{bail, Result};
use colored::Colorize;

use altrec_core::Identity;

use super::{get_context, get_session, new_password_or_prompt, password_or_prompt, value_or_prompt};
use crate::output;

pub async fn register(
    email: Option<String>,
    name: Option<String>,
    photo: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;

    if let Some(current) = ctx.session.current_identity() {
        output::warning(&format!("Signed in as {}; registering replaces that session", current.email));
    }

    let email = value_or_prompt(email, "Email")?;
    let name = value_or_prompt(name, "Display name")?;
    let password = new_password_or_prompt(password)?;

    let identity = ctx
        .session
        .register_with_password(&email, &password, &name, photo.as_deref())
        .await?;

    output::success(&format!("Welcome, {}! Your account is ready.", identity.first_name()));
    Ok(())
}

pub async fn login(email: Option<String>, password: Option<String>, provider: bool) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;

    let identity = if provider {
        ctx.session.login_with_provider().await?
    } else {
        let email = value_or_prompt(email, "Email")?;
        let password = password_or_prompt(password)?;
        ctx.session.login_with_password(&email, &password).await?
    };

    greet(&identity);
    Ok(())
}

/// Sign out without restoring the stored session first
pub async fn logout() -> Result<()> {
    let ctx = get_context()?;

    let was = ctx.session.provider_user();
    ctx.session.logout().await?;

    match was {
        Some(user) => output::success(&format!(
            "Signed out {}",
            user.email.as_deref().unwrap_or(&user.uid)
        )),
        None => output::info("Not signed in"),
    }
    Ok(())
}

pub async fn profile(name: Option<String>, photo: Option<String>) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;

    let Some(current) = ctx.session.current_identity() else {
        bail!("Not signed in. Run `altrec login` first.");
    };

    if name.is_none() && photo.is_none() {
        output::warning("Nothing to update; pass --name and/or --photo");
        return Ok(());
    }

    let name = name.unwrap_or(current.display_name);
    let photo = photo.or(current.photo_url);
    let identity = ctx
        .session
        .update_display_profile(&name, photo.as_deref())
        .await?;

    output::success("Profile updated");
    println!("  Name:  {}", identity.display_name);
    println!("  Photo: {}", identity.photo_url.as_deref().unwrap_or("-"));
    Ok(())
}

fn greet(identity: &Identity) {
    println!(
        "{} Signed in as {} ({})",
        "✓".green(),
        identity.first_name().bold(),
        identity.email
    );
}

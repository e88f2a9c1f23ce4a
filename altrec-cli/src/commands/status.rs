//! Status command - show the session and client settings

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

use altrec_core::{Identity, Route, RouteDecision};

use super::get_session;
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    signed_in: bool,
    identity: Option<Identity>,
    backend_session: bool,
    identity_provider: String,
    api_base_url: String,
    data_dir: String,
}

pub async fn run(json: bool) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    let identity = ctx.session.current_identity();

    let report = StatusReport {
        signed_in: identity.is_some(),
        backend_session: identity.as_ref().is_some_and(Identity::is_backend_authenticated),
        identity,
        identity_provider: ctx.session.provider_name().to_string(),
        api_base_url: ctx.config.api_base_url.clone(),
        data_dir: ctx.data_dir.display().to_string(),
    };

    if json {
        return output::print_json(&report);
    }

    println!("{}", "Altrec Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    match &report.identity {
        Some(identity) => {
            table.add_row(vec!["Signed in as", &identity.email]);
            table.add_row(vec!["Name", &identity.display_name]);
            table.add_row(vec!["Photo", identity.photo_url.as_deref().unwrap_or("-")]);
            table.add_row(vec![
                "Backend session",
                if report.backend_session { "active" } else { "missing" },
            ]);
        }
        None => {
            table.add_row(vec!["Signed in as", "-"]);
        }
    }
    table.add_row(vec!["Identity provider", &report.identity_provider]);
    table.add_row(vec!["API", &report.api_base_url]);
    table.add_row(vec!["Data directory", &report.data_dir]);

    println!("{}", table);
    Ok(())
}

/// Report what the route guard decides for `path`
pub async fn route(path: &str) -> Result<()> {
    let session = get_session().await?;
    let route = Route::parse(path);

    if let Route::NotFound(path) = &route {
        output::warning(&format!("{} is not a known view", path));
        return Ok(());
    }

    match session.ctx.evaluate_route(&route) {
        RouteDecision::Allow => output::success(&format!("{} is open", route)),
        RouteDecision::Loading => output::info(&format!("{} is waiting for the session", route)),
        RouteDecision::Redirect { to, from } => {
            output::warning(&format!("{} needs a signed-in user; redirects to {}", from, to))
        }
    }
    Ok(())
}

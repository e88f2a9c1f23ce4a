//! Queries commands - browse, ask and maintain product queries

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;

use altrec_core::{Error, NewQuery, QueryUpdate, Route};

use super::{get_session, require_route, require_writer, value_or_edit, value_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum QueriesCommands {
    /// List all queries, optionally filtered by product name
    List {
        /// Search term
        #[arg(long, short)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent queries
    Recent {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a query and its recommendations
    Show {
        /// Query ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List your own queries
    Mine {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask for alternatives to a product
    Add(QueryFields),
    /// Edit one of your queries
    Update {
        /// Query ID
        id: String,
        #[command(flatten)]
        fields: QueryFields,
    },
    /// Delete one of your queries
    Delete {
        /// Query ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Query form fields; missing ones are prompted for
#[derive(Args)]
pub struct QueryFields {
    /// Query title
    #[arg(long)]
    title: Option<String>,
    /// Product to replace
    #[arg(long)]
    product: Option<String>,
    /// Product brand
    #[arg(long)]
    brand: Option<String>,
    /// Product image URL
    #[arg(long)]
    image: Option<String>,
    /// Why you want an alternative
    #[arg(long)]
    reason: Option<String>,
}

pub async fn run(command: QueriesCommands) -> Result<()> {
    match command {
        QueriesCommands::List { search, json } => list(search, json).await,
        QueriesCommands::Recent { json } => recent(json).await,
        QueriesCommands::Show { id, json } => show(&id, json).await,
        QueriesCommands::Mine { json } => mine(json).await,
        QueriesCommands::Add(fields) => add(fields).await,
        QueriesCommands::Update { id, fields } => update(&id, fields).await,
        QueriesCommands::Delete { id, force } => delete(&id, force).await,
    }
}

async fn list(search: Option<String>, json: bool) -> Result<()> {
    let session = get_session().await?;
    let queries = session.ctx.pages.queries(search.as_deref()).await;

    if json {
        return output::print_json(&queries);
    }
    output::print_queries(&queries);
    Ok(())
}

async fn recent(json: bool) -> Result<()> {
    let session = get_session().await?;
    let queries = session.ctx.pages.home().await;

    if json {
        return output::print_json(&queries);
    }
    println!("{}", "Recent Queries".bold());
    output::print_queries(&queries);
    Ok(())
}

async fn show(id: &str, json: bool) -> Result<()> {
    let session = get_session().await?;
    let details = session.ctx.pages.details(id).await;

    let Some(query) = &details.query else {
        bail!("Query {} not found", id);
    };

    if json {
        return output::print_json(&serde_json::json!({
            "query": query,
            "recommendations": details.recommendations,
        }));
    }

    output::print_query_details(query);
    println!();
    println!("{}", "Recommendations".bold());
    output::print_recommendations(&details.recommendations);
    Ok(())
}

async fn mine(json: bool) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    require_route(ctx, &Route::MyQueries)?;

    let queries = ctx.queries.mine().await?;
    if json {
        return output::print_json(&queries);
    }
    output::print_queries(&queries);
    Ok(())
}

async fn add(fields: QueryFields) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    require_writer(ctx, &Route::AddQuery)?;

    let query = NewQuery {
        query_title: value_or_prompt(fields.title, "Query title")?,
        product_name: value_or_prompt(fields.product, "Product name")?,
        product_brand: value_or_prompt(fields.brand, "Product brand")?,
        product_image: value_or_edit(fields.image, "Product image URL", "")?,
        boycott_reason: value_or_prompt(fields.reason, "Why do you want an alternative?")?,
        ..Default::default()
    };

    let ack = ctx.queries.create(query).await?;
    match ack.inserted_id {
        Some(id) => output::success(&format!("Query posted ({})", id)),
        None => output::success("Query posted"),
    }
    Ok(())
}

async fn update(id: &str, fields: QueryFields) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    require_route(ctx, &Route::UpdateQuery(id.to_string()))?;

    let current = match ctx.queries.load_for_update(id).await {
        Ok(query) => query,
        Err(Error::Forbidden(_)) => bail!("Query {} belongs to someone else", id),
        Err(e) => return Err(e.into()),
    };
    let existing = QueryUpdate::from(&current);

    let update = QueryUpdate {
        query_title: value_or_edit(fields.title, "Query title", &existing.query_title)?,
        product_name: value_or_edit(fields.product, "Product name", &existing.product_name)?,
        product_brand: value_or_edit(fields.brand, "Product brand", &existing.product_brand)?,
        product_image: value_or_edit(fields.image, "Product image URL", &existing.product_image)?,
        boycott_reason: value_or_edit(fields.reason, "Reason", &existing.boycott_reason)?,
    };

    if update == existing {
        output::info("No changes");
        return Ok(());
    }

    ctx.queries.update(id, &update).await?;
    output::success(&format!("Query {} updated", id));
    Ok(())
}

async fn delete(id: &str, force: bool) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    require_route(ctx, &Route::MyQueries)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete query {}?", id))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    ctx.queries.delete(id).await?;
    output::success(&format!("Query {} deleted", id));
    Ok(())
}

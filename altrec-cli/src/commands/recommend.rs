//! Recommend commands - suggest alternatives and review recommendations

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use altrec_core::{NewRecommendation, Route};

use super::{get_session, require_route, require_writer, value_or_edit, value_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum RecommendCommands {
    /// Recommend an alternative for a query
    Add {
        /// Query ID
        query_id: String,
        /// Recommendation title
        #[arg(long)]
        title: Option<String>,
        /// Recommended product
        #[arg(long)]
        product: Option<String>,
        /// Recommended product image URL
        #[arg(long)]
        image: Option<String>,
        /// Why this product is a good alternative
        #[arg(long)]
        reason: Option<String>,
    },
    /// Recommendations you made
    Mine {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recommendations made on your queries
    ForMe {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one of your recommendations
    Delete {
        /// Recommendation ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub async fn run(command: RecommendCommands) -> Result<()> {
    match command {
        RecommendCommands::Add { query_id, title, product, image, reason } => {
            add(&query_id, title, product, image, reason).await
        }
        RecommendCommands::Mine { json } => mine(json).await,
        RecommendCommands::ForMe { json } => for_me(json).await,
        RecommendCommands::Delete { id, force } => delete(&id, force).await,
    }
}

async fn add(
    query_id: &str,
    title: Option<String>,
    product: Option<String>,
    image: Option<String>,
    reason: Option<String>,
) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    require_writer(ctx, &Route::QueryDetails(query_id.to_string()))?;

    let Some(mut thread) = ctx.pages.details(query_id).await.into_thread() else {
        bail!("Query {} not found", query_id);
    };
    println!(
        "Recommending an alternative to {} ({})",
        thread.query().product_name.bold(),
        thread.query().query_title
    );

    let form = NewRecommendation {
        recommended_title: value_or_prompt(title, "Recommendation title")?,
        recommended_product_name: value_or_prompt(product, "Recommended product")?,
        recommended_product_image: value_or_edit(image, "Product image URL", "")?,
        recommendation_reason: value_or_prompt(reason, "Why is it a good alternative?")?,
        ..Default::default()
    };

    let record = thread.add(&ctx.recommendations, form).await?;
    output::success(&format!("Recommendation posted ({})", record.id));
    println!(
        "{} now has {} recommendation(s)",
        thread.query().query_title,
        thread.query().recommendation_count
    );
    Ok(())
}

async fn mine(json: bool) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    require_route(ctx, &Route::MyRecommendations)?;

    let recommendations = ctx.recommendations.mine().await?;
    if json {
        return output::print_json(&recommendations);
    }
    output::print_recommendations(&recommendations);
    Ok(())
}

async fn for_me(json: bool) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    require_route(ctx, &Route::RecommendationsForMe)?;

    let recommendations = ctx.recommendations.for_me().await?;
    if json {
        return output::print_json(&recommendations);
    }
    output::print_recommendations(&recommendations);
    Ok(())
}

async fn delete(id: &str, force: bool) -> Result<()> {
    let session = get_session().await?;
    let ctx = &session.ctx;
    require_route(ctx, &Route::MyRecommendations)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete recommendation {}?", id))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    ctx.recommendations.delete(id).await?;
    output::success(&format!("Recommendation {} deleted", id));
    Ok(())
}

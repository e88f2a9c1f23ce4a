//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

use altrec_core::{Query, Recommendation};

/// Longest boycott reason shown in list views
const REASON_PREVIEW_CHARS: usize = 60;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print queries as a table, or a hint when there are none
pub fn print_queries(queries: &[Query]) {
    if queries.is_empty() {
        info("No queries found");
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Title", "Product", "Brand", "Reason", "Recs", "Asked by", "Posted"]);
    for query in queries {
        table.add_row(vec![
            query.id.clone(),
            query.query_title.clone(),
            query.product_name.clone(),
            query.product_brand.clone().unwrap_or_default(),
            query.reason_preview(REASON_PREVIEW_CHARS),
            query.recommendation_count.to_string(),
            query.user_name.clone().unwrap_or_default(),
            format_date(query.created_at.as_ref()),
        ]);
    }
    println!("{}", table);
}

/// Print recommendations as a table, or a hint when there are none
pub fn print_recommendations(recommendations: &[Recommendation]) {
    if recommendations.is_empty() {
        info("No recommendations found");
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Query", "Recommended", "Product", "Reason", "By", "Posted"]);
    for rec in recommendations {
        table.add_row(vec![
            rec.id.clone(),
            rec.query_title.clone().unwrap_or_else(|| rec.query_id.clone()),
            rec.recommended_title.clone(),
            rec.recommended_product_name.clone(),
            rec.recommendation_reason.clone().unwrap_or_default(),
            rec.recommender_name.clone().unwrap_or_default(),
            format_date(rec.created_at.as_ref()),
        ]);
    }
    println!("{}", table);
}

/// Print a single query as key-value rows
pub fn print_query_details(query: &Query) {
    println!("{}", query.query_title.bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["ID", &query.id]);
    table.add_row(vec!["Product", &query.product_name]);
    table.add_row(vec!["Brand", query.product_brand.as_deref().unwrap_or("-")]);
    table.add_row(vec!["Image", query.product_image.as_deref().unwrap_or("-")]);
    table.add_row(vec!["Reason", query.boycott_reason.as_deref().unwrap_or("-")]);
    table.add_row(vec!["Asked by", query.user_name.as_deref().unwrap_or("-")]);
    table.add_row(vec!["Posted", &format_date(query.created_at.as_ref())]);
    table.add_row(vec!["Recommendations", &query.recommendation_count.to_string()]);
    println!("{}", table);
}

fn format_date(date: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

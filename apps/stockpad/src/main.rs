//! # Stockpad Dashboard
//!
//! Opens the configured database and prints the numbers the home screen
//! shows: today's sales, the week's best sellers and what needs reordering.
//!
//! ## Usage
//! ```bash
//! cargo run -p stockpad-app --bin stockpad
//! cargo run -p stockpad-app --bin stockpad -- --config ./stockpad.toml
//! STOCKPAD_DB_PATH=./stockpad_dev.db cargo run -p stockpad-app --bin stockpad
//! ```

use chrono::{Duration, Utc};
use std::env;
use std::path::PathBuf;
use stockpad_app::{init_tracing, App, AppConfig};
use stockpad_core::Money;
use tracing::info;

/// Rows shown per dashboard section.
const TOP_N: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockpad Dashboard");
                println!();
                println!("Usage: stockpad [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = AppConfig::load(config_path)?;
    let app = App::new(config).await?;
    let config = app.config();

    let today = Utc::now().date_naive();
    let week_start = today - Duration::days(6);

    println!("{}", config.store.name);
    println!("{}", "=".repeat(config.store.name.chars().count().max(8)));

    let totals = app.sales_totals().execute(today, today).await?;
    println!();
    println!("Today ({})", today);
    println!("  Units sold: {}", totals.total_sold);
    println!("  Revenue:    {}", config.format_money(totals.revenue()));
    println!("  Profit:     {}", config.format_money(totals.profit()));

    let best = app
        .top_selling()
        .execute_by_product(week_start, today, Some(TOP_N))
        .await?;
    println!();
    println!("Best sellers, last 7 days");
    if best.is_empty() {
        println!("  (no sales)");
    }
    for (rank, row) in best.iter().enumerate() {
        let name = app
            .db()
            .products()
            .get_by_id(&row.product_id)
            .await?
            .map(|p| p.name)
            .unwrap_or_else(|| row.product_id.clone());
        println!(
            "  {}. {:<32} {:>5} units  {:>10}",
            rank + 1,
            name,
            row.total_sold,
            config.format_money(Money::from_cents(row.total_revenue_cents))
        );
    }

    let policy = config.dead_stock_policy();
    let now = Utc::now();
    let low = app.low_stock().execute(None).await?;
    println!();
    println!(
        "Low stock (<= {}), dead after {} days without a sale",
        config.inventory.low_stock_threshold, config.inventory.dead_stock_days
    );
    if low.is_empty() {
        println!("  (nothing to reorder)");
    }
    for product in &low {
        let tag = if product.is_dead_stock(&policy, now) { "dead" } else { "" };
        println!("  {:<36} {:>5}  {}", product.name, product.stock_quantity, tag);
    }

    let pending = app.db().sync_outbox().count_pending().await?;
    info!(pending, "Changes waiting for sync");

    app.shutdown().await;
    Ok(())
}

//! # Seed Data Generator
//!
//! Populates a development database with a catalog and a few weeks of sales.
//!
//! ## Usage
//! ```bash
//! cargo run -p stockpad-db --bin seed
//! cargo run -p stockpad-db --bin seed -- --count 500 --days 60
//! cargo run -p stockpad-db --bin seed -- --db ./data/stockpad.db
//! ```
//!
//! Sales go through `InvoiceRepository::create`, so stock levels,
//! `last_sold_at` and the daily sales summaries all come out consistent.

use chrono::{Duration, TimeZone, Utc};
use std::env;
use stockpad_core::{Category, InvoiceDraft, Product};
use stockpad_db::{Database, DbConfig, DbError};
use tracing_subscriber::EnvFilter;

/// Categories and their base products.
const CATALOG: &[(&str, &[&str])] = &[
    (
        "Dairy",
        &["Whole Milk", "Skim Milk", "Greek Yogurt", "Cheddar", "Butter", "Eggs"],
    ),
    (
        "Bakery",
        &["White Bread", "Rye Bread", "Croissant", "Bagel", "Muffin"],
    ),
    (
        "Beverages",
        &["Cola", "Orange Juice", "Sparkling Water", "Iced Tea", "Coffee Beans"],
    ),
    (
        "Snacks",
        &["Potato Chips", "Salted Peanuts", "Chocolate Bar", "Granola Bar", "Popcorn"],
    ),
    (
        "Pantry",
        &["Basmati Rice", "Spaghetti", "Olive Oil", "Canned Tomatoes", "Honey"],
    ),
];

/// Pack sizes and their price addon in cents.
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Regular", 80), ("Large", 190), ("Family", 350)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 100;
    let mut days: i64 = 30;
    let mut db_path = String::from("./stockpad_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(days);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockpad Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 100)");
                println!("  -n, --days <N>     Days of sales history to generate (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockpad_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockpad Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!("History:  {} days", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let products = seed_catalog(&db, count).await?;
    println!("✓ Generated {} products in {:?}", products.len(), start.elapsed());

    let start = std::time::Instant::now();
    let (sales, skipped) = seed_sales(&db, &products, days).await?;
    println!(
        "✓ Generated {} sale invoices ({} skipped for stock) in {:?}",
        sales,
        skipped,
        start.elapsed()
    );

    let today = Utc::now().date_naive();
    let totals = db
        .sales_summaries()
        .totals_between(today - Duration::days(days), today)
        .await?;
    println!();
    println!("Summary check: {} units, revenue {}", totals.total_sold, totals.revenue());
    println!("Search 'milk': {} results", db.products().search("milk", 10).await?.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

async fn seed_catalog(db: &Database, count: usize) -> Result<Vec<Product>, DbError> {
    let mut products = Vec::with_capacity(count);
    let mut seed = 0usize;

    for (category_name, names) in CATALOG {
        let category = db.categories().insert(&Category::new(*category_name, None)).await?;

        for name in names.iter() {
            for (size, addon) in SIZES {
                if products.len() >= count {
                    return Ok(products);
                }

                let product = generate_product(&category.id, name, size, *addon, seed);
                seed += 1;

                match db.products().insert(&product).await {
                    Ok(stored) => products.push(stored),
                    Err(e) => eprintln!("Failed to insert {}: {}", product.name, e),
                }
            }
        }
    }

    Ok(products)
}

/// Creates 1-4 sale invoices per day going back `days` days.
async fn seed_sales(db: &Database, products: &[Product], days: i64) -> Result<(usize, usize), DbError> {
    if products.is_empty() {
        return Ok((0, 0));
    }

    let today = Utc::now().date_naive();
    let mut created = 0;
    let mut skipped = 0;

    for back in (1..=days).rev() {
        let day = today - Duration::days(back);
        let invoices_today = 1 + (back as usize * 7) % 4;

        for k in 0..invoices_today {
            let hour = 9 + (k as u32 * 3) % 10;
            let Some(naive) = day.and_hms_opt(hour, 15, 0) else {
                continue;
            };
            let date = Utc.from_utc_datetime(&naive);

            // Only sell from the first two thirds of the catalog so the
            // rest turns into dead stock for the dashboard.
            let sellable = (products.len() * 2 / 3).max(1);
            let first = (back as usize * 13 + k * 5) % sellable;
            let second = (first + 1 + k) % sellable;

            let mut draft = InvoiceDraft::sale(date).with_line(&products[first].id, 1 + (k as i64 % 3));
            if second != first {
                draft = draft.with_line(&products[second].id, 1);
            }

            match db.invoices().create(&draft).await {
                Ok(_) => created += 1,
                Err(DbError::Rejected(_)) => skipped += 1,
                Err(e) => return Err(e),
            }
        }
    }

    Ok((created, skipped))
}

/// Generates a single product with deterministic, realistic-looking data.
fn generate_product(category_id: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> Product {
    // $0.99 - $8.98 base price
    let price_cents = 99 + ((seed * 37) % 800) as i64 + price_addon;
    // cost is 55-75% of price
    let cost_cents = price_cents * (55 + (seed % 21) as i64) / 100;
    let stock = 3 + ((seed * 11) % 60) as i64;

    let mut product = Product::new(format!("{} {}", name, size), price_cents, cost_cents)
        .with_barcode(format!("200{:010}", seed))
        .with_stock(stock)
        .with_category(category_id);
    product.min_stock = 5;
    product
}

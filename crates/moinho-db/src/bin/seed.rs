//! # Seed Data Generator
//!
//! Creates a demo account with flours, bakeries, clients, and a few weeks
//! of sales, for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./moinho_dev.db with 30 sales (default)
//! cargo run -p moinho-db --bin seed
//!
//! # More sales, another file
//! cargo run -p moinho-db --bin seed -- --sales 200 --db ./data/moinho.db
//! ```
//!
//! Sign in afterwards as `demo@moinho.app` / `moinho123`.

use std::env;

use chrono::{Duration, Utc};
use moinho_core::forms::{BakeryDraft, ClientEntry, FlourDraft, SaleDraft};
use moinho_core::{CommissionRate, LineItem, Money};
use moinho_db::{Database, DbConfig};

const DEMO_EMAIL: &str = "demo@moinho.app";
const DEMO_PASSWORD: &str = "moinho123";

/// (name, price per sack in centavos)
const FLOURS: &[(&str, i64)] = &[
    ("Farinha Especial Tipo 1", 14_500),
    ("Farinha Integral", 16_800),
    ("Farinha de Centeio", 21_000),
    ("Farinha para Pizza 00", 18_900),
    ("Farinha de Semolina", 19_500),
];

/// (bakery, neighborhood, clients)
const BAKERIES: &[(&str, &str, &[&str])] = &[
    ("Padaria Pão Quente", "Centro", &["Maria Souza", "João Lima"]),
    ("Panificadora Trigo de Ouro", "Vila Nova", &["Ana Costa"]),
    ("Padaria Bom Dia", "Jardim América", &["Carlos Pereira", "Beatriz Rocha"]),
    ("Confeitaria Doce Grão", "Boa Vista", &["Fernanda Alves"]),
];

const COMMISSIONS: &[i64] = &[0, 2, 5, 10];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut sales_count: usize = 30;
    let mut db_path = String::from("./moinho_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales_count = args[i + 1].parse().unwrap_or(30);
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
                println!("Moinho Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Number of sales to generate (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./moinho_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Moinho Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Sales:    {}", sales_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.users().find_by_email(DEMO_EMAIL).await?.is_some() {
        println!("⚠ Demo account {} already exists", DEMO_EMAIL);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let owner = db.users().create(DEMO_EMAIL, "Dona do Moinho", DEMO_PASSWORD).await?;
    println!("✓ Created account {}", owner.email);

    for (name, _) in FLOURS {
        db.flours()
            .create(&owner.id, &FlourDraft { name: name.to_string() })
            .await?;
    }
    println!("✓ Created {} flours", FLOURS.len());

    let mut bakery_ids = Vec::with_capacity(BAKERIES.len());
    for (idx, (name, neighborhood, clients)) in BAKERIES.iter().enumerate() {
        let draft = BakeryDraft {
            name: name.to_string(),
            street: Some("Rua das Padarias".to_string()),
            number: Some(format!("{}", 100 + idx * 25)),
            neighborhood: Some(neighborhood.to_string()),
            postal_code: Some(format!("0100{}000", idx)),
            cnpj: Some(format!("12.345.678/000{}-90", idx + 1)),
            phone: Some(format!("11 3333-000{}", idx)),
            clients: clients
                .iter()
                .map(|c| ClientEntry {
                    id: None,
                    name: c.to_string(),
                    phone: None,
                })
                .collect(),
            ..BakeryDraft::default()
        };
        bakery_ids.push(db.bakeries().save_with_clients(&owner.id, None, &draft).await?);
    }
    println!("✓ Created {} bakeries with clients", BAKERIES.len());

    let today = Utc::now().date_naive();
    let start = std::time::Instant::now();
    let mut generated = 0;

    for n in 0..sales_count {
        let item_count = 1 + n % 3;
        let items = (0..item_count)
            .map(|k| {
                let (flour, price) = FLOURS[(n + k) % FLOURS.len()];
                LineItem::new(
                    flour,
                    1 + ((n * 7 + k * 3) % 20) as i64,
                    Money::from_cents(price),
                    CommissionRate::from_percent_int(COMMISSIONS[(n + k) % COMMISSIONS.len()]),
                )
            })
            .collect();

        let draft = SaleDraft {
            bakery_id: bakery_ids[n % bakery_ids.len()].clone(),
            date: today - Duration::days((n % 28) as i64),
            items,
        };

        if let Err(e) = db.sales().create(&owner.id, &draft).await {
            eprintln!("Failed to insert sale {}: {}", n, e);
            continue;
        }
        generated += 1;
    }

    let elapsed = start.elapsed();
    println!("✓ Generated {} sales in {:?}", generated, elapsed);

    let summary = moinho_core::aggregation::summarize(&db.sales().list(&owner.id).await?)?;
    println!();
    println!("Totals");
    println!("  Sales:      {}", summary.count);
    println!("  Value:      {}", summary.total_value);
    println!("  Commission: {}", summary.total_commission);

    println!();
    println!("✓ Seed complete! Sign in as {} / {}", DEMO_EMAIL, DEMO_PASSWORD);

    Ok(())
}

//! # Seed Data Generator
//!
//! Populates the database with a small Brazilian grocery catalogue and a
//! demo customer for local development.
//!
//! ## Usage
//! ```bash
//! cargo run -p mercadinho-db --bin seed
//! cargo run -p mercadinho-db --bin seed -- --db ./data/mercadinho.db
//! ```

use std::env;

use chrono::Utc;
use mercadinho_core::{Category, Customer, Product};
use mercadinho_db::{Database, DbConfig};
use uuid::Uuid;

/// `(category, [(name, price_cents, cost_cents)])`
const CATALOGUE: &[(&str, &[(&str, i64, i64)])] = &[
    (
        "Bebidas",
        &[
            ("Coca-Cola Lata 350ml", 450, 290),
            ("Guaraná Antarctica 2L", 890, 560),
            ("Água Mineral 500ml", 250, 90),
            ("Suco de Laranja 1L", 790, 480),
            ("Cerveja Pilsen Lata", 399, 250),
        ],
    ),
    (
        "Mercearia",
        &[
            ("Arroz Tipo 1 5kg", 2590, 1890),
            ("Feijão Carioca 1kg", 849, 590),
            ("Café Torrado 500g", 1690, 1150),
            ("Açúcar Refinado 1kg", 489, 320),
            ("Macarrão Espaguete 500g", 469, 280),
        ],
    ),
    (
        "Padaria",
        &[
            ("Pão Francês (un)", 90, 35),
            ("Pão de Queijo 400g", 1290, 740),
            ("Bolo de Fubá", 1500, 600),
        ],
    ),
    (
        "Laticínios",
        &[
            ("Leite Integral 1L", 549, 390),
            ("Queijo Mussarela 200g", 1190, 780),
            ("Manteiga 200g", 1290, 890),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./mercadinho_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mercadinho Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./mercadinho_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Mercadinho Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut generated = 0;
    for (seed, (category_name, products)) in CATALOGUE.iter().enumerate() {
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: category_name.to_string(),
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(db.pool())
            .await?;

        for (index, (name, price_cents, cost_cents)) in products.iter().enumerate() {
            let product = generate_product(&category, name, *price_cents, *cost_cents, seed * 100 + index);
            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.name, e);
                continue;
            }
            generated += 1;
        }
    }
    println!("✓ Generated {} products", generated);

    let demo = Customer {
        id: Uuid::new_v4().to_string(),
        name: "Cliente Fiel".to_string(),
        phone: Some("11999990000".to_string()),
        email: Some("cliente@mercadinho.local".to_string()),
        discount_bps: 500,
        created_at: Utc::now(),
    };
    db.customers().insert(&demo).await?;
    println!("✓ Demo customer: phone 11999990000 (5% discount)");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn generate_product(
    category: &Category,
    name: &str,
    price_cents: i64,
    cost_cents: i64,
    seed: usize,
) -> Product {
    let now = Utc::now();

    Product {
        id: Uuid::new_v4().to_string(),
        category_id: Some(category.id.clone()),
        name: name.to_string(),
        // EAN-13 shaped, checksum not valid
        barcode: Some(format!("789{:010}", seed)),
        image_url: None,
        price_cents,
        cost_cents,
        stock: 20 + (seed % 40) as i64,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

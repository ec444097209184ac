use aquaglow_bookings::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

struct SeedService {
    name: &'static str,
    description: &'static str,
    base_price: Decimal,
    duration: i32,
    category: &'static str,
    features: &'static [&'static str],
}

const VEHICLE_TYPES: [&str; 6] = ["SEDAN", "COUPE", "HATCHBACK", "SUV", "TRUCK", "LUXURY"];

fn catalog() -> Vec<SeedService> {
    vec![
        SeedService {
            name: "Express Wash",
            description: "Exterior hand wash, wheel clean and towel dry",
            base_price: dec!(250.00),
            duration: 45,
            category: "basic",
            features: &["Hand wash", "Wheel clean", "Towel dry"],
        },
        SeedService {
            name: "Deluxe Detail",
            description: "Wash, clay bar, interior vacuum and dashboard treatment",
            base_price: dec!(650.00),
            duration: 120,
            category: "deluxe",
            features: &["Clay bar", "Interior vacuum", "Dashboard treatment"],
        },
        SeedService {
            name: "Full Detail",
            description: "Complete interior and exterior restoration with paint protection",
            base_price: dec!(1200.00),
            duration: 180,
            category: "premium",
            features: &[
                "Paint decontamination",
                "Machine polish",
                "Leather conditioning",
                "Paint sealant",
            ],
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let database_url = config
        .database_url
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set to seed the catalog"))?;

    let pool = create_pool(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    seed_services(&pool).await?;
    Ok(())
}

async fn seed_services(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let vehicle_types: Vec<String> = VEHICLE_TYPES.iter().map(|v| v.to_string()).collect();

    for service in catalog() {
        let features: Vec<String> = service.features.iter().map(|f| f.to_string()).collect();
        let inserted = sqlx::query(
            r#"
            INSERT INTO services (id, name, description, base_price, duration, vehicle_types, category, features, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(service.name)
        .bind(service.description)
        .bind(service.base_price)
        .bind(service.duration)
        .bind(&vehicle_types)
        .bind(service.category)
        .bind(&features)
        .execute(pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            println!("Seeded service {} ({})", service.name, service.base_price);
        } else {
            println!("Service {} already present", service.name);
        }
    }

    Ok(())
}

use chrono::{TimeDelta, Utc};
use order_notify_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    middleware::auth::issue_token,
    models::Role,
    repository::{NewOrder, NewOrderItem, OrderStore, OrmStore},
};
use uuid::Uuid;

const CUSTOMERS: [&str; 3] = [
    "alice@example.com",
    "bob@example.com",
    "carol@example.com",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = orm.get_postgres_connection_pool();

    let admin_id = ensure_user(pool, "admin@example.com", Role::Admin).await?;
    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for email in CUSTOMERS {
        customer_ids.push(ensure_user(pool, email, Role::User).await?);
    }

    let store = OrmStore::new(orm.clone());
    seed_orders(&store, &customer_ids).await?;

    let ttl = TimeDelta::days(7);
    println!("Seed completed.");
    println!(
        "Admin {admin_id} token: {}",
        issue_token(admin_id, Role::Admin, &config.jwt_secret, ttl)?
    );
    for (email, id) in CUSTOMERS.iter().zip(&customer_ids) {
        println!(
            "User {email} ({id}) token: {}",
            issue_token(*id, Role::User, &config.jwt_secret, ttl)?
        );
    }
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, role: Role) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={})", role.as_str());
    Ok(id)
}

// Backdated so the auto-updater has something to advance on the first run.
async fn seed_orders(store: &OrmStore, customers: &[Uuid]) -> anyhow::Result<()> {
    let now = Utc::now();
    for (n, user_id) in customers.iter().enumerate() {
        let age = TimeDelta::hours(12 + 24 * n as i64);
        let items = vec![
            NewOrderItem {
                product_id: Uuid::new_v4(),
                product_name: "Mechanical Keyboard".into(),
                quantity: 1,
                price: 89_000,
            },
            NewOrderItem {
                product_id: Uuid::new_v4(),
                product_name: "USB-C Cable".into(),
                quantity: 2,
                price: 9_500,
            },
        ];
        let total_amount = items.iter().map(|i| i.price * i64::from(i.quantity)).sum();

        let order = store
            .create(NewOrder {
                user_id: *user_id,
                total_amount,
                items,
                created_at: now - age,
            })
            .await?;
        println!(
            "Seeded order {} for {user_id} ({}h old)",
            order.order.id,
            age.num_hours()
        );
    }
    Ok(())
}

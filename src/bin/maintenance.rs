use std::env;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use diesel::prelude::*;
use tracing_subscriber::EnvFilter;

use fluxo::{
    config::AppConfig,
    db,
    models::{ROLE_ADMIN, ROLE_USER},
    schema::users,
};

const USAGE: &str = "Usage: maintenance <promote|demote> <email>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    let role = match args.next().as_deref() {
        Some("promote") => ROLE_ADMIN,
        Some("demote") => ROLE_USER,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };
    let Some(email) = args.next() else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    set_role(&email, role)
}

fn set_role(email: &str, role: &str) -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let email = email.trim().to_lowercase();
    let updated = diesel::update(users::table.filter(users::email.eq(&email)))
        .set((
            users::role.eq(role),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .context("failed to update user role")?;

    if updated == 0 {
        bail!("no user registered with email {email}");
    }

    tracing::info!(email = %email, role, "user role updated");
    println!("{email} is now {role}.");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

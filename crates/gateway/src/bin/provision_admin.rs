//! One-time admin provisioning
//!
//! The system must always have at least one reachable admin account; this
//! command creates it explicitly instead of hiding the bootstrap inside
//! process start. Idempotent: re-running with an existing admin email is a
//! no-op success.
//!
//! Usage: provision-admin <email> <password> [name]

use learntrack_common::{config::AppConfig, db::DbPool, services::accounts};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (email, password, name) = match args.as_slice() {
        [_, email, password] => (email.clone(), password.clone(), "Admin".to_string()),
        [_, email, password, name] => (email.clone(), password.clone(), name.clone()),
        _ => {
            eprintln!("Usage: provision-admin <email> <password> [name]");
            std::process::exit(2);
        }
    };

    let config = AppConfig::load()?;
    let db = DbPool::new(&config.database).await?;

    let admin = accounts::provision_admin(&db, &name, &email, &password).await?;

    info!(user_id = %admin.id, email = %admin.email, "Admin account ready");
    Ok(())
}

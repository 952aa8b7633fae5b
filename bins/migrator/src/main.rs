//! Database migration runner for Expensa.
//!
//! Usage:
//!   migrator up      - Create the expense and report tables
//!   migrator down    - Drop them again
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop everything and re-run migrations
//!
//! Reads `DATABASE_URL` from the environment or a `.env` file.

use expensa_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI sets up its own tracing.
    cli::run_cli(Migrator).await;
}

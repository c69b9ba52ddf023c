//! Kitchen Inventory - Household Perishables Tracker
//!
//! Serves the inventory REST API over a local SQLite database.

use clap::Parser;
use kitchen_inventory::image_store::ImageStore;
use kitchen_inventory::openfoodfacts::LookupClient;
use kitchen_inventory::web::{self, AppState};
use kitchen_inventory::Database;
use std::path::PathBuf;
use std::sync::Arc;

/// Kitchen inventory server - tracks perishables and shopping in SQLite
#[derive(Parser, Debug)]
#[command(name = "kitchen_inventory")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Port for the HTTP API
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Directory for uploaded product images
    /// (default: an `uploads` directory next to the database file)
    #[arg(long)]
    uploads_dir: Option<PathBuf>,
}

/// Returns the default database path: ~/.local/share/kitchen_inventory/inventory.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kitchen_inventory")
        .join("inventory.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting kitchen_inventory...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let db = Database::new(&db_path);
    if let Err(e) = db.initialize() {
        log::error!("Failed to initialize database schema: {}", e);
        std::process::exit(1);
    }

    // Keep uploaded images next to the database unless told otherwise
    let uploads_dir = args.uploads_dir.unwrap_or_else(|| {
        db_path
            .parent()
            .map(|p| p.join("uploads"))
            .unwrap_or_else(|| PathBuf::from("uploads"))
    });

    let state = AppState {
        db,
        images: Arc::new(ImageStore::new(uploads_dir)),
        lookup: Arc::new(LookupClient::new()),
    };

    if let Err(e) = web::serve(state, args.port).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}

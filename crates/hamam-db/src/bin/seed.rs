//! # Seed Data Generator
//!
//! Provisions rooms for development and first install.
//!
//! ## Usage
//! ```bash
//! # Provision the default 8 rooms
//! cargo run -p hamam-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p hamam-db --bin seed -- --rooms 12 --db ./data/hamam.db
//! ```
//!
//! Running it twice is safe: rooms whose name already exists are skipped.

use chrono::Utc;
use hamam_core::validation::validate_room_name;
use hamam_core::{Room, RoomStatus};
use hamam_db::{Database, DbConfig};
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Room kinds found in a typical hamam, cycled when generating names.
const ROOM_KINDS: &[&str] = &["Kurna", "Sauna", "Massage Room", "Private Hamam"];

const DEFAULT_ROOMS: usize = 8;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut rooms: usize = DEFAULT_ROOMS;
    let mut db_path = String::from("./hamam_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rooms" | "-r" => {
                if i + 1 < args.len() {
                    rooms = args[i + 1].parse().unwrap_or(DEFAULT_ROOMS);
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
                println!("Hamam POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -r, --rooms <N>    Number of rooms to provision (default: {})", DEFAULT_ROOMS);
                println!("  -d, --db <PATH>    Database file path (default: ./hamam_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Hamam POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Rooms:    {}", rooms);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let repo = db.rooms();

    let mut created = 0;
    let mut skipped = 0;

    for name in room_names(rooms) {
        let name = validate_room_name(&name)?;

        if repo.get_by_name(&name).await?.is_some() {
            skipped += 1;
            continue;
        }

        let room = Room {
            id: Uuid::new_v4().to_string(),
            name,
            status: RoomStatus::Available,
            version: 1,
            updated_at: Utc::now(),
        };
        repo.insert(&room).await?;
        println!("  + {}", room.name);
        created += 1;
    }

    println!();
    println!("✓ Created {} rooms, skipped {} existing", created, skipped);
    println!("  Total rooms: {}", repo.count().await?);

    Ok(())
}

/// Generates `count` names: "Kurna 1", "Sauna 1", ..., "Kurna 2", ...
fn room_names(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let kind = ROOM_KINDS[i % ROOM_KINDS.len()];
            format!("{} {}", kind, i / ROOM_KINDS.len() + 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_names() {
        let names = room_names(6);
        assert_eq!(names[0], "Kurna 1");
        assert_eq!(names[3], "Private Hamam 1");
        assert_eq!(names[4], "Kurna 2");
        assert_eq!(names.len(), 6);
    }
}

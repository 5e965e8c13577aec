pub mod models;
pub mod store;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::db::models::ExampleSeed;
use crate::state::DbPool;

pub use store::{BotStore, SqliteBotStore, StoreError};

pub const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../../migrations/001_initial.sql"),
)];

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path);
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// Replace both example tables with the seed contents in one transaction.
/// Returns `(questions, phrase_parts)` row counts.
pub fn import_examples(pool: &DbPool, seed: &ExampleSeed) -> anyhow::Result<(usize, usize)> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM question_examples", [])?;
    tx.execute("DELETE FROM phrase_parts", [])?;

    let mut questions = 0;
    for (position, question) in seed.questions.iter().enumerate() {
        tx.execute(
            "INSERT INTO question_examples (position, label, text) VALUES (?1, ?2, ?3)",
            params![position as i64, question.label, question.text],
        )?;
        questions += 1;
    }

    let mut parts = 0;
    for (category, values) in &seed.categories {
        for value in values {
            tx.execute(
                "INSERT INTO phrase_parts (category, value) VALUES (?1, ?2)",
                params![category, value],
            )?;
            parts += 1;
        }
    }

    tx.commit()?;
    tracing::info!(
        "Imported {} question examples and {} phrase parts",
        questions,
        parts
    );
    Ok((questions, parts))
}

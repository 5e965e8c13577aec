// Storage boundary for interaction history, example tables and diagnostics
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use thiserror::Error;

use crate::domain::{
    ExampleTable, ExampleTableKind, InteractionRecord, PhraseCategory, QuestionExample, UserId,
};
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },
}

#[async_trait]
pub trait BotStore: Send + Sync {
    /// Append one completed generation. Records are never updated.
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), StoreError>;

    /// Every record for `user_id` with `created_at >= since`.
    async fn query_interactions_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<InteractionRecord>, StoreError>;

    async fn read_example_table(&self, kind: ExampleTableKind)
        -> Result<ExampleTable, StoreError>;

    async fn append_log(&self, body: &str) -> Result<(), StoreError>;

    async fn append_error_log(&self, body: &str) -> Result<(), StoreError>;
}

/// Fixed-width UTC so that text comparison in SQL orders like time.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| StoreError::Timestamp { value, source })
}

pub struct SqliteBotStore {
    pool: DbPool,
}

impl SqliteBotStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_curated(&self) -> Result<Vec<QuestionExample>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT label, text FROM question_examples ORDER BY position, id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(QuestionExample {
                    label: row.get(0)?,
                    text: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn read_categories(&self) -> Result<Vec<PhraseCategory>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT category, value FROM phrase_parts
             WHERE trim(value) != ''
             ORDER BY category, id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut categories: Vec<PhraseCategory> = Vec::new();
        for (name, value) in rows {
            match categories.last_mut() {
                Some(last) if last.name == name => last.values.push(value),
                _ => categories.push(PhraseCategory {
                    name,
                    values: vec![value],
                }),
            }
        }
        Ok(categories)
    }
}

#[async_trait]
impl BotStore for SqliteBotStore {
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO interactions (user_id, original_text, translated_text, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.user_id.as_str(),
                record.original_text,
                record.translated_text,
                record.image_url,
                format_timestamp(record.created_at),
            ],
        )?;
        Ok(())
    }

    async fn query_interactions_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, original_text, translated_text, image_url, created_at
             FROM interactions
             WHERE user_id = ?1 AND created_at >= ?2
             ORDER BY created_at",
        )?;

        let rows = stmt
            .query_map(params![user_id.as_str(), format_timestamp(since)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (user, original_text, translated_text, image_url, created_at) in rows {
            records.push(InteractionRecord {
                user_id: UserId::new(user),
                original_text,
                translated_text,
                image_url,
                created_at: parse_timestamp(created_at)?,
            });
        }
        Ok(records)
    }

    async fn read_example_table(
        &self,
        kind: ExampleTableKind,
    ) -> Result<ExampleTable, StoreError> {
        match kind {
            ExampleTableKind::Curated => Ok(ExampleTable::Curated(self.read_curated()?)),
            ExampleTableKind::Categorized => {
                Ok(ExampleTable::Categorized(self.read_categories()?))
            }
        }
    }

    async fn append_log(&self, body: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute("INSERT INTO logs (body) VALUES (?1)", params![body])?;
        Ok(())
    }

    async fn append_error_log(&self, body: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute("INSERT INTO error_logs (body) VALUES (?1)", params![body])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteBotStore, DbPool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = db::create_pool(&db_path).unwrap();
        db::run_migrations(&pool).unwrap();

        (SqliteBotStore::new(pool.clone()), pool, temp_dir)
    }

    fn record(user: &str, at: DateTime<Utc>) -> InteractionRecord {
        InteractionRecord {
            user_id: UserId::new(user),
            original_text: "海辺で走る猫".to_string(),
            translated_text: Some("A cat running on the beach".to_string()),
            image_url: "https://example.com/cat.png".to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_append_and_query_roundtrip() {
        let (store, _pool, _temp) = create_test_store();
        let now = Utc::now();
        let rec = record("U1", now);

        store.append_interaction(&rec).await.unwrap();

        let found = store
            .query_interactions_since(&UserId::new("U1"), now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].original_text, rec.original_text);
        assert_eq!(found[0].translated_text, rec.translated_text);
        assert_eq!(found[0].image_url, rec.image_url);
        assert_eq!(
            format_timestamp(found[0].created_at),
            format_timestamp(rec.created_at)
        );
    }

    #[tokio::test]
    async fn test_query_filters_by_user_and_time() {
        let (store, _pool, _temp) = create_test_store();
        let now = Utc::now();

        store.append_interaction(&record("U1", now)).await.unwrap();
        store
            .append_interaction(&record("U1", now - Duration::hours(30)))
            .await
            .unwrap();
        store.append_interaction(&record("U2", now)).await.unwrap();

        let found = store
            .query_interactions_since(&UserId::new("U1"), now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.iter().all(|r| r.user_id.as_str() == "U1"));
    }

    #[tokio::test]
    async fn test_query_includes_exact_boundary() {
        let (store, _pool, _temp) = create_test_store();
        let since = Utc::now() - Duration::hours(24);

        store.append_interaction(&record("U1", since)).await.unwrap();

        let found = store
            .query_interactions_since(&UserId::new("U1"), since)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_translation_is_stored_as_null() {
        let (store, _pool, _temp) = create_test_store();
        let now = Utc::now();
        let mut rec = record("U1", now);
        rec.translated_text = None;

        store.append_interaction(&rec).await.unwrap();
        let found = store
            .query_interactions_since(&UserId::new("U1"), now - Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(found[0].translated_text, None);
    }

    #[tokio::test]
    async fn test_read_categories_groups_and_skips_blank_values() {
        let (store, pool, _temp) = create_test_store();
        {
            let conn = pool.get().unwrap();
            for (category, value) in [
                ("場所", "海辺"),
                ("名詞", "猫"),
                ("場所", ""),
                ("場所", "森の中"),
            ] {
                conn.execute(
                    "INSERT INTO phrase_parts (category, value) VALUES (?1, ?2)",
                    params![category, value],
                )
                .unwrap();
            }
        }

        let table = store
            .read_example_table(ExampleTableKind::Categorized)
            .await
            .unwrap();
        let places = table.category("場所").unwrap();
        assert_eq!(places.values, vec!["海辺".to_string(), "森の中".to_string()]);
        assert_eq!(table.category("名詞").unwrap().values.len(), 1);
    }

    #[tokio::test]
    async fn test_read_curated_in_position_order() {
        let (store, pool, _temp) = create_test_store();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO question_examples (position, label, text) VALUES (1, 'b', 'second')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO question_examples (position, label, text) VALUES (0, 'a', 'first')",
                [],
            )
            .unwrap();
        }

        let table = store
            .read_example_table(ExampleTableKind::Curated)
            .await
            .unwrap();
        assert_eq!(
            table,
            ExampleTable::Curated(vec![
                QuestionExample::new("a", "first"),
                QuestionExample::new("b", "second"),
            ])
        );
    }

    #[tokio::test]
    async fn test_logs_are_appended() {
        let (store, pool, _temp) = create_test_store();

        store.append_log("webhook received").await.unwrap();
        store.append_log("second").await.unwrap();
        store.append_error_log("boom").await.unwrap();

        let conn = pool.get().unwrap();
        let logs: i64 = conn
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))
            .unwrap();
        let errors: String = conn
            .query_row("SELECT body FROM error_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(logs, 2);
        assert_eq!(errors, "boom");
    }
}

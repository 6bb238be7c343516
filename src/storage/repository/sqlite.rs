// SQLite 数据库实现

use super::{CategoryRepository, RecordRepository, TrackerBackend, TrackerRepository};
use crate::models::{CompletionRecord, Tracker};
use crate::storage::config::{DatabaseConfig, StorageConfig};
use crate::storage::error::StoreResult;
use crate::storage::models::{RecordRow, TrackerRow};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

/// SQLite 数据库实现
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// 创建新的 SQLite 数据库连接
    pub async fn new(config: &StorageConfig) -> StoreResult<Self> {
        let DatabaseConfig::SQLite { db_path } = &config.database;
        info!("初始化 SQLite 数据库: {}", db_path);

        // 确保数据库文件的目录存在
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        // 创建连接池
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .idle_timeout(std::time::Duration::from_secs(300))
            .max_lifetime(std::time::Duration::from_secs(1800))
            .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs))
            .connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await?;

        let repo = Self { pool };

        // 初始化表结构
        repo.initialize_tables().await?;

        Ok(repo)
    }

    /// 初始化数据库表
    async fn initialize_tables(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                title TEXT PRIMARY KEY NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trackers (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                task_type TEXT NOT NULL,
                color TEXT NOT NULL,
                emoji TEXT NOT NULL,
                schedule TEXT NOT NULL,
                created_on TEXT NOT NULL,
                category_title TEXT NOT NULL,
                FOREIGN KEY (category_title) REFERENCES categories(title)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 完成记录没有唯一约束，重复由 stores 层的串行写入保证
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS completion_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracker_id TEXT NOT NULL,
                due_date TEXT NOT NULL,
                FOREIGN KEY (tracker_id) REFERENCES trackers(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trackers_category ON trackers(category_title)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_tracker_date ON completion_records(tracker_id, due_date)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_due_date ON completion_records(due_date)")
            .execute(&self.pool)
            .await?;

        info!("数据库表初始化完成");
        Ok(())
    }

    /// 获取连接池引用
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const TRACKER_COLUMNS: &str =
    "id, name, task_type, color, emoji, schedule, created_on, category_title";

fn into_tracker_pair(row: TrackerRow) -> StoreResult<(Tracker, String)> {
    let category_title = row.category_title.clone();
    Ok((Tracker::try_from(row)?, category_title))
}

#[async_trait]
impl CategoryRepository for SqliteRepository {
    async fn fetch_category_titles(&self) -> StoreResult<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>("SELECT title FROM categories ORDER BY title")
            .fetch_all(&self.pool)
            .await?;

        Ok(titles)
    }

    async fn category_exists(&self, title: &str) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories WHERE title = ?")
            .bind(title)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn insert_category(&self, title: &str) -> StoreResult<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO categories (title) VALUES (?)")
            .bind(title)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_categories(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl TrackerRepository for SqliteRepository {
    async fn fetch_trackers(&self) -> StoreResult<Vec<(Tracker, String)>> {
        let rows = sqlx::query_as::<_, TrackerRow>(&format!(
            "SELECT {TRACKER_COLUMNS} FROM trackers ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_tracker_pair).collect()
    }

    async fn find_tracker(&self, id: Uuid) -> StoreResult<Option<(Tracker, String)>> {
        let row = sqlx::query_as::<_, TrackerRow>(&format!(
            "SELECT {TRACKER_COLUMNS} FROM trackers WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_tracker_pair).transpose()
    }

    async fn upsert_tracker(&self, tracker: &Tracker, category_title: &str) -> StoreResult<bool> {
        let row = TrackerRow::from_tracker(tracker, category_title)?;
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trackers WHERE id = ?")
            .bind(&row.id)
            .fetch_one(&mut *tx)
            .await?;

        if existing > 0 {
            sqlx::query(
                r#"
                UPDATE trackers
                SET name = ?, task_type = ?, color = ?, emoji = ?,
                    schedule = ?, created_on = ?, category_title = ?
                WHERE id = ?
            "#,
            )
            .bind(&row.name)
            .bind(&row.task_type)
            .bind(&row.color)
            .bind(&row.emoji)
            .bind(&row.schedule)
            .bind(row.created_on)
            .bind(&row.category_title)
            .bind(&row.id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO trackers (id, name, task_type, color, emoji, schedule, created_on, category_title)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            )
            .bind(&row.id)
            .bind(&row.name)
            .bind(&row.task_type)
            .bind(&row.color)
            .bind(&row.emoji)
            .bind(&row.schedule)
            .bind(row.created_on)
            .bind(&row.category_title)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(existing == 0)
    }

    async fn delete_tracker(&self, id: Uuid) -> StoreResult<bool> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await?;

        let records = sqlx::query("DELETE FROM completion_records WHERE tracker_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM trackers WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            "删除追踪器 {}: 追踪器 {} 条, 完成记录 {} 条",
            id,
            result.rows_affected(),
            records.rows_affected()
        );
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecordRepository for SqliteRepository {
    async fn fetch_records(&self) -> StoreResult<Vec<CompletionRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT tracker_id, due_date FROM completion_records ORDER BY due_date, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CompletionRecord::try_from).collect()
    }

    async fn fetch_records_for_tracker(
        &self,
        tracker_id: Uuid,
    ) -> StoreResult<Vec<CompletionRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT tracker_id, due_date
            FROM completion_records
            WHERE tracker_id = ?
            ORDER BY due_date, id
            "#,
        )
        .bind(tracker_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CompletionRecord::try_from).collect()
    }

    async fn fetch_records_on(&self, date: NaiveDate) -> StoreResult<Vec<CompletionRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT tracker_id, due_date FROM completion_records WHERE due_date = ? ORDER BY id",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CompletionRecord::try_from).collect()
    }

    async fn record_exists(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM completion_records WHERE tracker_id = ? AND due_date = ?",
        )
        .bind(tracker_id.to_string())
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn insert_record(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<()> {
        sqlx::query("INSERT INTO completion_records (tracker_id, due_date) VALUES (?, ?)")
            .bind(tracker_id.to_string())
            .bind(date)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_record(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<u64> {
        let result =
            sqlx::query("DELETE FROM completion_records WHERE tracker_id = ? AND due_date = ?")
                .bind(tracker_id.to_string())
                .bind(date)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn count_records_for_tracker(&self, tracker_id: Uuid) -> StoreResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM completion_records WHERE tracker_id = ?")
                .bind(tracker_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

impl TrackerBackend for SqliteRepository {
    fn db_type(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskType, Weekday};
    use tempfile::tempdir;

    async fn open_repo(dir: &tempfile::TempDir) -> SqliteRepository {
        let path = dir.path().join("tracker.db");
        SqliteRepository::new(&StorageConfig::sqlite(path.to_string_lossy()))
            .await
            .unwrap()
    }

    fn tracker(name: &str) -> Tracker {
        Tracker {
            id: Uuid::new_v4(),
            name: name.to_string(),
            task_type: TaskType::Habit,
            color: "#007BFA".to_string(),
            emoji: "🎸".to_string(),
            schedule: [Weekday::Monday].into_iter().collect(),
            created_on: NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_repository_creation() {
        let temp_dir = tempdir().unwrap();
        let repo = open_repo(&temp_dir).await;
        assert_eq!(repo.db_type(), "sqlite");
        assert_eq!(repo.count_categories().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_category_ignores_duplicates() {
        let temp_dir = tempdir().unwrap();
        let repo = open_repo(&temp_dir).await;

        assert!(repo.insert_category("Спорт").await.unwrap());
        assert!(!repo.insert_category("Спорт").await.unwrap());
        assert!(repo.insert_category("спорт").await.unwrap());
        assert_eq!(
            repo.fetch_category_titles().await.unwrap(),
            vec!["Спорт".to_string(), "спорт".to_string()]
        );
    }

    #[tokio::test]
    async fn test_upsert_then_delete_cascades_records() {
        let temp_dir = tempdir().unwrap();
        let repo = open_repo(&temp_dir).await;
        repo.insert_category("Здоровье").await.unwrap();

        let mut t = tracker("Бег");
        assert!(repo.upsert_tracker(&t, "Здоровье").await.unwrap());

        t.name = "Бег по утрам".to_string();
        assert!(!repo.upsert_tracker(&t, "Здоровье").await.unwrap());

        let (found, category) = repo.find_tracker(t.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Бег по утрам");
        assert_eq!(category, "Здоровье");

        let day = NaiveDate::from_ymd_opt(2024, 11, 4).unwrap();
        repo.insert_record(t.id, day).await.unwrap();
        assert!(repo.record_exists(t.id, day).await.unwrap());

        assert!(repo.delete_tracker(t.id).await.unwrap());
        assert!(repo.find_tracker(t.id).await.unwrap().is_none());
        assert!(repo.fetch_records().await.unwrap().is_empty());
        assert!(!repo.delete_tracker(t.id).await.unwrap());
    }
}

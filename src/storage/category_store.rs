// 分类存储 - 分类表的查询与按标题的获取或创建

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info};

use super::database::Database;
use super::error::{StoreError, StoreResult};
use crate::models::{Tracker, TrackerCategory};

/// 分类存储
#[derive(Clone)]
pub struct CategoryStore {
    db: Arc<Database>,
}

impl CategoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 全部分类（按标题排序），每个分类带有其追踪器（按名称排序）
    pub async fn fetch_all(&self) -> StoreResult<Vec<TrackerCategory>> {
        let _guard = self.db.read().await;
        self.load_categories()
            .await
            .inspect_err(|e| error!("读取分类失败: {}", e))
    }

    /// 按标题获取分类，不存在时创建
    pub async fn get_or_create(&self, title: &str) -> StoreResult<TrackerCategory> {
        let guard = self.db.write().await;

        let created = self
            .db
            .ensure_category_locked(&guard, title)
            .await
            .inspect_err(|e| error!("获取或创建分类 {} 失败: {}", title, e))?;
        if created {
            info!("已创建分类: {}", title);
        }

        let tasks = self.trackers_in(title).await?;
        Ok(TrackerCategory::new(title, tasks))
    }

    /// 按标题获取分类
    pub async fn get(&self, title: &str) -> StoreResult<TrackerCategory> {
        let _guard = self.db.read().await;

        if !self.db.backend().category_exists(title).await? {
            return Err(StoreError::not_found("category", title));
        }
        let tasks = self.trackers_in(title).await?;
        Ok(TrackerCategory::new(title, tasks))
    }

    /// 分类数量
    pub async fn count(&self) -> StoreResult<usize> {
        let _guard = self.db.read().await;
        let count = self.db.backend().count_categories().await?;
        Ok(count.max(0) as usize)
    }

    /// 全部分类标题（按标题排序）
    pub async fn titles(&self) -> StoreResult<Vec<String>> {
        let _guard = self.db.read().await;
        self.db.backend().fetch_category_titles().await
    }

    async fn trackers_in(&self, title: &str) -> StoreResult<Vec<Tracker>> {
        let trackers = self.db.backend().fetch_trackers().await?;
        Ok(trackers
            .into_iter()
            .filter(|(_, category)| category == title)
            .map(|(tracker, _)| tracker)
            .collect())
    }

    async fn load_categories(&self) -> StoreResult<Vec<TrackerCategory>> {
        let backend = self.db.backend();
        let titles = backend.fetch_category_titles().await?;

        let mut grouped: BTreeMap<String, Vec<Tracker>> = titles
            .into_iter()
            .map(|title| (title, Vec::new()))
            .collect();

        // 追踪器已按名称排序，按分类分组后顺序保持不变
        for (tracker, category) in backend.fetch_trackers().await? {
            grouped.entry(category).or_default().push(tracker);
        }

        Ok(grouped
            .into_iter()
            .map(|(title, tasks)| TrackerCategory::new(title, tasks))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::{EventBus, StoreEvent};
    use crate::storage::config::StorageConfig;
    use tempfile::tempdir;

    async fn open_store(dir: &tempfile::TempDir) -> (CategoryStore, Arc<EventBus>) {
        let events = Arc::new(EventBus::new(64));
        let config = StorageConfig::sqlite(dir.path().join("tracker.db").to_string_lossy());
        let db = Database::open(&config, events.clone()).await.unwrap();
        (CategoryStore::new(Arc::new(db)), events)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let (store, events) = open_store(&temp_dir).await;
        let mut receiver = events.subscribe();

        let first = store.get_or_create("Учёба").await.unwrap();
        let second = store.get_or_create("Учёба").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count().await.unwrap(), 1);

        // 只有第一次调用发布了事件
        assert_eq!(
            receiver.try_recv().unwrap(),
            StoreEvent::CategoryCreated {
                title: "Учёба".to_string()
            }
        );
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_creates_one_category() {
        let temp_dir = tempdir().unwrap();
        let (store, _events) = open_store(&temp_dir).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.get_or_create("Работа").await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.titles().await.unwrap(), vec!["Работа".to_string()]);
    }

    #[tokio::test]
    async fn test_get_missing_category_is_not_found() {
        let temp_dir = tempdir().unwrap();
        let (store, _events) = open_store(&temp_dir).await;

        let err = store.get("Нет такой").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_sorted_by_title() {
        let temp_dir = tempdir().unwrap();
        let (store, _events) = open_store(&temp_dir).await;

        store.get_or_create("b").await.unwrap();
        store.get_or_create("a").await.unwrap();
        store.get_or_create("c").await.unwrap();

        let titles: Vec<_> = store
            .fetch_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }
}

//! 应用上下文的组装
//!
//! 负责按数据目录完成启动流程：
//! - 读取设置
//! - 打开数据库和置顶注册表
//! - 创建各领域管理器
//! - 启动统计刷新循环

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::info;

use crate::analytics::{AnalyticsSink, TracingAnalytics};
use crate::clock::{Clock, SystemClock};
use crate::domains::{CreateTaskDomain, StatisticsDomain, TaskListDomain};
use crate::event_bus::EventBus;
use crate::models::TaskType;
use crate::pins::PinRegistry;
use crate::settings::SettingsManager;
use crate::storage::{
    CategoryStore, Database, DatabaseConfig, RecordStore, StorageConfig, TrackerStore,
};

const SETTINGS_FILE: &str = "settings.json";
const PINS_FILE: &str = "pins.json";

/// 应用上下文
///
/// 所有存储与领域管理器共享同一个数据库和事件总线，由调用方持有并传递
pub struct TrackerContext {
    pub settings: Arc<SettingsManager>,
    pub event_bus: Arc<EventBus>,
    pub database: Arc<Database>,
    pub categories: CategoryStore,
    pub trackers: TrackerStore,
    pub records: RecordStore,
    pub pins: Arc<PinRegistry>,
    pub task_list: Arc<TaskListDomain>,
    pub statistics: Arc<StatisticsDomain>,
    pub clock: Arc<dyn Clock>,
    pub analytics: Arc<dyn AnalyticsSink>,
    refresh_handle: JoinHandle<()>,
}

impl TrackerContext {
    /// 使用系统时钟和日志上报打开数据目录
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(data_dir, Arc::new(SystemClock), Arc::new(TracingAnalytics)).await
    }

    /// 打开数据目录，时钟和上报实现由调用方提供
    pub async fn open_with(
        data_dir: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        info!("初始化习惯追踪器，数据目录: {:?}", data_dir);

        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("无法创建数据目录 {:?}", data_dir))?;

        let settings = Arc::new(SettingsManager::new(data_dir.join(SETTINGS_FILE)).await?);
        let config = settings.get().await;

        let event_bus = Arc::new(EventBus::new(config.event_bus_capacity.max(1)));
        let storage = resolve_storage(&config.storage, data_dir);
        let database = Arc::new(
            Database::open(&storage, event_bus.clone())
                .await
                .context("数据库初始化失败")?,
        );

        let categories = CategoryStore::new(database.clone());
        let trackers = TrackerStore::new(database.clone());
        let records = RecordStore::new(database.clone());
        let pins = Arc::new(PinRegistry::open(data_dir.join(PINS_FILE), event_bus.clone()).await?);

        let task_list = Arc::new(TaskListDomain::new(
            categories.clone(),
            trackers.clone(),
            records.clone(),
            pins.clone(),
            analytics.clone(),
            clock.clone(),
            config.name_char_limit,
        ));

        let statistics = Arc::new(StatisticsDomain::new(
            trackers.clone(),
            records.clone(),
            event_bus.clone(),
        ));
        let refresh_handle = statistics.spawn_refresh_loop();

        info!("习惯追踪器初始化完成");

        Ok(Self {
            settings,
            event_bus,
            database,
            categories,
            trackers,
            records,
            pins,
            task_list,
            statistics,
            clock,
            analytics,
            refresh_handle,
        })
    }

    /// 新的创建任务表单
    pub fn create_task(&self, task_type: TaskType) -> CreateTaskDomain {
        self.task_list.create_task(task_type)
    }

    /// 停止后台刷新
    pub fn shutdown(&self) {
        self.refresh_handle.abort();
        info!("统计刷新已停止");
    }
}

impl Drop for TrackerContext {
    fn drop(&mut self) {
        self.refresh_handle.abort();
    }
}

/// 相对的数据库路径按数据目录解析
fn resolve_storage(storage: &StorageConfig, data_dir: &Path) -> StorageConfig {
    let mut resolved = storage.clone();
    let DatabaseConfig::SQLite { db_path } = &mut resolved.database;

    let path = PathBuf::from(db_path.as_str());
    if path.is_relative() {
        *db_path = data_dir.join(path).to_string_lossy().into_owned();
    }
    resolved
}

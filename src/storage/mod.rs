// 存储模块 - 统一的数据库抽象层

// 子模块
pub mod category_store;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod record_store;
pub mod repository;
pub mod tracker_store;

// 重新导出主要类型
pub use category_store::CategoryStore;
pub use config::{DatabaseConfig, StorageConfig};
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use record_store::RecordStore;
pub use repository::{CategoryRepository, RecordRepository, TrackerBackend, TrackerRepository};
pub use tracker_store::TrackerStore;

// 重新导出具体实现（可选，用于高级用法）
pub use repository::sqlite::SqliteRepository;

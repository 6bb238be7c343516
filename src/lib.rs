// 习惯追踪器 - 分类、追踪器、完成记录与统计的主库

// 声明模块
pub mod analytics;
pub mod app;
pub mod clock;
pub mod domains;
pub mod event_bus;
pub mod logger;
pub mod models;
pub mod pins;
pub mod schedule;
pub mod settings;
pub mod storage;

pub use app::TrackerContext;

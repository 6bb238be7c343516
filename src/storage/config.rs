// 存储配置定义

use serde::{Deserialize, Serialize};

/// 数据库配置类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DatabaseConfig {
    /// SQLite 配置
    #[serde(rename = "sqlite")]
    SQLite {
        /// 数据库文件路径
        db_path: String,
    },
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::SQLite {
            db_path: "data/tracker.db".to_string(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 连接池最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 获取连接超时（秒）
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            database: DatabaseConfig::default(),
        }
    }
}

impl StorageConfig {
    /// 指向给定 SQLite 文件的配置
    pub fn sqlite(db_path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::SQLite {
                db_path: db_path.into(),
            },
            ..Self::default()
        }
    }
}

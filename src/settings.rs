// 应用设置 - JSON 文件持久化，文件损坏时回退到默认值

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use crate::models::DEFAULT_NAME_CHAR_LIMIT;
use crate::storage::StorageConfig;

/// 持久化的应用设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub storage: StorageConfig,
    /// 追踪器名称字符上限，超出时给出警告
    #[serde(default = "default_name_char_limit")]
    pub name_char_limit: usize,
    /// 事件总线缓冲区大小
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
    /// 引导页是否已经展示过
    #[serde(default)]
    pub onboarding_was_shown: bool,
    /// 日志级别：trace / debug / info / warn / error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppSettings {
    /// 解析日志级别，无法识别时为 INFO
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

fn default_name_char_limit() -> usize {
    DEFAULT_NAME_CHAR_LIMIT
}

fn default_event_bus_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            name_char_limit: default_name_char_limit(),
            event_bus_capacity: default_event_bus_capacity(),
            onboarding_was_shown: false,
            log_level: default_log_level(),
        }
    }
}

/// 设置的部分更新，`None` 表示保持原值
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSettingsUpdate {
    pub storage: Option<StorageConfig>,
    pub name_char_limit: Option<usize>,
    pub event_bus_capacity: Option<usize>,
    pub onboarding_was_shown: Option<bool>,
    pub log_level: Option<String>,
}

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => serde_json::from_slice::<AppSettings>(&bytes)
                .unwrap_or_else(|e| {
                    warn!("设置文件解析失败，使用默认设置: {}", e);
                    AppSettings::default()
                }),
            _ => {
                let default = AppSettings::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub async fn get(&self) -> AppSettings {
        self.data.read().await.clone()
    }

    pub async fn update(&self, update: AppSettingsUpdate) -> Result<AppSettings> {
        let mut config = self.data.write().await;

        if let Some(storage) = update.storage {
            config.storage = storage;
        }
        if let Some(limit) = update.name_char_limit {
            config.name_char_limit = limit;
        }
        if let Some(capacity) = update.event_bus_capacity {
            config.event_bus_capacity = capacity;
        }
        if let Some(shown) = update.onboarding_was_shown {
            config.onboarding_was_shown = shown;
        }
        if let Some(level) = update.log_level {
            config.log_level = level;
        }

        self.save(&config).await?;
        Ok(config.clone())
    }

    pub async fn onboarding_was_shown(&self) -> bool {
        self.data.read().await.onboarding_was_shown
    }

    pub async fn mark_onboarding_shown(&self) -> Result<()> {
        self.update(AppSettingsUpdate {
            onboarding_was_shown: Some(true),
            ..Default::default()
        })
        .await?;
        Ok(())
    }

    async fn save(&self, config: &AppSettings) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

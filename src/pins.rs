// 置顶注册表 - 置顶的追踪器 ID 集合，独立于主数据库，保存在 JSON 文件中

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event_bus::{EventBus, StoreEvent};

/// 文件格式
#[derive(Debug, Default, Serialize, Deserialize)]
struct PinnedFile {
    #[serde(default)]
    pinned: BTreeSet<Uuid>,
}

pub struct PinRegistry {
    path: PathBuf,
    pinned: RwLock<HashSet<Uuid>>,
    events: Arc<EventBus>,
}

impl PinRegistry {
    /// 打开注册表；文件不存在或无法解析时从空集合开始
    pub async fn open(path: PathBuf, events: Arc<EventBus>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pinned = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => match serde_json::from_slice::<PinnedFile>(&bytes) {
                Ok(file) => file.pinned.into_iter().collect(),
                Err(e) => {
                    warn!("置顶文件解析失败，从空集合开始: {}", e);
                    HashSet::new()
                }
            },
            _ => HashSet::new(),
        };

        info!("已加载 {} 个置顶追踪器", pinned.len());
        Ok(Self {
            path,
            pinned: RwLock::new(pinned),
            events,
        })
    }

    /// 全部置顶 ID
    pub async fn load_all(&self) -> HashSet<Uuid> {
        self.pinned.read().await.clone()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.pinned.read().await.contains(&id)
    }

    /// 置顶；已置顶时返回 false
    pub async fn add(&self, id: Uuid) -> Result<bool> {
        let mut pinned = self.pinned.write().await;
        if !pinned.insert(id) {
            return Ok(false);
        }

        if let Err(e) = self.save(&pinned).await {
            pinned.remove(&id);
            return Err(e);
        }

        self.events
            .publish(StoreEvent::PinsChanged { tracker_id: id, pinned: true });
        Ok(true)
    }

    /// 取消置顶；未置顶时返回 false
    pub async fn remove(&self, id: Uuid) -> Result<bool> {
        let mut pinned = self.pinned.write().await;
        if !pinned.remove(&id) {
            return Ok(false);
        }

        if let Err(e) = self.save(&pinned).await {
            pinned.insert(id);
            return Err(e);
        }

        self.events
            .publish(StoreEvent::PinsChanged { tracker_id: id, pinned: false });
        Ok(true)
    }

    async fn save(&self, pinned: &HashSet<Uuid>) -> Result<()> {
        let file = PinnedFile {
            pinned: pinned.iter().copied().collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

// 事件总线 - 存储变更通知
//
// 实现发布/订阅模式，任意数量的订阅者互不覆盖
// 使用 tokio::sync::broadcast 实现高效的事件分发

use chrono::NaiveDate;
use tokio::sync::broadcast;
use uuid::Uuid;

/// 存储事件枚举 - 每次提交成功的写操作之后发布
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    // --- 分类事件 ---

    /// 新建了分类
    CategoryCreated { title: String },

    // --- 追踪器事件 ---

    /// 追踪器新建或被覆盖
    TrackerSaved {
        tracker_id: Uuid,
        category_title: String,
        created: bool,
    },

    /// 追踪器被删除（其完成记录一并删除）
    TrackerRemoved { tracker_id: Uuid },

    // --- 完成记录事件 ---

    /// 新增完成记录
    CompletionAdded { tracker_id: Uuid, date: NaiveDate },

    /// 删除完成记录
    CompletionRemoved { tracker_id: Uuid, date: NaiveDate },

    // --- 置顶事件 ---

    /// 置顶集合发生变化
    PinsChanged { tracker_id: Uuid, pinned: bool },
}

impl StoreEvent {
    /// 事件是否改变了完成记录集合（统计需要重新计算）
    pub fn affects_records(&self) -> bool {
        matches!(
            self,
            StoreEvent::CompletionAdded { .. }
                | StoreEvent::CompletionRemoved { .. }
                | StoreEvent::TrackerRemoved { .. }
                | StoreEvent::TrackerSaved { created: true, .. }
        )
    }
}

/// 事件总线
///
/// 使用 broadcast channel 实现发布/订阅模式
/// 支持多个订阅者同时接收事件，投递顺序与发布顺序一致
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小，订阅者落后超过该值时会收到 `Lagged`
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者，事件会被丢弃（这是正常的）
    pub fn publish(&self, event: StoreEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    /// 订阅事件
    ///
    /// 返回一个接收器，可以用 `.recv().await` 接收事件
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

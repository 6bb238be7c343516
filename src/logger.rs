// 日志系统 - 控制台加按天轮转的文件，另有一个可订阅的日志层供界面展示

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio::sync::broadcast;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// 日志消息
#[derive(Clone, Debug, serde::Serialize)]
pub struct LogMessage {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// 日志广播器 - 把日志转发给订阅者
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogMessage>,
    enabled: AtomicBool,
}

impl LogBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogMessage> {
        self.sender.subscribe()
    }

    /// 设置日志推送开关
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn emit(&self, log: LogMessage) {
        if !self.is_enabled() {
            return;
        }
        // 没有订阅者时发送失败，忽略
        let _ = self.sender.send(log);
    }
}

/// 转发到 `LogBroadcaster` 的日志层
pub struct BroadcastLayer {
    broadcaster: Arc<LogBroadcaster>,
}

impl BroadcastLayer {
    pub fn new(broadcaster: Arc<LogBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl<S: Subscriber> Layer<S> for BroadcastLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        struct MessageVisitor {
            message: String,
        }

        impl tracing::field::Visit for MessageVisitor {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = value.to_string();
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                }
            }
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        self.broadcaster.emit(LogMessage {
            timestamp: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.message,
        });
    }
}

/// 初始化全局日志：控制台和 `log_dir/tracker.log`（每天轮转），同时转发给广播器
pub fn init(log_dir: &Path, level: Level, broadcaster: Arc<LogBroadcaster>) -> Result<()> {
    use tracing_subscriber::fmt::time::LocalTime;
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("无法创建日志目录 {:?}", log_dir))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "tracker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // guard 需要活到进程结束
    std::mem::forget(guard);

    let writer = std::io::stdout.and(non_blocking);

    let timer = LocalTime::new(
        time::format_description::parse(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
        )
        .context("日志时间格式无效")?,
    );

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(writer)
        .with_timer(timer)
        .with_ansi(cfg!(debug_assertions))
        .finish()
        .with(BroadcastLayer::new(broadcaster));

    tracing::subscriber::set_global_default(subscriber).context("日志系统已初始化")?;

    eprintln!("日志文件位置: {:?}", log_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_forwards_messages() {
        let broadcaster = Arc::new(LogBroadcaster::new(16));
        let mut receiver = broadcaster.subscribe();
        let subscriber =
            tracing_subscriber::registry().with(BroadcastLayer::new(broadcaster.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "tracker", "已保存 {}", 3);
        });

        let log = receiver.try_recv().unwrap();
        assert_eq!(log.level, "INFO");
        assert_eq!(log.target, "tracker");
        assert_eq!(log.message, "已保存 3");
    }

    #[test]
    fn test_disabled_broadcaster_drops_messages() {
        let broadcaster = Arc::new(LogBroadcaster::new(16));
        broadcaster.set_enabled(false);
        let mut receiver = broadcaster.subscribe();
        let subscriber =
            tracing_subscriber::registry().with(BroadcastLayer::new(broadcaster.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("丢弃");
        });

        assert!(receiver.try_recv().is_err());
    }
}

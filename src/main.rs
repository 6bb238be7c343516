// 命令行入口 - 初始化日志，打开数据目录，输出今天的任务和统计

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use habit_tracker::logger::{self, LogBroadcaster};
use habit_tracker::settings::SettingsManager;
use habit_tracker::TrackerContext;

#[tokio::main]
async fn main() -> Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tracker-data"));

    let level = SettingsManager::new(data_dir.join("settings.json"))
        .await?
        .get()
        .await
        .tracing_level();
    logger::init(&data_dir.join("logs"), level, Arc::new(LogBroadcaster::new(256)))?;

    let ctx = TrackerContext::open(&data_dir).await?;
    ctx.task_list.on_open();

    let date = ctx.task_list.selected_date().await;
    let categories = ctx.task_list.visible_categories().await?;
    if categories.is_empty() {
        let message = if ctx.task_list.has_any_trackers().await? {
            "Ничего не найдено"
        } else {
            "Что будем отслеживать?"
        };
        println!("{}: {}", date, message);
    }

    for category in &categories {
        println!("{}", category.title);
        for tracker in &category.tasks {
            let done = ctx.task_list.is_completed(tracker.id, date).await?;
            let days = ctx.task_list.completed_count(tracker.id).await?;
            println!(
                "  [{}] {} {} ({} дн.)",
                if done { "x" } else { " " },
                tracker.emoji,
                tracker.name,
                days
            );
        }
    }

    let summary = ctx.statistics.refresh().await?;
    for card in summary.cards() {
        println!("{:>4}  {}", card.value, card.title);
    }

    ctx.task_list.on_close();
    ctx.shutdown();
    info!("退出");
    Ok(())
}

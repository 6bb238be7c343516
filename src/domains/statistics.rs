// 统计领域 - 由全部完成记录计算汇总指标
//
// 每次记录集合变化后整体重算，不做增量维护

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::event_bus::EventBus;
use crate::models::{CompletionRecord, Statistic};
use crate::storage::{RecordStore, StoreResult, TrackerStore};

/// 统计汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSummary {
    /// 最长的连续有完成记录的天数
    pub best_period: usize,
    /// 所有追踪器都完成的天数
    pub perfect_days: usize,
    /// 完成记录总数
    pub total_completed: usize,
    /// 平均每个有记录的日子完成的数量（整除）
    pub average: usize,
}

impl StatisticsSummary {
    /// 由完成记录和追踪器总数计算
    pub fn compute(records: &[CompletionRecord], tracker_count: usize) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut by_day: HashMap<NaiveDate, HashSet<Uuid>> = HashMap::new();
        for record in records {
            by_day
                .entry(record.due_date)
                .or_default()
                .insert(record.tracker_id);
        }

        let days: BTreeSet<NaiveDate> = by_day.keys().copied().collect();
        let perfect_days = if tracker_count == 0 {
            0
        } else {
            by_day
                .values()
                .filter(|trackers| trackers.len() == tracker_count)
                .count()
        };

        Self {
            best_period: best_period(&days),
            perfect_days,
            total_completed: records.len(),
            average: records.len() / days.len(),
        }
    }

    /// 统计卡片，按展示顺序排列；没有任何记录时为空
    pub fn cards(&self) -> Vec<Statistic> {
        if self.total_completed == 0 {
            return Vec::new();
        }

        [
            (self.best_period, "Лучший период"),
            (self.perfect_days, "Идеальные дни"),
            (self.total_completed, "Трекеров завершено"),
            (self.average, "Среднее значение"),
        ]
        .into_iter()
        .map(|(value, title)| Statistic {
            value,
            title: title.to_string(),
        })
        .collect()
    }
}

/// 已排序、去重的日期中最长的相邻一天序列
fn best_period(days: &BTreeSet<NaiveDate>) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        current = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(day);
    }

    longest
}

/// 统计领域管理器
pub struct StatisticsDomain {
    trackers: TrackerStore,
    records: RecordStore,
    events: Arc<EventBus>,
    latest: watch::Sender<StatisticsSummary>,
}

impl StatisticsDomain {
    pub fn new(trackers: TrackerStore, records: RecordStore, events: Arc<EventBus>) -> Self {
        let (latest, _) = watch::channel(StatisticsSummary::default());
        Self {
            trackers,
            records,
            events,
            latest,
        }
    }

    /// 从存储重新计算并广播最新结果
    pub async fn refresh(&self) -> StoreResult<StatisticsSummary> {
        let records = self.records.fetch_all().await?;
        let tracker_count = self.trackers.fetch_all().await?.len();

        let summary = StatisticsSummary::compute(&records, tracker_count);
        debug!("统计已更新: {:?}", summary);
        self.latest.send_replace(summary);
        Ok(summary)
    }

    /// 最近一次计算的结果
    pub fn latest(&self) -> StatisticsSummary {
        *self.latest.borrow()
    }

    /// 订阅统计结果的变化
    pub fn subscribe(&self) -> watch::Receiver<StatisticsSummary> {
        self.latest.subscribe()
    }

    /// 启动后台刷新循环：先订阅事件总线再返回，之后的每次记录变化都会触发重算
    pub fn spawn_refresh_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let receiver = self.events.subscribe();
        let domain = Arc::clone(self);
        tokio::spawn(async move { domain.run_refresh_loop(receiver).await })
    }

    async fn run_refresh_loop(&self, mut receiver: broadcast::Receiver<crate::event_bus::StoreEvent>) {
        info!("统计刷新循环已启动");

        if let Err(e) = self.refresh().await {
            error!("初始统计计算失败: {}", e);
        }

        loop {
            match receiver.recv().await {
                Ok(event) if event.affects_records() => {
                    if let Err(e) = self.refresh().await {
                        error!("统计重算失败: {}", e);
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("统计刷新落后 {} 个事件，整体重算", skipped);
                    if let Err(e) = self.refresh().await {
                        error!("统计重算失败: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("统计刷新循环已停止");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskType, Tracker, Weekday};
    use crate::storage::{Database, StorageConfig};
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
    }

    fn record(id: Uuid, d: u32) -> CompletionRecord {
        CompletionRecord {
            tracker_id: id,
            due_date: day(d),
        }
    }

    #[test]
    fn test_empty_records_give_zeroes() {
        let summary = StatisticsSummary::compute(&[], 3);
        assert_eq!(summary, StatisticsSummary::default());
        assert!(summary.cards().is_empty());
    }

    #[test]
    fn test_best_period_with_gap() {
        let id = Uuid::new_v4();
        let records: Vec<_> = [1, 2, 3, 5, 6].into_iter().map(|d| record(id, d)).collect();
        assert_eq!(StatisticsSummary::compute(&records, 1).best_period, 3);
    }

    #[test]
    fn test_best_period_counts_days_not_records() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let records = vec![record(a, 1), record(b, 1), record(a, 2), record(b, 4)];
        assert_eq!(StatisticsSummary::compute(&records, 2).best_period, 2);
    }

    #[test]
    fn test_best_period_across_month_boundary() {
        let id = Uuid::new_v4();
        let records = vec![
            CompletionRecord {
                tracker_id: id,
                due_date: NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
            },
            record(id, 1),
        ];
        assert_eq!(StatisticsSummary::compute(&records, 1).best_period, 2);
    }

    #[test]
    fn test_perfect_days() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // 第 1 天两个都完成，第 2 天只完成一个
        let records = vec![record(a, 1), record(b, 1), record(a, 2)];

        let summary = StatisticsSummary::compute(&records, 2);
        assert_eq!(summary.perfect_days, 1);
        assert_eq!(StatisticsSummary::compute(&records, 0).perfect_days, 0);
    }

    #[test]
    fn test_average_is_integer_division() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let records = vec![record(a, 1), record(b, 1), record(a, 2), record(b, 2)];
        assert_eq!(StatisticsSummary::compute(&records, 2).average, 2);

        let records = vec![record(a, 1), record(b, 1), record(a, 2)];
        let summary = StatisticsSummary::compute(&records, 2);
        assert_eq!(summary.average, 1);
        assert_eq!(summary.total_completed, 3);
    }

    #[test]
    fn test_cards_in_display_order() {
        let summary = StatisticsSummary {
            best_period: 4,
            perfect_days: 1,
            total_completed: 9,
            average: 3,
        };
        let values: Vec<_> = summary.cards().into_iter().map(|c| c.value).collect();
        assert_eq!(values, vec![4, 1, 9, 3]);
    }

    #[tokio::test]
    async fn test_refresh_loop_follows_record_changes() {
        let temp_dir = tempdir().unwrap();
        let events = Arc::new(EventBus::new(64));
        let config = StorageConfig::sqlite(temp_dir.path().join("tracker.db").to_string_lossy());
        let db = Arc::new(Database::open(&config, events.clone()).await.unwrap());
        let trackers = TrackerStore::new(db.clone());
        let records = RecordStore::new(db);

        let tracker = Tracker {
            id: Uuid::new_v4(),
            name: "Спорт".to_string(),
            task_type: TaskType::Habit,
            color: "#2FD058".to_string(),
            emoji: "🏅".to_string(),
            schedule: Weekday::ALL.into_iter().collect(),
            created_on: day(1),
        };
        trackers.upsert(&tracker, "Здоровье").await.unwrap();

        let domain = Arc::new(StatisticsDomain::new(
            trackers.clone(),
            records.clone(),
            events.clone(),
        ));
        let mut watcher = domain.subscribe();
        let handle = domain.spawn_refresh_loop();

        records.add_completion(tracker.id, day(2)).await.unwrap();

        let summary = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                watcher.changed().await.unwrap();
                let summary = *watcher.borrow();
                if summary.total_completed == 1 {
                    return summary;
                }
            }
        })
        .await
        .expect("统计没有在超时前更新");

        assert_eq!(summary.perfect_days, 1);
        assert_eq!(summary.best_period, 1);
        assert_eq!(domain.latest(), summary);

        handle.abort();
    }
}

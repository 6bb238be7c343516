// 数据模型定义 - 数据库行结构与领域实体之间的转换

use std::collections::BTreeSet;

use chrono::NaiveDate;
use uuid::Uuid;

use super::error::StoreError;
use crate::models::{CompletionRecord, TaskType, Tracker, Weekday};

/// 分类行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub title: String,
}

/// 追踪器行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackerRow {
    pub id: String,
    pub name: String,
    pub task_type: String,
    pub color: String,
    pub emoji: String,
    pub schedule: String, // JSON序列化的星期数组
    pub created_on: NaiveDate,
    pub category_title: String,
}

/// 完成记录行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub tracker_id: String,
    pub due_date: NaiveDate,
}

/// 日程序列化为 JSON 数组，例如 `["monday","friday"]`
pub fn encode_schedule(schedule: &BTreeSet<Weekday>) -> Result<String, StoreError> {
    serde_json::to_string(schedule).map_err(|e| StoreError::Corrupted(e.to_string()))
}

fn decode_schedule(raw: &str) -> Result<BTreeSet<Weekday>, StoreError> {
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupted(format!("schedule {raw:?}: {e}")))
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupted(format!("id {raw:?}: {e}")))
}

impl TrackerRow {
    pub fn from_tracker(tracker: &Tracker, category_title: &str) -> Result<Self, StoreError> {
        Ok(Self {
            id: tracker.id.to_string(),
            name: tracker.name.clone(),
            task_type: tracker.task_type.as_str().to_string(),
            color: tracker.color.clone(),
            emoji: tracker.emoji.clone(),
            schedule: encode_schedule(&tracker.schedule)?,
            created_on: tracker.created_on,
            category_title: category_title.to_string(),
        })
    }
}

impl TryFrom<TrackerRow> for Tracker {
    type Error = StoreError;

    fn try_from(row: TrackerRow) -> Result<Self, Self::Error> {
        let task_type = TaskType::parse(&row.task_type)
            .ok_or_else(|| StoreError::Corrupted(format!("task_type {:?}", row.task_type)))?;

        Ok(Tracker {
            id: parse_id(&row.id)?,
            name: row.name,
            task_type,
            color: row.color,
            emoji: row.emoji,
            schedule: decode_schedule(&row.schedule)?,
            created_on: row.created_on,
        })
    }
}

impl TryFrom<RecordRow> for CompletionRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(CompletionRecord {
            tracker_id: parse_id(&row.tracker_id)?,
            due_date: row.due_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_row_conversion_keeps_fields() {
        let tracker = Tracker {
            id: Uuid::new_v4(),
            name: "Полить цветы".to_string(),
            task_type: TaskType::Habit,
            color: "#33CF69".to_string(),
            emoji: "🌸".to_string(),
            schedule: [Weekday::Saturday, Weekday::Tuesday].into_iter().collect(),
            created_on: NaiveDate::from_ymd_opt(2024, 11, 3).unwrap(),
        };

        let row = TrackerRow::from_tracker(&tracker, "Дом").unwrap();
        assert_eq!(row.schedule, r#"["tuesday","saturday"]"#);
        assert_eq!(row.category_title, "Дом");

        let restored = Tracker::try_from(row).unwrap();
        assert_eq!(restored, tracker);
    }

    #[test]
    fn test_corrupted_rows_are_reported() {
        let row = TrackerRow {
            id: "not-a-uuid".to_string(),
            name: "x".to_string(),
            task_type: "habit".to_string(),
            color: String::new(),
            emoji: String::new(),
            schedule: "[]".to_string(),
            created_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            category_title: "c".to_string(),
        };
        assert!(matches!(
            Tracker::try_from(row),
            Err(StoreError::Corrupted(_))
        ));

        let bad_schedule = decode_schedule("[\"funday\"]");
        assert!(matches!(bad_schedule, Err(StoreError::Corrupted(_))));
        assert!(decode_schedule("").unwrap().is_empty());
    }
}

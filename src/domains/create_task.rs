// 创建任务领域 - 收集表单字段，校验后构造追踪器
//
// 同一个结构也用于编辑：从已有追踪器预填字段，保存时保留原 ID

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{TaskType, Tracker, Weekday, COLORS, EMOJIS};
use crate::schedule::{summarize_weekdays, weekday_of, ScheduleSummary};
use crate::storage::{StoreError, TrackerStore};

/// 创建前置条件未满足
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is empty")]
    EmptyName,
    #[error("emoji is not selected")]
    EmojiNotSelected,
    #[error("color is not selected")]
    ColorNotSelected,
    #[error("habit schedule is empty")]
    ScheduleEmpty,
    #[error("category is not selected")]
    CategoryNotSelected,
}

/// 保存失败：校验未通过或存储出错
#[derive(Debug, Error)]
pub enum CreateTaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 创建任务表单
pub struct CreateTaskDomain {
    task_type: TaskType,
    name: String,
    emoji_index: Option<usize>,
    color_index: Option<usize>,
    schedule: BTreeSet<Weekday>,
    category: Option<String>,
    /// 编辑时的原 ID 和原创建日期
    editing: Option<(Uuid, NaiveDate)>,
    name_char_limit: usize,
    clock: Arc<dyn Clock>,
}

impl CreateTaskDomain {
    pub fn new(task_type: TaskType, clock: Arc<dyn Clock>, name_char_limit: usize) -> Self {
        Self {
            task_type,
            name: String::new(),
            emoji_index: None,
            color_index: None,
            schedule: BTreeSet::new(),
            category: None,
            editing: None,
            name_char_limit,
            clock,
        }
    }

    /// 从已有追踪器预填（编辑流程）
    pub fn from_tracker(
        tracker: &Tracker,
        category: impl Into<String>,
        clock: Arc<dyn Clock>,
        name_char_limit: usize,
    ) -> Self {
        Self {
            task_type: tracker.task_type,
            name: tracker.name.clone(),
            emoji_index: EMOJIS.iter().position(|e| *e == tracker.emoji),
            color_index: COLORS
                .iter()
                .position(|c| c.eq_ignore_ascii_case(&tracker.color)),
            schedule: tracker.schedule.clone(),
            category: Some(category.into()),
            editing: Some((tracker.id, tracker.created_on)),
            name_char_limit,
            clock,
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// 选择 emoji；索引越界时返回 false 且不改变选择
    pub fn select_emoji(&mut self, index: usize) -> bool {
        if index >= EMOJIS.len() {
            return false;
        }
        self.emoji_index = Some(index);
        true
    }

    /// 选择颜色；索引越界时返回 false 且不改变选择
    pub fn select_color(&mut self, index: usize) -> bool {
        if index >= COLORS.len() {
            return false;
        }
        self.color_index = Some(index);
        true
    }

    pub fn selected_emoji(&self) -> Option<&'static str> {
        self.emoji_index.map(|i| EMOJIS[i])
    }

    pub fn selected_color(&self) -> Option<&'static str> {
        self.color_index.map(|i| COLORS[i])
    }

    pub fn set_schedule<I>(&mut self, days: I)
    where
        I: IntoIterator<Item = Weekday>,
    {
        self.schedule = days.into_iter().collect();
    }

    pub fn schedule(&self) -> &BTreeSet<Weekday> {
        &self.schedule
    }

    /// 日程摘要，用于表单上的副标题
    pub fn schedule_summary(&self) -> ScheduleSummary {
        summarize_weekdays(&self.schedule)
    }

    pub fn set_category(&mut self, title: impl Into<String>) {
        self.category = Some(title.into());
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// 名称超过字符上限时的警告，不阻止输入
    pub fn name_warning(&self) -> Option<String> {
        (self.name.chars().count() > self.name_char_limit)
            .then(|| format!("Ограничение {} символов", self.name_char_limit))
    }

    /// 校验创建前置条件
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.emoji_index.is_none() {
            return Err(ValidationError::EmojiNotSelected);
        }
        if self.color_index.is_none() {
            return Err(ValidationError::ColorNotSelected);
        }
        if self.task_type == TaskType::Habit && self.schedule.is_empty() {
            return Err(ValidationError::ScheduleEmpty);
        }
        Ok(())
    }

    pub fn can_create(&self) -> bool {
        self.validate().is_ok()
    }

    /// 构造追踪器；前置条件未满足时返回 None
    ///
    /// 不规则事件的日程固定为创建当天的星期。
    pub fn build(&self) -> Option<Tracker> {
        self.validate().ok()?;

        let (id, created_on) = self
            .editing
            .unwrap_or_else(|| (Uuid::new_v4(), self.clock.today()));

        let schedule = match self.task_type {
            TaskType::Habit => self.schedule.clone(),
            TaskType::IrregularEvent => BTreeSet::from([weekday_of(created_on)]),
        };

        Some(Tracker {
            id,
            name: self.name.trim().to_string(),
            task_type: self.task_type,
            color: self.selected_color()?.to_string(),
            emoji: self.selected_emoji()?.to_string(),
            schedule,
            created_on,
        })
    }

    /// 校验、构造并保存到所选分类
    pub async fn submit(&self, trackers: &TrackerStore) -> Result<Tracker, CreateTaskError> {
        self.validate()?;
        let category = self
            .category
            .as_deref()
            .ok_or(ValidationError::CategoryNotSelected)?;
        let tracker = self.build().ok_or(ValidationError::EmptyName)?;

        trackers.upsert(&tracker, category).await?;
        info!("已保存追踪器 {} 到分类 {}", tracker.name, category);
        Ok(tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::event_bus::EventBus;
    use crate::storage::{Database, StorageConfig};
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        // 周三
        NaiveDate::from_ymd_opt(2024, 11, 27).unwrap()
    }

    fn form(task_type: TaskType) -> CreateTaskDomain {
        CreateTaskDomain::new(task_type, Arc::new(FixedClock(today())), 38)
    }

    fn filled_habit() -> CreateTaskDomain {
        let mut f = form(TaskType::Habit);
        f.set_name("Пить воду");
        f.select_emoji(0);
        f.select_color(2);
        f.set_schedule([Weekday::Monday, Weekday::Thursday]);
        f
    }

    #[test]
    fn test_habit_requires_every_field() {
        let mut f = form(TaskType::Habit);
        assert_eq!(f.validate(), Err(ValidationError::EmptyName));
        f.set_name("Пить воду");
        assert_eq!(f.validate(), Err(ValidationError::EmojiNotSelected));
        f.select_emoji(1);
        assert_eq!(f.validate(), Err(ValidationError::ColorNotSelected));
        f.select_color(1);
        assert_eq!(f.validate(), Err(ValidationError::ScheduleEmpty));
        assert!(f.build().is_none());
        f.set_schedule([Weekday::Friday]);
        assert!(f.can_create());
    }

    #[test]
    fn test_irregular_event_needs_no_schedule() {
        let mut f = form(TaskType::IrregularEvent);
        f.set_name("Купить билеты");
        f.select_emoji(3);
        f.select_color(4);
        assert!(f.can_create());

        let tracker = f.build().unwrap();
        assert_eq!(tracker.created_on, today());
        assert_eq!(tracker.schedule, BTreeSet::from([Weekday::Wednesday]));
    }

    #[test]
    fn test_out_of_range_selection_is_ignored() {
        let mut f = form(TaskType::Habit);
        assert!(!f.select_emoji(EMOJIS.len()));
        assert!(!f.select_color(99));
        assert!(f.selected_emoji().is_none());
        assert!(f.selected_color().is_none());
    }

    #[test]
    fn test_build_generates_fresh_ids() {
        let f = filled_habit();
        let a = f.build().unwrap();
        let b = f.build().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.emoji, EMOJIS[0]);
        assert_eq!(a.color, COLORS[2]);
        assert_eq!(f.schedule_summary().to_string(), "Пн, Чт");
    }

    #[test]
    fn test_name_warning_over_limit() {
        let mut f = form(TaskType::Habit);
        f.set_name("я".repeat(38));
        assert!(f.name_warning().is_none());
        f.set_name("я".repeat(39));
        assert_eq!(f.name_warning().as_deref(), Some("Ограничение 38 символов"));
    }

    #[test]
    fn test_edit_keeps_identity() {
        let original = filled_habit().build().unwrap();
        let mut f = CreateTaskDomain::from_tracker(
            &original,
            "Здоровье",
            Arc::new(FixedClock(today() + chrono::Duration::days(3))),
            38,
        );
        assert!(f.is_editing());
        f.set_name("Пить больше воды");

        let edited = f.build().unwrap();
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.created_on, original.created_on);
        assert_eq!(edited.name, "Пить больше воды");
        assert_eq!(f.category(), Some("Здоровье"));
    }

    #[tokio::test]
    async fn test_submit_requires_category_and_persists() {
        let temp_dir = tempdir().unwrap();
        let events = Arc::new(EventBus::new(16));
        let config = StorageConfig::sqlite(temp_dir.path().join("tracker.db").to_string_lossy());
        let db = Arc::new(Database::open(&config, events).await.unwrap());
        let trackers = TrackerStore::new(db);

        let mut f = filled_habit();
        let err = f.submit(&trackers).await.unwrap_err();
        assert!(matches!(
            err,
            CreateTaskError::Validation(ValidationError::CategoryNotSelected)
        ));

        f.set_category("Здоровье");
        let saved = f.submit(&trackers).await.unwrap();
        assert_eq!(trackers.get(saved.id).await.unwrap(), saved);
        assert_eq!(trackers.category_of(saved.id).await.unwrap(), "Здоровье");
    }
}

// 领域模型定义 - 追踪器、分类、完成记录与统计卡片

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 追踪器名称的默认字符上限
pub const DEFAULT_NAME_CHAR_LIMIT: usize = 38;

/// 置顶分类的标题
pub const PINNED_CATEGORY_TITLE: &str = "Pinned";

/// 可选的 emoji 列表（按索引选择）
pub const EMOJIS: [&str; 18] = [
    "😊", "😻", "🌸", "🐶", "❤️", "😱", //
    "😇", "😡", "🥶", "🤔", "🙌", "🍔", //
    "🥦", "🏓", "🏅", "🎸", "🏖", "😪",
];

/// 可选的颜色列表（十六进制编码，按索引选择）
pub const COLORS: [&str; 18] = [
    "#FD4C49", "#FF881E", "#007BFA", "#6E44FE", "#33CF69", "#E66DD4", //
    "#F9D4D4", "#34A7FE", "#46E69D", "#35347C", "#FF674D", "#FF99CC", //
    "#F6C48B", "#7994F5", "#832CF1", "#AD56DA", "#8D72E6", "#2FD058",
];

/// 星期枚举
///
/// 声明顺序即排序顺序（周一在前），`BTreeSet<Weekday>` 因此天然按周一优先排列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// 按周一优先顺序排列的全部星期
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// 周一优先的序号（0..=6）
    pub fn index(self) -> usize {
        self as usize
    }

    /// 两个字母的缩写
    pub fn short_name(self) -> &'static str {
        match self {
            Weekday::Monday => "Пн",
            Weekday::Tuesday => "Вт",
            Weekday::Wednesday => "Ср",
            Weekday::Thursday => "Чт",
            Weekday::Friday => "Пт",
            Weekday::Saturday => "Сб",
            Weekday::Sunday => "Вс",
        }
    }

    /// 完整名称
    pub fn full_name(self) -> &'static str {
        match self {
            Weekday::Monday => "Понедельник",
            Weekday::Tuesday => "Вторник",
            Weekday::Wednesday => "Среда",
            Weekday::Thursday => "Четверг",
            Weekday::Friday => "Пятница",
            Weekday::Saturday => "Суббота",
            Weekday::Sunday => "Воскресенье",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Weekday::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// 追踪器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// 按星期重复的习惯
    Habit,
    /// 只在创建当天出现的不规则事件
    IrregularEvent,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Habit => "habit",
            TaskType::IrregularEvent => "irregular_event",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "habit" => Some(TaskType::Habit),
            "irregular_event" => Some(TaskType::IrregularEvent),
            _ => None,
        }
    }
}

/// 追踪器（习惯或不规则事件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: Uuid,
    pub name: String,
    pub task_type: TaskType,
    /// 十六进制颜色，例如 `#FD4C49`
    pub color: String,
    pub emoji: String,
    pub schedule: BTreeSet<Weekday>,
    /// 创建日期（不规则事件只在这一天出现）
    pub created_on: NaiveDate,
}

impl Tracker {
    pub fn is_habit(&self) -> bool {
        self.task_type == TaskType::Habit
    }
}

/// 追踪器分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCategory {
    pub title: String,
    pub tasks: Vec<Tracker>,
}

impl TrackerCategory {
    pub fn new(title: impl Into<String>, tasks: Vec<Tracker>) -> Self {
        Self {
            title: title.into(),
            tasks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// 完成记录：某追踪器在某个日历日已完成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub tracker_id: Uuid,
    pub due_date: NaiveDate,
}

/// 统计卡片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    pub value: usize,
    pub title: String,
}

/// 任务列表过滤器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    AllTasks,
    DueToday,
    Completed,
    Incomplete,
    SearchText,
}

impl TaskFilter {
    pub fn label(self) -> &'static str {
        match self {
            TaskFilter::AllTasks => "Все трекеры",
            TaskFilter::DueToday => "Трекеры на сегодня",
            TaskFilter::Completed => "Завершенные",
            TaskFilter::Incomplete => "Не завершенные",
            TaskFilter::SearchText => "Поиск",
        }
    }
}

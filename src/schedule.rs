//! 日程计算
//!
//! 把日历日期映射为星期，判断追踪器在某天是否需要出现，并生成星期集合的可读摘要。

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::models::{TaskType, Tracker, Weekday};

/// 日期对应的星期（直接使用日历的星期序号，与系统语言无关）
pub fn weekday_of(date: NaiveDate) -> Weekday {
    Weekday::from(date.weekday())
}

/// 追踪器在指定日期是否出现
///
/// - 习惯：日程非空且包含该日期的星期
/// - 不规则事件：只在创建当天出现
pub fn matches(tracker: &Tracker, date: NaiveDate) -> bool {
    match tracker.task_type {
        TaskType::Habit => tracker.schedule.contains(&weekday_of(date)),
        TaskType::IrregularEvent => tracker.created_on == date,
    }
}

/// 星期集合摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleSummary {
    /// 七天全选
    EveryDay,
    /// 选了五或六天，列出缺少的天
    EveryDayExcept(Vec<Weekday>),
    /// 其余情况，列出选中的天
    Days(Vec<Weekday>),
}

/// 生成星期集合摘要，始终按周一优先排序
pub fn summarize_weekdays<'a, I>(selected: I) -> ScheduleSummary
where
    I: IntoIterator<Item = &'a Weekday>,
{
    let selected: BTreeSet<Weekday> = selected.into_iter().copied().collect();

    match selected.len() {
        7 => ScheduleSummary::EveryDay,
        5 | 6 => ScheduleSummary::EveryDayExcept(
            Weekday::ALL
                .into_iter()
                .filter(|day| !selected.contains(day))
                .collect(),
        ),
        _ => ScheduleSummary::Days(selected.into_iter().collect()),
    }
}

fn join_short(days: &[Weekday]) -> String {
    days.iter()
        .map(|day| day.short_name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for ScheduleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleSummary::EveryDay => f.write_str("every day"),
            ScheduleSummary::EveryDayExcept(missing) => {
                write!(f, "every day except {}", join_short(missing))
            }
            ScheduleSummary::Days(days) => f.write_str(&join_short(days)),
        }
    }
}

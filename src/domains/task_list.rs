// 任务列表领域 - 组合分类、追踪器、完成记录和置顶集合，得到某一天要展示的分类列表
//
// 选中日期与过滤器是本领域唯一的可变状态；分类列表每次按需重新计算，不缓存

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analytics::{main_screen_params, AnalyticsSink};
use crate::clock::Clock;
use crate::domains::create_task::CreateTaskDomain;
use crate::models::{TaskFilter, TaskType, TrackerCategory, PINNED_CATEGORY_TITLE};
use crate::pins::PinRegistry;
use crate::schedule;
use crate::storage::{CategoryStore, RecordStore, StoreResult, TrackerStore};

/// 计算可见分类
///
/// 1. 每个分类只保留在 `date` 出现的追踪器
/// 2. 置顶的追踪器移入最前面的 “Pinned” 分类，丢弃变空的分类
/// 3. 应用过滤器（`completed` 是在 `date` 已完成的追踪器 ID）
/// 4. 再次丢弃空分类
///
/// `DueToday` 在这里等同于 `AllTasks`，日期重置由调用方负责。
pub fn compute_visible_categories(
    categories: Vec<TrackerCategory>,
    date: NaiveDate,
    filter: TaskFilter,
    search_text: Option<&str>,
    pinned: &HashSet<Uuid>,
    completed: &HashSet<Uuid>,
) -> Vec<TrackerCategory> {
    let mut pinned_tasks = Vec::new();
    let mut result = Vec::with_capacity(categories.len() + 1);

    for category in categories {
        let mut tasks = Vec::with_capacity(category.tasks.len());
        for tracker in category.tasks {
            if !schedule::matches(&tracker, date) {
                continue;
            }
            if pinned.contains(&tracker.id) {
                pinned_tasks.push(tracker);
            } else {
                tasks.push(tracker);
            }
        }
        if !tasks.is_empty() {
            result.push(TrackerCategory::new(category.title, tasks));
        }
    }

    if !pinned_tasks.is_empty() {
        result.insert(0, TrackerCategory::new(PINNED_CATEGORY_TITLE, pinned_tasks));
    }

    let needle = search_text
        .map(|text| text.trim().to_lowercase())
        .filter(|text| !text.is_empty());

    for category in &mut result {
        match filter {
            TaskFilter::AllTasks | TaskFilter::DueToday => {}
            TaskFilter::Completed => category.tasks.retain(|t| completed.contains(&t.id)),
            TaskFilter::Incomplete => category.tasks.retain(|t| !completed.contains(&t.id)),
            TaskFilter::SearchText => {
                if let Some(needle) = &needle {
                    category
                        .tasks
                        .retain(|t| t.name.to_lowercase().contains(needle.as_str()));
                }
            }
        }
    }

    result.retain(|category| !category.is_empty());
    result
}

/// 任务列表的可变状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListState {
    pub selected_date: NaiveDate,
    pub selected_filter: TaskFilter,
    pub search_text: String,
}

/// 任务列表领域管理器
pub struct TaskListDomain {
    categories: CategoryStore,
    trackers: TrackerStore,
    records: RecordStore,
    pins: Arc<PinRegistry>,
    analytics: Arc<dyn AnalyticsSink>,
    clock: Arc<dyn Clock>,
    name_char_limit: usize,
    state: RwLock<TaskListState>,
}

impl TaskListDomain {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        categories: CategoryStore,
        trackers: TrackerStore,
        records: RecordStore,
        pins: Arc<PinRegistry>,
        analytics: Arc<dyn AnalyticsSink>,
        clock: Arc<dyn Clock>,
        name_char_limit: usize,
    ) -> Self {
        let state = TaskListState {
            selected_date: clock.today(),
            selected_filter: TaskFilter::AllTasks,
            search_text: String::new(),
        };

        Self {
            categories,
            trackers,
            records,
            pins,
            analytics,
            clock,
            name_char_limit,
            state: RwLock::new(state),
        }
    }

    /// 主界面打开
    pub fn on_open(&self) {
        self.analytics.report("open", main_screen_params(None));
    }

    /// 主界面关闭
    pub fn on_close(&self) {
        self.analytics.report("close", main_screen_params(None));
    }

    pub async fn state(&self) -> TaskListState {
        self.state.read().await.clone()
    }

    pub async fn selected_date(&self) -> NaiveDate {
        self.state.read().await.selected_date
    }

    pub async fn set_selected_date(&self, date: NaiveDate) {
        self.state.write().await.selected_date = date;
        debug!("选中日期: {}", date);
    }

    pub async fn selected_filter(&self) -> TaskFilter {
        self.state.read().await.selected_filter
    }

    /// 切换过滤器；`DueToday` 会立即把选中日期重置为今天
    pub async fn set_filter(&self, filter: TaskFilter) {
        let mut state = self.state.write().await;
        state.selected_filter = filter;
        if filter == TaskFilter::DueToday {
            state.selected_date = self.clock.today();
        }
        drop(state);

        let mut params = main_screen_params(Some("filter"));
        params.insert("filter".to_string(), filter.label().to_string());
        self.analytics.report("click", params);
    }

    /// 更新搜索文本；非空时切换到搜索过滤器，清空时回到全部
    pub async fn set_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.state.write().await;

        if text.trim().is_empty() {
            if state.selected_filter == TaskFilter::SearchText {
                state.selected_filter = TaskFilter::AllTasks;
            }
        } else {
            state.selected_filter = TaskFilter::SearchText;
        }
        state.search_text = text;
    }

    /// 当前选中日期与过滤器下的可见分类
    pub async fn visible_categories(&self) -> StoreResult<Vec<TrackerCategory>> {
        let (date, filter, search_text) = {
            let mut state = self.state.write().await;
            if state.selected_filter == TaskFilter::DueToday {
                state.selected_date = self.clock.today();
            }
            (
                state.selected_date,
                state.selected_filter,
                state.search_text.clone(),
            )
        };

        let categories = self.categories.fetch_all().await?;
        let pinned = self.pins.load_all().await;
        let completed = match filter {
            TaskFilter::Completed | TaskFilter::Incomplete => self.records.completed_on(date).await?,
            _ => HashSet::new(),
        };

        Ok(compute_visible_categories(
            categories,
            date,
            filter,
            Some(search_text.as_str()),
            &pinned,
            &completed,
        ))
    }

    /// 切换 (追踪器, 日期) 的完成状态；返回切换后是否已完成
    pub async fn toggle_completion(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        let completed = self.records.toggle_completion(tracker_id, date).await?;
        self.analytics.report("click", main_screen_params(Some("track")));
        Ok(completed)
    }

    pub async fn is_completed(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        self.records.is_completed(tracker_id, date).await
    }

    /// 追踪器完成的总天数（不区分日期）
    pub async fn completed_count(&self, tracker_id: Uuid) -> StoreResult<usize> {
        self.records.count_for_tracker(tracker_id).await
    }

    pub async fn pin(&self, tracker_id: Uuid) -> Result<bool> {
        self.pins.add(tracker_id).await
    }

    pub async fn unpin(&self, tracker_id: Uuid) -> Result<bool> {
        self.pins.remove(tracker_id).await
    }

    pub async fn is_pinned(&self, tracker_id: Uuid) -> bool {
        self.pins.contains(tracker_id).await
    }

    /// 删除追踪器：完成记录一并删除，同时取消置顶
    pub async fn delete_tracker(&self, tracker_id: Uuid) -> Result<bool> {
        let removed = self.trackers.remove(tracker_id).await?;
        self.pins.remove(tracker_id).await?;
        self.analytics.report("click", main_screen_params(Some("delete")));

        if removed {
            info!("已删除追踪器 {}", tracker_id);
        }
        Ok(removed)
    }

    /// 打开空白的创建表单
    pub fn create_task(&self, task_type: TaskType) -> CreateTaskDomain {
        self.analytics
            .report("click", main_screen_params(Some("add_track")));
        CreateTaskDomain::new(task_type, self.clock.clone(), self.name_char_limit)
    }

    /// 打开编辑表单，字段从已有追踪器预填
    pub async fn edit_tracker(&self, tracker_id: Uuid) -> StoreResult<CreateTaskDomain> {
        let tracker = self.trackers.get(tracker_id).await?;
        let category = self.trackers.category_of(tracker_id).await?;
        self.analytics.report("click", main_screen_params(Some("edit")));

        Ok(CreateTaskDomain::from_tracker(
            &tracker,
            category,
            self.clock.clone(),
            self.name_char_limit,
        ))
    }

    /// 该日期是否有任何追踪器出现（不考虑过滤器）
    pub async fn has_trackers_for(&self, date: NaiveDate) -> StoreResult<bool> {
        let trackers = self.trackers.fetch_all().await?;
        Ok(trackers.iter().any(|t| schedule::matches(t, date)))
    }

    /// 是否存在任何追踪器
    pub async fn has_any_trackers(&self) -> StoreResult<bool> {
        Ok(!self.trackers.fetch_all().await?.is_empty())
    }
}

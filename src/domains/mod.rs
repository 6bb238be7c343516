// 领域模块 - 用于组织应用的业务逻辑
//
// 包含3个领域：任务列表、统计、创建任务

pub mod create_task;
pub mod statistics;
pub mod task_list;

pub use create_task::{CreateTaskDomain, CreateTaskError, ValidationError};
pub use statistics::{StatisticsDomain, StatisticsSummary};
pub use task_list::{compute_visible_categories, TaskListDomain, TaskListState};

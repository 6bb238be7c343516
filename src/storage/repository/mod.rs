// Repository 抽象层 - 每张表一个接口
//
// 这里只定义原始读写，不做并发控制和事件通知；这些由 stores 层负责

pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::error::StoreResult;
use crate::models::{CompletionRecord, Tracker};

/// 分类表操作接口
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// 所有分类标题，按标题排序
    async fn fetch_category_titles(&self) -> StoreResult<Vec<String>>;

    /// 分类是否存在
    async fn category_exists(&self, title: &str) -> StoreResult<bool>;

    /// 插入分类，已存在时不做任何事；返回是否真的插入了
    async fn insert_category(&self, title: &str) -> StoreResult<bool>;

    /// 分类数量
    async fn count_categories(&self) -> StoreResult<i64>;
}

/// 追踪器表操作接口
#[async_trait]
pub trait TrackerRepository: Send + Sync {
    /// 所有追踪器及其分类标题，按名称排序
    async fn fetch_trackers(&self) -> StoreResult<Vec<(Tracker, String)>>;

    /// 按 ID 查找追踪器及其分类标题
    async fn find_tracker(&self, id: Uuid) -> StoreResult<Option<(Tracker, String)>>;

    /// 按 ID 插入或覆盖；返回是否为新插入
    async fn upsert_tracker(&self, tracker: &Tracker, category_title: &str) -> StoreResult<bool>;

    /// 删除追踪器及其全部完成记录；返回是否删除了追踪器
    async fn delete_tracker(&self, id: Uuid) -> StoreResult<bool>;
}

/// 完成记录表操作接口
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// 所有完成记录，按日期排序
    async fn fetch_records(&self) -> StoreResult<Vec<CompletionRecord>>;

    /// 某个追踪器的完成记录，按日期排序
    async fn fetch_records_for_tracker(&self, tracker_id: Uuid)
        -> StoreResult<Vec<CompletionRecord>>;

    /// 某一天的全部完成记录
    async fn fetch_records_on(&self, date: NaiveDate) -> StoreResult<Vec<CompletionRecord>>;

    /// (追踪器, 日期) 是否已有记录
    async fn record_exists(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool>;

    /// 插入一条记录（不检查重复）
    async fn insert_record(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<()>;

    /// 删除 (追踪器, 日期) 的记录；返回删除条数
    async fn delete_record(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<u64>;

    /// 某个追踪器的记录总数
    async fn count_records_for_tracker(&self, tracker_id: Uuid) -> StoreResult<i64>;
}

/// 同时提供三张表的完整存储后端
pub trait TrackerBackend: CategoryRepository + TrackerRepository + RecordRepository {
    /// 获取数据库类型标识
    fn db_type(&self) -> &str;
}

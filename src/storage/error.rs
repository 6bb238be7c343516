// 存储层错误定义
//
// 区分“没有数据”与“存储出错”：空集合用 Ok(vec![]) 表示，读写失败用 QueryFailure 表示

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// 底层数据库读写失败
    #[error("query failure: {0}")]
    QueryFailure(String),

    /// 按主键或标题查找没有结果
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// 行数据无法还原为实体（UUID、日程 JSON 等损坏）
    #[error("corrupted row: {0}")]
    Corrupted(String),

    /// 写入的实体不满足不变量（例如名称为空）
    #[error("invalid entity: {0}")]
    InvalidEntity(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity: "row",
                key: String::new(),
            },
            other => StoreError::QueryFailure(other.to_string()),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::QueryFailure(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

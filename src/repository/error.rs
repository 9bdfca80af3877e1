// ==========================================
// 表格数据交换引擎 - 对象存储错误类型
// ==========================================
// 工具: thiserror 派生宏
// 来源: rusqlite / serde_json / 锁中毒
// ==========================================

use thiserror::Error;

/// 对象存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("对象不存在: {type_name} id={id}")]
    NotFound { type_name: String, id: String },

    #[error("对象类型不匹配: 已存为 {expected}, 保存时为 {actual}")]
    TypeMismatch { expected: String, actual: String },

    // ===== SQLite =====
    #[error("存储锁获取失败: {0}")]
    LockError(String),

    #[error("提交事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("SQL 执行失败: {0}")]
    DatabaseQueryError(String),

    #[error("违反唯一约束: {0}")]
    UniqueConstraintViolation(String),

    // ===== 序列化 =====
    #[error("记录 JSON 序列化失败: {0}")]
    SerializationError(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                StoreError::UniqueConstraintViolation(msg)
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) => StoreError::DatabaseQueryError(msg),
            other => StoreError::DatabaseQueryError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

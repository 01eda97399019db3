// ==========================================
// 销售批次守护 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户友好的错误消息
// 所有错误信息必须包含显式原因
// ==========================================

use crate::domain::document::AvailabilityShortage;
use crate::domain::validation::ValidationViolation;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 批次校验错误
    // ==========================================
    /// 批次数量校验阻断保存（携带完整违规列表）
    #[error("批次数量校验失败: {reason}")]
    BatchQuantityBlocked {
        reason: String,
        violations: Vec<ValidationViolation>,
    },

    /// 批次可用量不足
    #[error("批次可用量不足: {reason}")]
    InsufficientBatchAvailability {
        reason: String,
        shortages: Vec<AvailabilityShortage>,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 阻断错误中的违规列表（其它错误为空）
    pub fn violations(&self) -> &[ValidationViolation] {
        match self {
            ApiError::BatchQuantityBlocked { violations, .. } => violations,
            _ => &[],
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::WriteRejected(msg) => {
                ApiError::DatabaseError(format!("批次写入被拒绝: {}", msg))
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 销售批次守护 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod document;
pub mod types;
pub mod validation;

// 重导出核心类型
pub use batch::{Batch, BatchDates};
pub use document::{AvailabilityShortage, DocumentItem, SalesDocument, WorkOrder};
pub use types::{BatchLimit, DocumentKind, ViolationReason};
pub use validation::{LineItem, ValidationOutcome, ValidationViolation};

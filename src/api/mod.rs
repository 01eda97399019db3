// ==========================================
// 销售批次守护 - API 层
// ==========================================
// 职责: 面向表单/命令行的业务接口，统一错误
// ==========================================

pub mod batch_validation_api;
pub mod error;

pub use batch_validation_api::BatchValidationApi;
pub use error::{ApiError, ApiResult};

// ==========================================
// 销售批次守护 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 单据保存前的批次数量/可用量校验（人工可显式覆盖）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 校验规则
pub mod engine;

// 导入层 - 批次主数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    AvailabilityShortage, Batch, BatchDates, BatchLimit, DocumentItem, DocumentKind, LineItem,
    SalesDocument, ValidationOutcome, ValidationViolation, ViolationReason, WorkOrder,
};

pub use engine::{BatchAvailabilityChecker, BatchQuantityValidator, BatchSizeLookup};

pub use api::{ApiError, ApiResult, BatchValidationApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "销售批次守护";

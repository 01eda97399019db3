// ==========================================
// 销售批次守护 - 导入层
// ==========================================
// 职责: 外部批次主数据导入
// 支持: CSV
// ==========================================

pub mod batch_importer;
pub mod error;
pub mod file_parser;

pub use batch_importer::{BatchImportSummary, BatchImporter, ImportRowError};
pub use error::{ImportError, ImportResult};
pub use file_parser::CsvParser;

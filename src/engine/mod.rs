// ==========================================
// 销售批次守护 - 引擎层
// ==========================================
// 红线: 引擎不直接写库，只计算并返回结果
// ==========================================

pub mod batch_availability;
pub mod batch_quantity;
pub mod batch_size_lookup;

pub use batch_availability::{BatchAvailabilityChecker, StockMovement};
pub use batch_quantity::BatchQuantityValidator;
pub use batch_size_lookup::{BatchSizeLookup, InMemoryBatchSizeLookup};

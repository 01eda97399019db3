// ==========================================
// 销售批次守护 - 批次领域模型
// ==========================================
// 对齐: batch 表
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Batch - 批次主数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    // ===== 主键 =====
    pub batch_id: String,

    pub item_code: Option<String>, // 所属物料

    // ===== 数量 =====
    pub batch_size: Option<f64>,          // 单批次允许的最大数量
    pub available_batch_qty: Option<f64>, // 当前可用数量

    // ===== 日期 =====
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl Batch {
    pub fn dates(&self) -> BatchDates {
        BatchDates {
            manufacturing_date: self.manufacturing_date,
            expiry_date: self.expiry_date,
        }
    }
}

// ==========================================
// BatchDates - 批次日期（行项目自动带出）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchDates {
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

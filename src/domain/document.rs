// ==========================================
// 销售批次守护 - 单据领域模型
// ==========================================
// 职责: 销售发票/发货单/生产工单的最小字段集合，及到 LineItem 的转换
// 红线: 不含数据访问逻辑
// ==========================================

use crate::domain::types::DocumentKind;
use crate::domain::validation::LineItem;
use serde::{Deserialize, Serialize};

// ==========================================
// DocumentItem - 单据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentItem {
    pub idx: usize,
    #[serde(default)]
    pub item_code: String,
    #[serde(default)]
    pub batch_no: Option<String>,
    #[serde(default)]
    pub qty: f64,
    #[serde(default)]
    pub batch_size_limit: Option<f64>, // 行上显式批次上限
    #[serde(default)]
    pub stock_qty: Option<f64>, // 库存单位数量
    #[serde(default)]
    pub conversion_factor: Option<f64>, // 单位换算系数
}

impl DocumentItem {
    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            index: self.idx,
            item_code: self.item_code.clone(),
            batch_no: self.batch_no.clone(),
            qty: self.qty,
            explicit_limit: self.batch_size_limit,
        }
    }

    /// 库存单位数量
    ///
    /// 优先 stock_qty；否则 qty * conversion_factor（系数缺失或为0时按1）
    pub fn stock_qty(&self) -> f64 {
        if let Some(q) = self.stock_qty {
            return q;
        }
        let cf = match self.conversion_factor {
            Some(cf) if cf != 0.0 => cf,
            _ => 1.0,
        };
        self.qty * cf
    }
}

// ==========================================
// SalesDocument - 销售类单据（发票/发货单）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesDocument {
    pub kind: DocumentKind,
    pub name: String,
    #[serde(default)]
    pub update_stock: bool,
    /// 单据上持久化的“允许超批次”标志
    #[serde(default)]
    pub allow_batch_exceed: bool,
    #[serde(default)]
    pub items: Vec<DocumentItem>,
}

impl SalesDocument {
    pub fn line_items(&self) -> Vec<LineItem> {
        self.items.iter().map(DocumentItem::to_line_item).collect()
    }

    /// 是否影响库存
    ///
    /// - 发货单: 始终影响
    /// - 销售发票: 仅 update_stock 时影响
    /// - 生产工单: 不影响
    pub fn is_stock_affecting(&self) -> bool {
        match self.kind {
            DocumentKind::DeliveryNote => true,
            DocumentKind::SalesInvoice => self.update_stock,
            DocumentKind::WorkOrder => false,
        }
    }
}

// ==========================================
// WorkOrder - 生产工单（单行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkOrder {
    pub name: String,
    #[serde(default)]
    pub production_item: String,
    #[serde(default)]
    pub qty: f64,
    #[serde(default)]
    pub production_qty: Option<f64>,
    #[serde(default)]
    pub production_batch: Option<String>,
    #[serde(default)]
    pub batch_no: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub allow_batch_exceed: bool,
}

impl WorkOrder {
    /// 有效数量: production_qty 非零时优先，否则 qty
    pub fn effective_qty(&self) -> f64 {
        match self.production_qty {
            Some(q) if q != 0.0 => q,
            _ => self.qty,
        }
    }

    /// 有效批次: production_batch > batch_no > batch，空白跳过
    pub fn effective_batch(&self) -> Option<&str> {
        [&self.production_batch, &self.batch_no, &self.batch]
            .into_iter()
            .filter_map(|b| b.as_deref())
            .map(str::trim)
            .find(|b| !b.is_empty())
    }

    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            index: 1,
            item_code: self.production_item.clone(),
            batch_no: self.effective_batch().map(str::to_string),
            qty: self.effective_qty(),
            explicit_limit: None,
        }
    }
}

// ==========================================
// AvailabilityShortage - 批次可用量不足
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityShortage {
    pub batch_no: String,
    pub requested: f64, // 单据内该批次累计库存数量
    pub available: f64, // 批次可用数量（缺失按0）
}

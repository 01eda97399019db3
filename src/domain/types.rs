// ==========================================
// 销售批次守护 - 领域类型定义
// ==========================================
// 职责: 违规原因、批次上限、单据类型等值类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 违规原因 (Violation Reason)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationReason {
    LimitUnavailable,     // 批次上限未配置或无法获取
    QuantityExceedsLimit, // 数量超过批次上限
}

impl ViolationReason {
    /// 面向用户的原因说明
    pub fn describe(&self) -> &'static str {
        match self {
            ViolationReason::LimitUnavailable => "Batch size not available",
            ViolationReason::QuantityExceedsLimit => "Qty exceeds batch size",
        }
    }
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationReason::LimitUnavailable => write!(f, "LIMIT_UNAVAILABLE"),
            ViolationReason::QuantityExceedsLimit => write!(f, "QUANTITY_EXCEEDS_LIMIT"),
        }
    }
}

// ==========================================
// 批次上限 (Batch Limit)
// ==========================================
// 红线: 零/负数/非有限值一律视为 Unknown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchLimit {
    Known(f64),
    Unknown,
}

impl BatchLimit {
    /// 从原始数值归一化
    ///
    /// # 返回
    /// - Known(v): v 为有限正数
    /// - Unknown: None / 0 / 负数 / NaN / 无穷
    pub fn from_raw(raw: Option<f64>) -> Self {
        match raw {
            Some(v) if v.is_finite() && v > 0.0 => BatchLimit::Known(v),
            _ => BatchLimit::Unknown,
        }
    }

    /// 已知上限的数值（未知为 None）
    pub fn value(&self) -> Option<f64> {
        match self {
            BatchLimit::Known(v) => Some(*v),
            BatchLimit::Unknown => None,
        }
    }
}

impl fmt::Display for BatchLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchLimit::Known(v) => write!(f, "{}", v),
            BatchLimit::Unknown => write!(f, "—"),
        }
    }
}

// ==========================================
// 单据类型 (Document Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    SalesInvoice, // 销售发票
    DeliveryNote, // 发货单
    WorkOrder,    // 生产工单
}

impl DocumentKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace(' ', "_").as_str() {
            "SALES_INVOICE" => Some(DocumentKind::SalesInvoice),
            "DELIVERY_NOTE" => Some(DocumentKind::DeliveryNote),
            "WORK_ORDER" => Some(DocumentKind::WorkOrder),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DocumentKind::SalesInvoice => "SALES_INVOICE",
            DocumentKind::DeliveryNote => "DELIVERY_NOTE",
            DocumentKind::WorkOrder => "WORK_ORDER",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

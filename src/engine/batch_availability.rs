// ==========================================
// 销售批次守护 - 批次可用量校验引擎
// ==========================================
// 职责: 影响库存的单据，按批次累计请求数量，与批次可用量比较
// 红线: 不直接写库，只计算请求量、短缺清单与增减量
// ==========================================

use crate::domain::document::{AvailabilityShortage, SalesDocument};
use std::collections::HashMap;

/// 默认比较容差
pub const DEFAULT_AVAILABILITY_TOLERANCE: f64 = 1e-9;

// ==========================================
// BatchAvailabilityChecker - 批次可用量校验器
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct BatchAvailabilityChecker {
    tolerance: f64,
}

impl Default for BatchAvailabilityChecker {
    fn default() -> Self {
        Self::new(DEFAULT_AVAILABILITY_TOLERANCE)
    }
}

impl BatchAvailabilityChecker {
    pub fn new(tolerance: f64) -> Self {
        let tolerance = if tolerance.is_finite() && tolerance >= 0.0 {
            tolerance
        } else {
            DEFAULT_AVAILABILITY_TOLERANCE
        };
        Self { tolerance }
    }

    /// 按批次累计库存请求数量（首次出现顺序）
    ///
    /// 不影响库存的单据返回空；无批次或数量 <= 0 的行忽略
    pub fn requested_by_batch(&self, doc: &SalesDocument) -> Vec<(String, f64)> {
        if !doc.is_stock_affecting() {
            return Vec::new();
        }

        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<String, f64> = HashMap::new();
        for (batch_no, qty) in stock_rows(doc) {
            match totals.get_mut(&batch_no) {
                Some(total) => *total += qty,
                None => {
                    order.push(batch_no.clone());
                    totals.insert(batch_no, qty);
                }
            }
        }

        order
            .into_iter()
            .map(|b| {
                let total = totals.get(&b).copied().unwrap_or(0.0);
                (b, total)
            })
            .collect()
    }

    /// 比较请求量与可用量
    ///
    /// # 参数
    /// - requested: requested_by_batch 的输出
    /// - available: 批次可用量（缺失按 0）
    pub fn find_shortages(
        &self,
        requested: &[(String, f64)],
        available: &HashMap<String, f64>,
    ) -> Vec<AvailabilityShortage> {
        requested
            .iter()
            .filter_map(|(batch_no, needed)| {
                let avail = available.get(batch_no).copied().unwrap_or(0.0);
                if *needed > avail + self.tolerance {
                    Some(AvailabilityShortage {
                        batch_no: batch_no.clone(),
                        requested: *needed,
                        available: avail,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// 提交/取消时的可用量增减（逐行，提交 -qty，取消 +qty）
    pub fn stock_deltas(&self, doc: &SalesDocument, movement: StockMovement) -> Vec<(String, f64)> {
        if !doc.is_stock_affecting() {
            return Vec::new();
        }
        let sign = movement.sign();
        stock_rows(doc)
            .map(|(batch_no, qty)| (batch_no, sign * qty))
            .collect()
    }
}

/// 库存变动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMovement {
    Consume, // 提交
    Revert,  // 取消
}

impl StockMovement {
    fn sign(&self) -> f64 {
        match self {
            StockMovement::Consume => -1.0,
            StockMovement::Revert => 1.0,
        }
    }
}

fn stock_rows(doc: &SalesDocument) -> impl Iterator<Item = (String, f64)> + '_ {
    doc.items.iter().filter_map(|it| {
        let batch_no = it
            .batch_no
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())?;
        let qty = it.stock_qty();
        if qty > 0.0 {
            Some((batch_no.to_string(), qty))
        } else {
            None
        }
    })
}

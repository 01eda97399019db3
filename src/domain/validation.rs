// ==========================================
// 销售批次守护 - 校验领域模型
// ==========================================
// 职责: 行项目、校验违规、校验结果
// 红线: 校验结果每次保存尝试重新构造，不保留任何跨轮次状态
// ==========================================

use crate::domain::types::{BatchLimit, ViolationReason};
use serde::{Deserialize, Serialize};

// ==========================================
// LineItem - 待校验行项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub index: usize,                // 行号 (从1开始)
    pub item_code: String,           // 物料编码
    pub batch_no: Option<String>,    // 批次号 (None 表示无批次约束)
    pub qty: f64,                    // 请求数量
    pub explicit_limit: Option<f64>, // 行上直接给定的上限 (优先于批次配置)
}

impl LineItem {
    pub fn new(index: usize, item_code: impl Into<String>, qty: f64) -> Self {
        Self {
            index,
            item_code: item_code.into(),
            batch_no: None,
            qty,
            explicit_limit: None,
        }
    }

    pub fn with_batch(mut self, batch_no: impl Into<String>) -> Self {
        self.batch_no = Some(batch_no.into());
        self
    }

    pub fn with_explicit_limit(mut self, limit: f64) -> Self {
        self.explicit_limit = Some(limit);
        self
    }

    /// 有效批次号（空白字符串视为未指定）
    pub fn batch(&self) -> Option<&str> {
        self.batch_no
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }

    /// 是否存在有意义的数量请求（零/负数/非有限值均不校验）
    pub fn has_meaningful_qty(&self) -> bool {
        self.qty.is_finite() && self.qty > 0.0
    }

    /// 行上显式上限（仅正数有效）
    pub fn usable_explicit_limit(&self) -> Option<f64> {
        self.explicit_limit.filter(|v| v.is_finite() && *v > 0.0)
    }
}

// ==========================================
// ValidationViolation - 校验违规
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub index: usize,
    pub item_code: String,
    pub batch_no: String,
    pub qty: f64,
    pub limit: BatchLimit,
    pub reason: ViolationReason,
}

// ==========================================
// ValidationOutcome - 校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// 违规列表（保持行顺序）
    pub violations: Vec<ValidationViolation>,
    /// 是否阻断保存
    pub blocked: bool,
}

impl ValidationOutcome {
    /// 由违规列表与覆盖标志构造
    ///
    /// blocked = 存在违规 且 未启用覆盖
    pub fn from_violations(violations: Vec<ValidationViolation>, override_enabled: bool) -> Self {
        let blocked = !violations.is_empty() && !override_enabled;
        Self {
            violations,
            blocked,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// 存在违规但因覆盖而放行
    pub fn override_applied(&self) -> bool {
        !self.violations.is_empty() && !self.blocked
    }

    /// 首个违规行号（界面定位用）
    pub fn first_violation_index(&self) -> Option<usize> {
        self.violations.first().map(|v| v.index)
    }

    /// 汇总说明，如 "2 issues"
    pub fn summary(&self) -> String {
        let count = self.violations.len();
        if count == 1 {
            "1 issue".to_string()
        } else {
            format!("{} issues", count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(index: usize) -> ValidationViolation {
        ValidationViolation {
            index,
            item_code: "ITEM-A".to_string(),
            batch_no: "B1".to_string(),
            qty: 120.0,
            limit: BatchLimit::Known(100.0),
            reason: ViolationReason::QuantityExceedsLimit,
        }
    }

    #[test]
    fn test_outcome_blocked_flag() {
        assert!(!ValidationOutcome::from_violations(vec![], false).blocked);
        assert!(!ValidationOutcome::from_violations(vec![], true).blocked);
        assert!(ValidationOutcome::from_violations(vec![violation(1)], false).blocked);

        let overridden = ValidationOutcome::from_violations(vec![violation(1)], true);
        assert!(!overridden.blocked);
        assert!(overridden.override_applied());
        assert_eq!(overridden.violations.len(), 1);
    }

    #[test]
    fn test_blank_batch_is_none() {
        let line = LineItem::new(1, "ITEM-A", 10.0).with_batch("   ");
        assert_eq!(line.batch(), None);
    }

    #[test]
    fn test_summary_wording() {
        let one = ValidationOutcome::from_violations(vec![violation(3)], false);
        assert_eq!(one.summary(), "1 issue");
        assert_eq!(one.first_violation_index(), Some(3));

        let two = ValidationOutcome::from_violations(vec![violation(1), violation(2)], false);
        assert_eq!(two.summary(), "2 issues");
    }
}

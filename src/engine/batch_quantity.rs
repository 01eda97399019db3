// ==========================================
// 销售批次守护 - 批次数量校验引擎
// ==========================================
// 红线: 未覆盖时，存在违规的单据不得保存
// ==========================================
// 职责: 行数量 vs 批次上限 判定 + 是否阻断保存
// 输入: LineItem 列表 + 批次上限查询 + 覆盖标志
// 输出: ValidationOutcome（违规按行顺序，blocked 每轮重新计算）
// 红线: 纯函数，不写库、不保留跨轮次状态；查询失败降级为“未知上限”
// ==========================================

use crate::domain::types::{BatchLimit, ViolationReason};
use crate::domain::validation::{LineItem, ValidationOutcome, ValidationViolation};
use crate::engine::batch_size_lookup::BatchSizeLookup;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// 默认并发查询数
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;

// ==========================================
// BatchQuantityValidator - 批次数量校验器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchQuantityValidator;

impl BatchQuantityValidator {
    pub fn new() -> Self {
        Self
    }

    /// 校验一组行项目（同步查询）
    ///
    /// # 参数
    /// - lines: 行项目（按单据顺序）
    /// - lookup: 批次上限查询，返回 None 表示未知
    /// - override_enabled: 本次保存是否显式允许超批次
    ///
    /// # 说明
    /// - 同一轮内每个批次号最多查询一次
    #[instrument(skip(self, lines, lookup), fields(lines = lines.len()))]
    pub fn validate<F>(
        &self,
        lines: &[LineItem],
        mut lookup: F,
        override_enabled: bool,
    ) -> ValidationOutcome
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let mut memo: HashMap<String, BatchLimit> = HashMap::new();
        self.decide(
            lines,
            |batch_no| {
                *memo
                    .entry(batch_no.to_string())
                    .or_insert_with(|| BatchLimit::from_raw(lookup(batch_no)))
            },
            override_enabled,
        )
    }

    /// 校验一组行项目（异步查询，扇出）
    ///
    /// # 说明
    /// - 先收集需要查询的不同批次号，并发查询（上限 concurrency），全部完成后再判定
    /// - 查询失败的批次按“未知上限”处理，不中断本轮
    /// - 完成顺序不影响结果
    #[instrument(skip(self, lines, lookup), fields(lines = lines.len()))]
    pub async fn validate_with_lookup<L>(
        &self,
        lines: &[LineItem],
        lookup: &L,
        override_enabled: bool,
        concurrency: usize,
    ) -> ValidationOutcome
    where
        L: BatchSizeLookup + ?Sized,
    {
        let pending = batches_needing_lookup(lines);
        tracing::debug!(distinct_batches = pending.len(), "开始查询批次上限");

        let resolved: HashMap<String, BatchLimit> = stream::iter(pending)
            .map(|batch_no| async move {
                let result = lookup.batch_size(&batch_no).await;
                (batch_no, result)
            })
            .buffer_unordered(concurrency.max(1))
            .map(|(batch_no, result)| match result {
                Ok(raw) => {
                    let limit = BatchLimit::from_raw(raw);
                    (batch_no, limit)
                }
                Err(e) => {
                    tracing::warn!(batch_no = %batch_no, error = %e, "批次上限查询失败，按未知处理");
                    (batch_no, BatchLimit::Unknown)
                }
            })
            .collect()
            .await;

        self.decide(
            lines,
            |batch_no| resolved.get(batch_no).copied().unwrap_or(BatchLimit::Unknown),
            override_enabled,
        )
    }

    /// 单行校验（字段变更时使用）
    pub fn check_line<F>(&self, line: &LineItem, lookup: F, override_enabled: bool) -> ValidationOutcome
    where
        F: FnMut(&str) -> Option<f64>,
    {
        self.validate(std::slice::from_ref(line), lookup, override_enabled)
    }

    /// 单行校验（异步查询）
    pub async fn check_line_with_lookup<L>(
        &self,
        line: &LineItem,
        lookup: &L,
        override_enabled: bool,
    ) -> ValidationOutcome
    where
        L: BatchSizeLookup + ?Sized,
    {
        self.validate_with_lookup(std::slice::from_ref(line), lookup, override_enabled, 1)
            .await
    }

    fn decide<R>(&self, lines: &[LineItem], mut resolve: R, override_enabled: bool) -> ValidationOutcome
    where
        R: FnMut(&str) -> BatchLimit,
    {
        let violations: Vec<ValidationViolation> = lines
            .iter()
            .filter_map(|line| evaluate_line(line, &mut resolve))
            .collect();

        let outcome = ValidationOutcome::from_violations(violations, override_enabled);
        if outcome.blocked {
            tracing::info!(violations = outcome.violations.len(), "批次数量校验阻断保存");
        }
        outcome
    }
}

/// 单行判定
///
/// 1. 无批次 → 跳过
/// 2. 数量 <= 0 → 跳过
/// 3. 上限 = 行显式上限(正数) 或 批次配置
/// 4. 上限未知 → LimitUnavailable；数量 > 上限 → QuantityExceedsLimit（相等不算）
fn evaluate_line<R>(line: &LineItem, resolve: &mut R) -> Option<ValidationViolation>
where
    R: FnMut(&str) -> BatchLimit,
{
    let batch_no = line.batch()?;
    if !line.has_meaningful_qty() {
        return None;
    }

    let limit = match line.usable_explicit_limit() {
        Some(v) => BatchLimit::Known(v),
        None => resolve(batch_no),
    };

    let reason = match limit {
        BatchLimit::Unknown => ViolationReason::LimitUnavailable,
        BatchLimit::Known(v) if line.qty > v => ViolationReason::QuantityExceedsLimit,
        BatchLimit::Known(_) => return None,
    };

    tracing::debug!(
        index = line.index,
        batch_no = batch_no,
        qty = line.qty,
        limit = %limit,
        reason = %reason,
        "批次数量违规"
    );

    Some(ValidationViolation {
        index: line.index,
        item_code: line.item_code.clone(),
        batch_no: batch_no.to_string(),
        qty: line.qty,
        limit,
        reason,
    })
}

/// 需要查询上限的不同批次号（按首次出现顺序）
fn batches_needing_lookup(lines: &[LineItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .filter(|line| line.has_meaningful_qty() && line.usable_explicit_limit().is_none())
        .filter_map(|line| line.batch())
        .filter(|batch_no| seen.insert(batch_no.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::batch_size_lookup::InMemoryBatchSizeLookup;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn line(index: usize, batch: Option<&str>, qty: f64) -> LineItem {
        let l = LineItem::new(index, format!("ITEM-{}", index), qty);
        match batch {
            Some(b) => l.with_batch(b),
            None => l,
        }
    }

    fn sizes(pairs: &[(&str, f64)]) -> impl FnMut(&str) -> Option<f64> {
        let map: HashMap<String, f64> = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        move |b| map.get(b).copied()
    }

    // ==========================================
    // 典型场景
    // ==========================================

    #[test]
    fn test_exceeds_limit_blocks() {
        let v = BatchQuantityValidator::new();
        let outcome = v.validate(&[line(1, Some("B1"), 120.0)], sizes(&[("B1", 100.0)]), false);

        assert!(outcome.blocked);
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].reason, ViolationReason::QuantityExceedsLimit);
        assert_eq!(outcome.violations[0].limit, BatchLimit::Known(100.0));
    }

    #[test]
    fn test_override_keeps_violations_but_unblocks() {
        let v = BatchQuantityValidator::new();
        let lines = [line(1, Some("B1"), 120.0)];
        let blocked = v.validate(&lines, sizes(&[("B1", 100.0)]), false);
        let overridden = v.validate(&lines, sizes(&[("B1", 100.0)]), true);

        assert!(!overridden.blocked);
        assert_eq!(overridden.violations, blocked.violations);
    }

    #[test]
    fn test_unknown_limit_reported() {
        let v = BatchQuantityValidator::new();
        let outcome = v.validate(&[line(1, Some("B2"), 5.0)], sizes(&[]), false);

        assert!(outcome.blocked);
        assert_eq!(outcome.violations[0].reason, ViolationReason::LimitUnavailable);
        assert_eq!(outcome.violations[0].limit, BatchLimit::Unknown);
    }

    #[test]
    fn test_no_batch_never_violates() {
        let v = BatchQuantityValidator::new();
        let outcome = v.validate(&[line(1, None, 999.0), line(2, None, -1.0)], sizes(&[]), false);
        assert!(outcome.is_clean());
        assert!(!outcome.blocked);
    }

    #[test]
    fn test_equal_is_not_exceeding() {
        let v = BatchQuantityValidator::new();
        let outcome = v.validate(&[line(1, Some("B1"), 100.0)], sizes(&[("B1", 100.0)]), false);
        assert!(outcome.is_clean());
        assert!(!outcome.blocked);
    }

    #[test]
    fn test_empty_lines() {
        let v = BatchQuantityValidator::new();
        let outcome = v.validate(&[], sizes(&[]), false);
        assert!(outcome.is_clean());
        assert!(!outcome.blocked);
    }

    // ==========================================
    // 边界规则
    // ==========================================

    #[test]
    fn test_zero_or_negative_qty_skipped() {
        let v = BatchQuantityValidator::new();
        let outcome = v.validate(
            &[line(1, Some("B2"), 0.0), line(2, Some("B2"), -3.0)],
            sizes(&[]),
            false,
        );
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_non_positive_limit_is_unknown() {
        let v = BatchQuantityValidator::new();
        let outcome = v.validate(
            &[line(1, Some("B0"), 1.0), line(2, Some("BN"), 1.0)],
            sizes(&[("B0", 0.0), ("BN", -10.0)]),
            false,
        );
        assert_eq!(outcome.violations.len(), 2);
        assert!(outcome
            .violations
            .iter()
            .all(|v| v.reason == ViolationReason::LimitUnavailable));
    }

    #[test]
    fn test_explicit_limit_takes_precedence() {
        let v = BatchQuantityValidator::new();
        let lines = [
            line(1, Some("B1"), 60.0).with_explicit_limit(50.0),
            line(2, Some("B1"), 60.0).with_explicit_limit(0.0),
        ];
        let outcome = v.validate(&lines, sizes(&[("B1", 100.0)]), false);

        // 第1行: 显式上限50 → 超限；第2行: 显式0无效，回退批次100 → 通过
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].index, 1);
        assert_eq!(outcome.violations[0].limit, BatchLimit::Known(50.0));
    }

    #[test]
    fn test_violations_keep_line_order() {
        let v = BatchQuantityValidator::new();
        let lines = [
            line(3, Some("B3"), 5.0),
            line(1, Some("B1"), 150.0),
            line(2, None, 10.0),
            line(4, Some("B1"), 101.0),
        ];
        let outcome = v.validate(&lines, sizes(&[("B1", 100.0)]), false);
        let indexes: Vec<usize> = outcome.violations.iter().map(|v| v.index).collect();
        assert_eq!(indexes, vec![3, 1, 4]);
    }

    #[test]
    fn test_lookup_memoized_per_pass() {
        let v = BatchQuantityValidator::new();
        let mut calls = 0;
        let lines = [
            line(1, Some("B1"), 10.0),
            line(2, Some("B1"), 20.0),
            line(3, Some("B2"), 30.0),
        ];
        v.validate(
            &lines,
            |_b| {
                calls += 1;
                Some(100.0)
            },
            false,
        );
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_idempotent() {
        let v = BatchQuantityValidator::new();
        let lines = [line(1, Some("B1"), 120.0), line(2, Some("B2"), 1.0)];
        let a = v.validate(&lines, sizes(&[("B1", 100.0)]), false);
        let b = v.validate(&lines, sizes(&[("B1", 100.0)]), false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_check_line_single_row() {
        let v = BatchQuantityValidator::new();
        let outcome = v.check_line(&line(1, Some("B1"), 120.0), sizes(&[("B1", 100.0)]), false);
        assert_eq!(outcome.violations.len(), 1);
        assert!(outcome.blocked);
    }

    // ==========================================
    // 异步查询
    // ==========================================

    struct CountingLookup {
        inner: InMemoryBatchSizeLookup,
        failing: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BatchSizeLookup for CountingLookup {
        async fn batch_size(&self, batch_no: &str) -> RepositoryResult<Option<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if batch_no == self.failing {
                return Err(RepositoryError::DatabaseQueryError("connection reset".to_string()));
            }
            self.inner.batch_size(batch_no).await
        }
    }

    #[tokio::test]
    async fn test_async_failure_degrades_to_unknown() {
        let lookup = CountingLookup {
            inner: [("B1", 100.0), ("B2", 50.0)].into_iter().collect(),
            failing: "B2",
            calls: AtomicUsize::new(0),
        };
        let lines = [
            line(1, Some("B1"), 120.0),
            line(2, Some("B2"), 10.0),
            line(3, Some("B1"), 90.0),
            line(4, Some("B1"), 100.0),
        ];

        let outcome = BatchQuantityValidator::new()
            .validate_with_lookup(&lines, &lookup, false, 4)
            .await;

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.violations.len(), 2);
        assert_eq!(outcome.violations[0].index, 1);
        assert_eq!(outcome.violations[0].reason, ViolationReason::QuantityExceedsLimit);
        assert_eq!(outcome.violations[1].index, 2);
        assert_eq!(outcome.violations[1].reason, ViolationReason::LimitUnavailable);
        assert!(outcome.blocked);
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let lookup: InMemoryBatchSizeLookup = [("B1", 100.0), ("B3", 5.0)].into_iter().collect();
        let lines = [
            line(1, Some("B1"), 120.0),
            line(2, Some("B2"), 1.0),
            line(3, Some("B3"), 5.0),
            line(4, None, 7.0),
        ];
        let v = BatchQuantityValidator::new();

        let async_outcome = v.validate_with_lookup(&lines, &lookup, true, 1).await;
        let sync_outcome = v.validate(&lines, |b| lookup.get(b), true);
        assert_eq!(async_outcome, sync_outcome);
        assert!(!async_outcome.blocked);
    }

    #[tokio::test]
    async fn test_explicit_limit_skips_lookup() {
        let lookup = CountingLookup {
            inner: InMemoryBatchSizeLookup::new(),
            failing: "",
            calls: AtomicUsize::new(0),
        };
        let lines = [line(1, Some("B1"), 10.0).with_explicit_limit(20.0)];

        let outcome = BatchQuantityValidator::new()
            .validate_with_lookup(&lines, &lookup, false, DEFAULT_LOOKUP_CONCURRENCY)
            .await;
        assert!(outcome.is_clean());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }
}

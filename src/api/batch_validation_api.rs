// ==========================================
// 销售批次守护 - 批次校验 API
// ==========================================
// 职责: 保存/字段变更/提交/取消时的批次校验入口
// 红线: 阻断时必须返回完整违规列表；覆盖重试后同一批行项目必须放行
// ==========================================

use std::error::Error;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::BatchValidationConfigReader;
use crate::domain::batch::BatchDates;
use crate::domain::document::{AvailabilityShortage, SalesDocument, WorkOrder};
use crate::domain::validation::{LineItem, ValidationOutcome};
use crate::engine::batch_availability::{BatchAvailabilityChecker, StockMovement};
use crate::engine::batch_quantity::BatchQuantityValidator;
use crate::repository::batch_repo::BatchRepository;

// ==========================================
// BatchValidationApi - 批次校验API
// ==========================================
pub struct BatchValidationApi<C>
where
    C: BatchValidationConfigReader,
{
    batch_repo: Arc<BatchRepository>,
    config: Arc<C>,
    validator: BatchQuantityValidator,
}

impl<C> BatchValidationApi<C>
where
    C: BatchValidationConfigReader,
{
    /// 创建新的BatchValidationApi实例
    pub fn new(batch_repo: Arc<BatchRepository>, config: Arc<C>) -> Self {
        Self {
            batch_repo,
            config,
            validator: BatchQuantityValidator::new(),
        }
    }

    // ==========================================
    // 批次数量校验
    // ==========================================

    /// 校验销售类单据（保存前）
    ///
    /// # 参数
    /// - doc: 单据
    /// - allow_override: 本次显式允许超批次（与单据上的 allow_batch_exceed 取或）
    ///
    /// # 返回
    /// - Ok(ValidationOutcome): 未阻断（可能因覆盖而带有违规）
    /// - Err(ApiError::BatchQuantityBlocked): 阻断保存，携带完整违规列表
    pub async fn validate_sales_document(
        &self,
        doc: &SalesDocument,
        allow_override: bool,
    ) -> ApiResult<ValidationOutcome> {
        let lines = doc.line_items();
        let override_enabled = allow_override || doc.allow_batch_exceed;
        let outcome = self.run_validation(&lines, override_enabled).await?;
        self.finish(&doc.name, outcome)
    }

    /// 校验生产工单（保存前，单行）
    pub async fn validate_work_order(
        &self,
        order: &WorkOrder,
        allow_override: bool,
    ) -> ApiResult<ValidationOutcome> {
        let line = order.to_line_item();
        let override_enabled = allow_override || order.allow_batch_exceed;
        let outcome = self
            .validator
            .check_line_with_lookup(&line, self.batch_repo.as_ref(), override_enabled)
            .await;
        self.finish(&order.name, outcome)
    }

    /// 单行校验（数量/批次字段变更时提示用，不阻断）
    pub async fn check_line(
        &self,
        line: &LineItem,
        allow_override: bool,
    ) -> ApiResult<ValidationOutcome> {
        Ok(self
            .validator
            .check_line_with_lookup(line, self.batch_repo.as_ref(), allow_override)
            .await)
    }

    async fn run_validation(
        &self,
        lines: &[LineItem],
        override_enabled: bool,
    ) -> ApiResult<ValidationOutcome> {
        let concurrency = self
            .config
            .get_lookup_concurrency()
            .await
            .map_err(config_error)?;

        Ok(self
            .validator
            .validate_with_lookup(lines, self.batch_repo.as_ref(), override_enabled, concurrency)
            .await)
    }

    fn finish(&self, document: &str, outcome: ValidationOutcome) -> ApiResult<ValidationOutcome> {
        if outcome.blocked {
            return Err(ApiError::BatchQuantityBlocked {
                reason: format!("单据{}存在批次数量违规（{}）", document, outcome.summary()),
                violations: outcome.violations,
            });
        }

        if outcome.override_applied() {
            tracing::warn!(
                document = document,
                violations = outcome.violations.len(),
                "Override used: 超批次数量放行"
            );
        }
        Ok(outcome)
    }

    // ==========================================
    // 批次可用量
    // ==========================================

    /// 校验批次可用量（提交前）
    ///
    /// # 返回
    /// - Ok(Vec<AvailabilityShortage>): 短缺清单（未启用强制时仅报告）
    /// - Err(ApiError::InsufficientBatchAvailability): 启用强制且存在短缺
    pub async fn check_available_qty(
        &self,
        doc: &SalesDocument,
    ) -> ApiResult<Vec<AvailabilityShortage>> {
        let checker = self.availability_checker().await?;
        let requested = checker.requested_by_batch(doc);
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let batch_ids: Vec<String> = requested.iter().map(|(b, _)| b.clone()).collect();
        let available = self.batch_repo.find_available_qty_many(&batch_ids)?;
        let shortages = checker.find_shortages(&requested, &available);

        if shortages.is_empty() {
            return Ok(shortages);
        }

        let enforce = self
            .config
            .get_enforce_availability()
            .await
            .map_err(config_error)?;
        if enforce {
            return Err(ApiError::InsufficientBatchAvailability {
                reason: format!("单据{}有{}个批次可用量不足", doc.name, shortages.len()),
                shortages,
            });
        }

        for s in &shortages {
            tracing::warn!(
                document = %doc.name,
                batch_no = %s.batch_no,
                requested = s.requested,
                available = s.available,
                "批次可用量不足（仅报告）"
            );
        }
        Ok(shortages)
    }

    /// 提交时扣减批次可用量
    ///
    /// # 返回
    /// - 更新的行数（不影响库存的单据为0）
    pub async fn consume_available_qty(&self, doc: &SalesDocument) -> ApiResult<usize> {
        self.apply_movement(doc, StockMovement::Consume).await
    }

    /// 取消时回补批次可用量
    pub async fn revert_available_qty(&self, doc: &SalesDocument) -> ApiResult<usize> {
        self.apply_movement(doc, StockMovement::Revert).await
    }

    async fn apply_movement(&self, doc: &SalesDocument, movement: StockMovement) -> ApiResult<usize> {
        let checker = self.availability_checker().await?;
        let deltas = checker.stock_deltas(doc, movement);
        if deltas.is_empty() {
            return Ok(0);
        }

        let updated = self.batch_repo.apply_available_qty_deltas(&deltas)?;
        tracing::info!(
            document = %doc.name,
            movement = ?movement,
            rows = deltas.len(),
            updated = updated,
            "批次可用量已更新"
        );
        Ok(updated)
    }

    async fn availability_checker(&self) -> ApiResult<BatchAvailabilityChecker> {
        let tolerance = self
            .config
            .get_availability_tolerance()
            .await
            .map_err(config_error)?;
        Ok(BatchAvailabilityChecker::new(tolerance))
    }

    // ==========================================
    // 批次日期
    // ==========================================

    /// 查询批次的生产/失效日期（选择批次后自动带出）
    ///
    /// 未指定批次或批次不存在时返回空日期
    pub fn batch_dates(&self, batch_no: Option<&str>) -> ApiResult<BatchDates> {
        let batch_no = match batch_no.map(str::trim).filter(|b| !b.is_empty()) {
            Some(b) => b,
            None => return Ok(BatchDates::default()),
        };

        Ok(self
            .batch_repo
            .find_by_id(batch_no)?
            .map(|b| b.dates())
            .unwrap_or_default())
    }
}

fn config_error(e: Box<dyn Error + Send + Sync>) -> ApiError {
    ApiError::InternalError(format!("配置读取失败: {}", e))
}

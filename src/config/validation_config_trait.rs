// ==========================================
// 销售批次守护 - 校验配置读取 Trait
// ==========================================
// 职责: 定义校验/可用量模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// BatchValidationConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait BatchValidationConfigReader: Send + Sync {
    /// 批次上限查询并发数
    ///
    /// # 默认值
    /// - 8（小于1时回退默认值）
    async fn get_lookup_concurrency(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 可用量不足时是否阻断
    ///
    /// # 默认值
    /// - false（仅报告）
    async fn get_enforce_availability(&self) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// 可用量比较容差
    ///
    /// # 默认值
    /// - 1e-9
    async fn get_availability_tolerance(&self) -> Result<f64, Box<dyn Error + Send + Sync>>;
}

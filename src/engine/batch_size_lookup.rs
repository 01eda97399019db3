// ==========================================
// 销售批次守护 - 批次上限查询接口
// ==========================================
// 职责: 定义校验引擎所需的批次上限查询接口（上游协作者）
// 实现者: BatchRepository（batch 表）、InMemoryBatchSizeLookup（内存表）
// 红线: 只读查询，不含校验逻辑
// ==========================================

use crate::repository::batch_repo::BatchRepository;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashMap;

// ==========================================
// BatchSizeLookup Trait
// ==========================================
#[async_trait]
pub trait BatchSizeLookup: Send + Sync {
    /// 查询批次配置的最大数量
    ///
    /// # 返回
    /// - Ok(Some(v)): 已配置（是否可用由引擎归一化判断）
    /// - Ok(None): 批次不存在或未配置
    /// - Err: 查询失败（引擎按“未知上限”处理）
    async fn batch_size(&self, batch_no: &str) -> RepositoryResult<Option<f64>>;
}

#[async_trait]
impl BatchSizeLookup for BatchRepository {
    async fn batch_size(&self, batch_no: &str) -> RepositoryResult<Option<f64>> {
        self.find_batch_size(batch_no)
    }
}

// ==========================================
// InMemoryBatchSizeLookup - 内存批次表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct InMemoryBatchSizeLookup {
    sizes: HashMap<String, Option<f64>>,
}

impl InMemoryBatchSizeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, batch_no: impl Into<String>, size: Option<f64>) {
        self.sizes.insert(batch_no.into(), size);
    }

    /// 直接查询（同步版本，供闭包式校验使用）
    pub fn get(&self, batch_no: &str) -> Option<f64> {
        self.sizes.get(batch_no).copied().flatten()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for InMemoryBatchSizeLookup {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let sizes = iter
            .into_iter()
            .map(|(k, v)| (k.into(), Some(v)))
            .collect();
        Self { sizes }
    }
}

#[async_trait]
impl BatchSizeLookup for InMemoryBatchSizeLookup {
    async fn batch_size(&self, batch_no: &str) -> RepositoryResult<Option<f64>> {
        Ok(self.get(batch_no))
    }
}

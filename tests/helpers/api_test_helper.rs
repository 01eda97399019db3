// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用环境
// ==========================================
#![allow(dead_code)]

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;
use tempfile::NamedTempFile;

use sales_batch_guard::api::BatchValidationApi;
use sales_batch_guard::config::ConfigManager;
use sales_batch_guard::repository::BatchRepository;

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 使用临时文件数据库，预置标准批次
pub struct ApiTestEnv {
    pub db_path: String,
    pub api: BatchValidationApi<ConfigManager>,
    pub batch_repo: Arc<BatchRepository>,
    pub config: Arc<ConfigManager>,
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建测试环境（已写入标准批次）
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let (temp_file, db_path) = test_helpers::create_test_db()?;
        {
            let conn = test_helpers::open_test_connection(&db_path)?;
            test_helpers::insert_standard_batches(&conn)?;
        }

        let batch_repo = Arc::new(BatchRepository::new(&db_path)?);
        let config = Arc::new(ConfigManager::new(&db_path).map_err(|e| e.to_string())?);
        let api = BatchValidationApi::new(batch_repo.clone(), config.clone());

        Ok(Self {
            db_path,
            api,
            batch_repo,
            config,
            _temp_file: temp_file,
        })
    }

    /// 写入配置
    pub fn set_config(&self, key: &str, value: &str) {
        self.config
            .set_global_config_value(key, value)
            .expect("写入配置失败");
    }

    /// 查询批次当前可用量
    pub fn available_qty(&self, batch_id: &str) -> Option<f64> {
        self.batch_repo
            .find_by_id(batch_id)
            .expect("查询批次失败")
            .and_then(|b| b.available_batch_qty)
    }
}

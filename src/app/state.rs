// ==========================================
// 销售批次守护 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接与API实例
// ==========================================

use std::error::Error;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::BatchValidationApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::BatchImporter;
use crate::repository::batch_repo::BatchRepository;

/// 应用状态
///
/// 所有组件共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 批次仓储
    pub batch_repo: Arc<BatchRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 批次校验API
    pub batch_validation_api: Arc<BatchValidationApi<ConfigManager>>,

    /// 批次导入器
    pub batch_importer: Arc<BatchImporter>,
}

impl AppState {
    /// 创建新的AppState实例（打开数据库并幂等建表）
    pub fn new(db_path: String) -> Result<Self, Box<dyn Error + Send + Sync>> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)?;
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        Self::from_connection(db_path, conn)
    }

    /// 从已有连接创建（连接需已建表）
    pub fn from_connection(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let batch_repo = Arc::new(BatchRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn)?);
        let batch_validation_api = Arc::new(BatchValidationApi::new(
            batch_repo.clone(),
            config_manager.clone(),
        ));
        let batch_importer = Arc::new(BatchImporter::new(batch_repo.clone()));

        Ok(Self {
            db_path,
            batch_repo,
            config_manager,
            batch_validation_api,
            batch_importer,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先环境变量 SALES_BATCH_GUARD_DB_PATH；否则使用用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("SALES_BATCH_GUARD_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./sales_batch_guard.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("sales-batch-guard");
        // 确保目录存在
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("sales_batch_guard.db");
        }
    }

    path.to_string_lossy().to_string()
}

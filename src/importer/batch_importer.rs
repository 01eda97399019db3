// ==========================================
// 销售批次守护 - 批次主数据导入器
// ==========================================
// 支持: CSV
// 表头: batch_id,item_code,batch_size,available_batch_qty,manufacturing_date,expiry_date
// 规则: 单行失败不影响其它行；合法行在单个事务内 upsert，写库失败整体回滚
// ==========================================

use crate::domain::batch::Batch;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvParser, RawRecord};
use crate::repository::batch_repo::BatchRepository;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// 单行导入失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}

/// 导入结果汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchImportSummary {
    pub imported: usize,
    pub failed: Vec<ImportRowError>,
}

// ==========================================
// BatchImporter
// ==========================================
pub struct BatchImporter {
    batch_repo: Arc<BatchRepository>,
    parser: CsvParser,
}

impl BatchImporter {
    pub fn new(batch_repo: Arc<BatchRepository>) -> Self {
        Self {
            batch_repo,
            parser: CsvParser,
        }
    }

    /// 导入 CSV 文件
    #[instrument(skip(self, file_path), fields(path = %file_path.display()))]
    pub fn import_file(&self, file_path: &Path) -> ImportResult<BatchImportSummary> {
        let records = self.parser.parse_file(file_path)?;
        self.import_records(records)
    }

    /// 从 Reader 导入（首行为表头）
    pub fn import_reader<R: Read>(&self, reader: R) -> ImportResult<BatchImportSummary> {
        let records = self.parser.parse_reader(reader)?;
        self.import_records(records)
    }

    fn import_records(&self, records: Vec<RawRecord>) -> ImportResult<BatchImportSummary> {
        let mut batches = Vec::with_capacity(records.len());
        let mut failed = Vec::new();

        for (row, record) in records {
            match map_record(row, &record) {
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    tracing::warn!(row = row, error = %e, "批次行导入失败");
                    failed.push(ImportRowError {
                        row,
                        message: e.to_string(),
                    });
                }
            }
        }

        // 合法行在同一事务内写入
        let imported = self.batch_repo.upsert_many(&batches)?;

        tracing::info!(imported = imported, failed = failed.len(), "批次导入完成");
        Ok(BatchImportSummary { imported, failed })
    }
}

/// 原始记录 → Batch
fn map_record(row: usize, record: &HashMap<String, String>) -> ImportResult<Batch> {
    let batch_id = field(record, "batch_id").ok_or(ImportError::PrimaryKeyMissing(row))?;

    Ok(Batch {
        batch_id: batch_id.to_string(),
        item_code: field(record, "item_code").map(str::to_string),
        batch_size: parse_number(row, record, "batch_size")?,
        available_batch_qty: parse_number(row, record, "available_batch_qty")?,
        manufacturing_date: parse_date(row, record, "manufacturing_date")?,
        expiry_date: parse_date(row, record, "expiry_date")?,
    })
}

fn field<'a>(record: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    record
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn parse_number(
    row: usize,
    record: &HashMap<String, String>,
    name: &str,
) -> ImportResult<Option<f64>> {
    match field(record, name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ImportError::TypeConversionError {
                row,
                field: name.to_string(),
                message: format!("无法解析为数字: {}", raw),
            }),
    }
}

fn parse_date(
    row: usize,
    record: &HashMap<String, String>,
    name: &str,
) -> ImportResult<Option<NaiveDate>> {
    match field(record, name) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ImportError::DateFormatError {
                row,
                field: name.to_string(),
                value: raw.to_string(),
            }),
    }
}

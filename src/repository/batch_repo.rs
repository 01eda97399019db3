// ==========================================
// 销售批次守护 - 批次主数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对齐: batch 表
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::batch::Batch;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const BATCH_COLUMNS: &str = r#"
    batch_id, item_code, batch_size, available_batch_qty,
    manufacturing_date, expiry_date
"#;

const UPSERT_SQL: &str = r#"
    INSERT INTO batch (
        batch_id, item_code, batch_size, available_batch_qty,
        manufacturing_date, expiry_date, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
    ON CONFLICT(batch_id) DO UPDATE SET
        item_code = excluded.item_code,
        batch_size = excluded.batch_size,
        available_batch_qty = excluded.available_batch_qty,
        manufacturing_date = excluded.manufacturing_date,
        expiry_date = excluded.expiry_date,
        updated_at = excluded.updated_at
"#;

// ==========================================
// BatchRepository - 批次仓储
// ==========================================
/// 批次仓储
/// 职责: 管理 batch 表的读写
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    /// 创建新的 BatchRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量新增或覆盖批次（单个事务，失败时整体回滚）
    ///
    /// # 返回
    /// - 写入的批次数
    pub fn upsert_many(&self, batches: &[Batch]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for batch in batches {
                stmt.execute(params![
                    batch.batch_id,
                    batch.item_code,
                    batch.batch_size,
                    batch.available_batch_qty,
                    batch.manufacturing_date.map(|d| d.to_string()),
                    batch.expiry_date.map(|d| d.to_string()),
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(batches.len())
    }

    /// 按批次号查询
    ///
    /// # 返回
    /// - Ok(Some(Batch)): 找到批次
    /// - Ok(None): 未找到
    /// - Err: 数据库错误
    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM batch WHERE batch_id = ?1", BATCH_COLUMNS);
        let batch = conn
            .query_row(&sql, params![batch_id], map_batch_row)
            .optional()?;
        Ok(batch)
    }

    /// 查询批次的 batch_size 原始值（批次不存在或未配置时为 None）
    pub fn find_batch_size(&self, batch_id: &str) -> RepositoryResult<Option<f64>> {
        let conn = self.get_conn()?;
        let size: Option<Option<f64>> = conn
            .query_row(
                "SELECT batch_size FROM batch WHERE batch_id = ?1",
                params![batch_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(size.flatten())
    }

    /// 批量查询可用数量
    ///
    /// # 返回
    /// - HashMap<batch_id, available_batch_qty>，NULL 按 0；不存在的批次不在结果中
    pub fn find_available_qty_many(
        &self,
        batch_ids: &[String],
    ) -> RepositoryResult<HashMap<String, f64>> {
        if batch_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = (1..=batch_ids.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT batch_id, COALESCE(available_batch_qty, 0) FROM batch WHERE batch_id IN ({})",
            placeholders
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(batch_ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut result = HashMap::new();
        for row in rows {
            let (batch_id, avail) = row?;
            result.insert(batch_id, avail);
        }
        Ok(result)
    }

    /// 在单个事务内累加可用数量
    ///
    /// # 参数
    /// - deltas: (batch_id, delta) 列表，提交为负、取消为正
    ///
    /// # 返回
    /// - 实际更新的行数
    pub fn apply_available_qty_deltas(&self, deltas: &[(String, f64)]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut updated = 0;
        let mut missing: Vec<&str> = Vec::new();
        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE batch
                SET available_batch_qty = COALESCE(available_batch_qty, 0) + ?1,
                    updated_at = datetime('now')
                WHERE batch_id = ?2
                "#,
            )?;
            for (batch_id, delta) in deltas {
                match stmt.execute(params![delta, batch_id])? {
                    0 => missing.push(batch_id.as_str()),
                    n => updated += n,
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, "批次不存在，可用量未更新");
        }
        Ok(updated)
    }

    /// 查询全部批次（按批次号排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM batch ORDER BY batch_id", BATCH_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map([], map_batch_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

fn map_batch_row(row: &Row<'_>) -> rusqlite::Result<Batch> {
    Ok(Batch {
        batch_id: row.get(0)?,
        item_code: row.get(1)?,
        batch_size: row.get(2)?,
        available_batch_qty: row.get(3)?,
        manufacturing_date: parse_date(row.get(4)?),
        expiry_date: parse_date(row.get(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup_repo() -> BatchRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        BatchRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn sample_batch(id: &str, size: Option<f64>, avail: Option<f64>) -> Batch {
        Batch {
            batch_id: id.to_string(),
            item_code: Some("ITEM-A".to_string()),
            batch_size: size,
            available_batch_qty: avail,
            manufacturing_date: NaiveDate::from_ymd_opt(2026, 1, 5),
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 5),
        }
    }

    #[test]
    fn test_upsert_and_find() {
        let repo = setup_repo();
        repo.upsert_many(&[sample_batch("B1", Some(100.0), Some(40.0))]).unwrap();

        let found = repo.find_by_id("B1").unwrap().unwrap();
        assert_eq!(found.batch_size, Some(100.0));
        assert_eq!(found.expiry_date, NaiveDate::from_ymd_opt(2027, 1, 5));

        // 覆盖
        repo.upsert_many(&[sample_batch("B1", Some(150.0), None)]).unwrap();
        let found = repo.find_by_id("B1").unwrap().unwrap();
        assert_eq!(found.batch_size, Some(150.0));
        assert_eq!(found.available_batch_qty, None);

        assert!(repo.find_by_id("B404").unwrap().is_none());
    }

    #[test]
    fn test_find_batch_size_null_and_missing() {
        let repo = setup_repo();
        repo.upsert_many(&[sample_batch("B1", None, None)]).unwrap();

        assert_eq!(repo.find_batch_size("B1").unwrap(), None);
        assert_eq!(repo.find_batch_size("B404").unwrap(), None);
    }

    #[test]
    fn test_available_qty_many_and_deltas() {
        let repo = setup_repo();
        repo.upsert_many(&[
            sample_batch("B1", Some(100.0), Some(40.0)),
            sample_batch("B2", Some(100.0), None),
        ])
        .unwrap();

        let ids = vec!["B1".to_string(), "B2".to_string(), "B404".to_string()];
        let avail = repo.find_available_qty_many(&ids).unwrap();
        assert_eq!(avail.get("B1"), Some(&40.0));
        assert_eq!(avail.get("B2"), Some(&0.0));
        assert!(!avail.contains_key("B404"));

        let updated = repo
            .apply_available_qty_deltas(&[("B1".to_string(), -15.0), ("B404".to_string(), -1.0)])
            .unwrap();
        assert_eq!(updated, 1);
        let avail = repo.find_available_qty_many(&ids).unwrap();
        assert_eq!(avail.get("B1"), Some(&25.0));
    }

    #[test]
    fn test_upsert_many_rolls_back_on_failure() {
        let repo = setup_repo();
        repo.get_conn()
            .unwrap()
            .execute_batch(
                r#"
                CREATE TRIGGER reject_b2 BEFORE INSERT ON batch
                WHEN NEW.batch_id = 'B2'
                BEGIN SELECT RAISE(ABORT, 'rejected'); END;
                "#,
            )
            .unwrap();

        let result = repo.upsert_many(&[
            sample_batch("B1", Some(10.0), None),
            sample_batch("B2", Some(20.0), None),
            sample_batch("B3", Some(30.0), None),
        ]);

        assert!(matches!(result, Err(RepositoryError::WriteRejected(_))));
        assert!(repo.list_all().unwrap().is_empty());
    }
}

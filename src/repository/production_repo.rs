// ==========================================
// 成衣产线排产系统 - 生产记录数据仓储
// ==========================================
// 红线: 只追加，不提供修改接口
// ==========================================

use crate::domain::production::{NewProductionEntry, ProcessTotals, ProductionEntry};
use crate::domain::types::Process;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{now, parse_enum_column};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const ENTRY_COLUMNS: &str = "entry_id, entry_date, style_id, line_id, process, quantity, \
                             efficiency, defects, delay_reason, remarks, created_at";

// ==========================================
// ProductionEntryRepository - 生产记录仓储
// ==========================================
pub struct ProductionEntryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionEntryRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加生产记录
    pub fn insert(&self, new_entry: &NewProductionEntry) -> RepositoryResult<ProductionEntry> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, new_entry)
    }

    /// 在调用方事务内追加生产记录
    pub fn insert_tx(
        conn: &Connection,
        new_entry: &NewProductionEntry,
    ) -> RepositoryResult<ProductionEntry> {
        new_entry
            .validate()
            .map_err(RepositoryError::ValidationError)?;

        let entry = ProductionEntry {
            entry_id: Uuid::new_v4().to_string(),
            date: new_entry.date,
            style_id: new_entry.style_id.clone(),
            line_id: new_entry.line_id.clone(),
            process: new_entry.process,
            quantity: new_entry.quantity,
            efficiency: new_entry.efficiency,
            defects: new_entry.defects,
            delay_reason: new_entry.delay_reason.clone(),
            remarks: new_entry.remarks.clone(),
            created_at: now(),
        };

        conn.execute(
            r#"
            INSERT INTO production_entries (
                entry_id, entry_date, style_id, line_id, process, quantity,
                efficiency, defects, delay_reason, remarks, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                entry.entry_id,
                entry.date,
                entry.style_id,
                entry.line_id,
                entry.process.as_str(),
                entry.quantity,
                entry.efficiency,
                entry.defects,
                entry.delay_reason,
                entry.remarks,
                entry.created_at,
            ],
        )?;

        Ok(entry)
    }

    /// 在调用方事务内判断 日期+款式+产线+工序 的记录是否已存在（导入去重）
    pub fn exists_tx(
        conn: &Connection,
        date: NaiveDate,
        style_id: &str,
        line_id: &str,
        process: Process,
    ) -> RepositoryResult<bool> {
        let found = conn
            .query_row(
                r#"SELECT 1 FROM production_entries
                   WHERE entry_date = ?1 AND style_id = ?2 AND line_id = ?3 AND process = ?4
                   LIMIT 1"#,
                params![date, style_id, line_id, process.as_str()],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    /// 查询款式的全部生产记录
    pub fn find_by_style(&self, style_id: &str) -> RepositoryResult<Vec<ProductionEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_entries WHERE style_id = ?1 ORDER BY entry_date, created_at",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![style_id], Self::map_row)?
            .collect::<Result<Vec<ProductionEntry>, _>>()?;
        Ok(entries)
    }

    /// 查询日期区间内的生产记录（闭区间）
    pub fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<ProductionEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM production_entries
               WHERE entry_date BETWEEN ?1 AND ?2
               ORDER BY entry_date, created_at"#,
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![start, end], Self::map_row)?
            .collect::<Result<Vec<ProductionEntry>, _>>()?;
        Ok(entries)
    }

    /// 按工序汇总款式的累计件数
    pub fn process_totals_by_style(&self, style_id: &str) -> RepositoryResult<ProcessTotals> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT process, COALESCE(SUM(quantity), 0)
               FROM production_entries
               WHERE style_id = ?1
               GROUP BY process"#,
        )?;
        let totals = stmt
            .query_map(params![style_id], |row| {
                let raw: String = row.get(0)?;
                Ok((parse_enum_column::<Process>(0, &raw)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<ProcessTotals, _>>()?;
        Ok(totals)
    }

    fn map_row(row: &Row) -> rusqlite::Result<ProductionEntry> {
        let process: String = row.get(4)?;
        Ok(ProductionEntry {
            entry_id: row.get(0)?,
            date: row.get(1)?,
            style_id: row.get(2)?,
            line_id: row.get(3)?,
            process: parse_enum_column(4, &process)?,
            quantity: row.get(5)?,
            efficiency: row.get(6)?,
            defects: row.get(7)?,
            delay_reason: row.get(8)?,
            remarks: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

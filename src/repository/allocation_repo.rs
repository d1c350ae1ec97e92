// ==========================================
// 成衣产线排产系统 - 产线分配数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（重叠是否拦截由调度器决定）
// 并发: transact() 在持有连接锁的同时开启 IMMEDIATE 事务，
//       “查重叠 + 写入”在同一事务内完成，消除先查后写的竞态
// ==========================================

use crate::domain::line::LineAllocation;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::sync::{Arc, Mutex};

const ALLOCATION_COLUMNS: &str = "allocation_id, line_id, style_id, start_date, end_date, \
                                  planned_quantity, remarks, created_at";

// ==========================================
// LineAllocationRepository - 产线分配仓储
// ==========================================
pub struct LineAllocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LineAllocationRepository {
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

    /// 在 IMMEDIATE 事务内执行闭包
    ///
    /// - 闭包返回 Ok: 提交
    /// - 闭包返回 Err / panic: 事务随 drop 回滚，连接锁随 guard 释放
    pub fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let value = f(&tx)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }

    /// 在调用方事务内插入分配
    pub fn insert_tx(conn: &Connection, allocation: &LineAllocation) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO line_allocations (
                allocation_id, line_id, style_id, start_date, end_date,
                planned_quantity, remarks, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                allocation.allocation_id,
                allocation.line_id,
                allocation.style_id,
                allocation.start_date,
                allocation.end_date,
                allocation.planned_quantity,
                allocation.remarks,
                allocation.created_at,
            ],
        )?;
        Ok(())
    }

    /// 在调用方事务内更新分配的日期/数量/备注
    pub fn update_tx(conn: &Connection, allocation: &LineAllocation) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE line_allocations
            SET start_date = ?1, end_date = ?2, planned_quantity = ?3, remarks = ?4
            WHERE allocation_id = ?5
            "#,
            params![
                allocation.start_date,
                allocation.end_date,
                allocation.planned_quantity,
                allocation.remarks,
                allocation.allocation_id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found(
                "LineAllocation",
                allocation.allocation_id.as_str(),
            ));
        }
        Ok(())
    }

    /// 删除分配（无条件，不影响生产记录）
    pub fn delete(&self, allocation_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM line_allocations WHERE allocation_id = ?1",
            params![allocation_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("LineAllocation", allocation_id));
        }
        Ok(())
    }

    /// 按ID查询分配
    pub fn find_by_id(&self, allocation_id: &str) -> RepositoryResult<Option<LineAllocation>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, allocation_id)
    }

    /// 在调用方事务内按ID查询分配
    pub fn find_by_id_tx(
        conn: &Connection,
        allocation_id: &str,
    ) -> RepositoryResult<Option<LineAllocation>> {
        let sql = format!(
            "SELECT {} FROM line_allocations WHERE allocation_id = ?1",
            ALLOCATION_COLUMNS
        );
        let allocation = conn
            .query_row(&sql, params![allocation_id], Self::map_row)
            .optional()?;
        Ok(allocation)
    }

    /// 查询产线的全部分配（按开始日期排序）
    pub fn find_by_line(&self, line_id: &str) -> RepositoryResult<Vec<LineAllocation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM line_allocations WHERE line_id = ?1 ORDER BY start_date, created_at",
            ALLOCATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let allocations = stmt
            .query_map(params![line_id], Self::map_row)?
            .collect::<Result<Vec<LineAllocation>, _>>()?;
        Ok(allocations)
    }

    /// 查询款式的全部分配
    pub fn find_by_style(&self, style_id: &str) -> RepositoryResult<Vec<LineAllocation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM line_allocations WHERE style_id = ?1 ORDER BY start_date",
            ALLOCATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let allocations = stmt
            .query_map(params![style_id], Self::map_row)?
            .collect::<Result<Vec<LineAllocation>, _>>()?;
        Ok(allocations)
    }

    /// 查询与闭区间 [start, end] 重叠的同产线分配
    pub fn find_overlapping(
        &self,
        line_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<&str>,
    ) -> RepositoryResult<Vec<LineAllocation>> {
        let conn = self.get_conn()?;
        Self::find_overlapping_tx(&conn, line_id, start, end, exclude_id)
    }

    /// 在调用方事务内查询重叠分配
    ///
    /// 判定: a.start_date <= end AND a.end_date >= start
    /// ISO 日期文本可直接做字符串比较
    pub fn find_overlapping_tx(
        conn: &Connection,
        line_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<&str>,
    ) -> RepositoryResult<Vec<LineAllocation>> {
        let sql = format!(
            r#"SELECT {} FROM line_allocations
               WHERE line_id = ?1
                 AND start_date <= ?2
                 AND end_date >= ?3
                 AND (?4 IS NULL OR allocation_id <> ?4)
               ORDER BY start_date, created_at"#,
            ALLOCATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let allocations = stmt
            .query_map(params![line_id, end, start, exclude_id], Self::map_row)?
            .collect::<Result<Vec<LineAllocation>, _>>()?;
        Ok(allocations)
    }

    /// 查询与日期区间相交的所有分配（负荷矩阵用）
    pub fn find_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<LineAllocation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM line_allocations
               WHERE start_date <= ?1 AND end_date >= ?2
               ORDER BY line_id, start_date"#,
            ALLOCATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let allocations = stmt
            .query_map(params![end, start], Self::map_row)?
            .collect::<Result<Vec<LineAllocation>, _>>()?;
        Ok(allocations)
    }

    fn map_row(row: &Row) -> rusqlite::Result<LineAllocation> {
        Ok(LineAllocation {
            allocation_id: row.get(0)?,
            line_id: row.get(1)?,
            style_id: row.get(2)?,
            start_date: row.get(3)?,
            end_date: row.get(4)?,
            planned_quantity: row.get(5)?,
            remarks: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

// ==========================================
// 成衣产线排产系统 - 产线数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 产能修改只影响之后的负荷计算（负荷不缓存）
// ==========================================

use crate::domain::line::ProductionLine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::now;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const LINE_COLUMNS: &str = "line_id, name, capacity, active, supervisor, created_at";

// ==========================================
// ProductionLineRepository - 产线仓储
// ==========================================
pub struct ProductionLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionLineRepository {
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

    fn check_capacity(capacity: i64) -> RepositoryResult<()> {
        if capacity <= 0 {
            return Err(RepositoryError::FieldValueError {
                field: "capacity".to_string(),
                message: format!("产线产能必须大于 0: {}", capacity),
            });
        }
        Ok(())
    }

    /// 新增产线
    ///
    /// # 返回
    /// - Err(FieldValueError): capacity <= 0
    /// - Err(UniqueConstraintViolation): 产线名称重复
    pub fn insert(
        &self,
        name: &str,
        capacity: i64,
        supervisor: Option<String>,
    ) -> RepositoryResult<ProductionLine> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, name, capacity, supervisor)
    }

    /// 在调用方事务内新增产线
    pub fn insert_tx(
        conn: &Connection,
        name: &str,
        capacity: i64,
        supervisor: Option<String>,
    ) -> RepositoryResult<ProductionLine> {
        if name.trim().is_empty() {
            return Err(RepositoryError::ValidationError("产线名称不能为空".to_string()));
        }
        Self::check_capacity(capacity)?;

        let line = ProductionLine {
            line_id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            capacity,
            active: true,
            supervisor,
            created_at: now(),
        };

        conn.execute(
            r#"
            INSERT INTO production_lines (line_id, name, capacity, active, supervisor, created_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?5)
            "#,
            params![
                line.line_id,
                line.name,
                line.capacity,
                line.supervisor,
                line.created_at,
            ],
        )?;

        Ok(line)
    }

    /// 按ID查询产线
    pub fn find_by_id(&self, line_id: &str) -> RepositoryResult<Option<ProductionLine>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, line_id)
    }

    /// 在调用方事务内按ID查询产线
    pub fn find_by_id_tx(
        conn: &Connection,
        line_id: &str,
    ) -> RepositoryResult<Option<ProductionLine>> {
        let sql = format!("SELECT {} FROM production_lines WHERE line_id = ?1", LINE_COLUMNS);
        let line = conn
            .query_row(&sql, params![line_id], Self::map_row)
            .optional()?;
        Ok(line)
    }

    /// 按名称查询产线
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<ProductionLine>> {
        let conn = self.get_conn()?;
        Self::find_by_name_tx(&conn, name)
    }

    /// 在调用方事务内按名称查询产线
    pub fn find_by_name_tx(
        conn: &Connection,
        name: &str,
    ) -> RepositoryResult<Option<ProductionLine>> {
        let sql = format!("SELECT {} FROM production_lines WHERE name = ?1", LINE_COLUMNS);
        let line = conn
            .query_row(&sql, params![name.trim()], Self::map_row)
            .optional()?;
        Ok(line)
    }

    /// 查询全部产线
    pub fn list_all(&self) -> RepositoryResult<Vec<ProductionLine>> {
        self.list_where("1 = 1")
    }

    /// 查询启用中的产线
    pub fn list_active(&self) -> RepositoryResult<Vec<ProductionLine>> {
        self.list_where("active = 1")
    }

    fn list_where(&self, predicate: &str) -> RepositoryResult<Vec<ProductionLine>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_lines WHERE {} ORDER BY name",
            LINE_COLUMNS, predicate
        );
        let mut stmt = conn.prepare(&sql)?;
        let lines = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<ProductionLine>, _>>()?;
        Ok(lines)
    }

    /// 修改产线产能
    pub fn update_capacity(&self, line_id: &str, capacity: i64) -> RepositoryResult<()> {
        Self::check_capacity(capacity)?;
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE production_lines SET capacity = ?1 WHERE line_id = ?2",
            params![capacity, line_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ProductionLine", line_id));
        }
        Ok(())
    }

    /// 启用/停用产线
    pub fn set_active(&self, line_id: &str, active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE production_lines SET active = ?1 WHERE line_id = ?2",
            params![active, line_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ProductionLine", line_id));
        }
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<ProductionLine> {
        Ok(ProductionLine {
            line_id: row.get(0)?,
            name: row.get(1)?,
            capacity: row.get(2)?,
            active: row.get(3)?,
            supervisor: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

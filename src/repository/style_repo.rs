// ==========================================
// 成衣产线排产系统 - 款式数据仓储
// ==========================================
// 红线: 新增/删除款式必须与订单 total_quantity 重算处于同一事务
// 红线: 被物料/分配/生产记录引用的款式不可删除
// ==========================================

use crate::domain::order::{NewStyle, SizeBreakdown, Style};
use crate::domain::types::StyleStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_repo::OrderRepository;
use crate::repository::row_utils::{now, parse_optional_enum_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

const STYLE_COLUMNS: &str = "style_id, order_id, style_number, description, category, color, \
                             size_breakdown, quantity, manual_status, created_at";

// ==========================================
// StyleRepository - 款式仓储
// ==========================================
pub struct StyleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StyleRepository {
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

    /// 新增款式并重算订单总数量（单事务）
    ///
    /// # 返回
    /// - Ok((Style, i64)): 新款式 + 重算后的订单 total_quantity
    /// - Err(NotFound): 订单不存在
    /// - Err(ValidationError): 数量与尺码合计不一致等
    pub fn add_style(&self, new_style: &NewStyle) -> RepositoryResult<(Style, i64)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let style = Self::insert_tx(&tx, new_style, None)?;
        let total = OrderRepository::recompute_total_quantity_tx(&tx, &new_style.order_id)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            style_id = %style.style_id,
            order_id = %style.order_id,
            total_quantity = total,
            "款式已新增, 订单总数量已重算"
        );
        Ok((style, total))
    }

    /// 在调用方事务内插入款式（不重算订单汇总）
    pub fn insert_tx(
        conn: &Connection,
        new_style: &NewStyle,
        manual_status: Option<StyleStatus>,
    ) -> RepositoryResult<Style> {
        new_style
            .validate()
            .map_err(RepositoryError::ValidationError)?;

        if OrderRepository::find_by_id_tx(conn, &new_style.order_id)?.is_none() {
            return Err(RepositoryError::not_found("Order", new_style.order_id.as_str()));
        }

        let style = Style {
            style_id: Uuid::new_v4().to_string(),
            order_id: new_style.order_id.clone(),
            style_number: new_style.style_number.trim().to_string(),
            description: new_style.description.clone(),
            category: new_style.category.clone(),
            color: new_style.color.clone(),
            size_breakdown: new_style.size_breakdown.clone(),
            quantity: new_style.quantity,
            manual_status,
            created_at: now(),
        };

        let size_json = serde_json::to_string(&style.size_breakdown)?;

        conn.execute(
            r#"
            INSERT INTO styles (
                style_id, order_id, style_number, description, category, color,
                size_breakdown, quantity, manual_status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                style.style_id,
                style.order_id,
                style.style_number,
                style.description,
                style.category,
                style.color,
                size_json,
                style.quantity,
                style.manual_status.map(|s| s.as_str()),
                style.created_at,
            ],
        )?;

        Ok(style)
    }

    /// 按ID查询款式
    pub fn find_by_id(&self, style_id: &str) -> RepositoryResult<Option<Style>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, style_id)
    }

    /// 在调用方事务内按ID查询款式
    pub fn find_by_id_tx(conn: &Connection, style_id: &str) -> RepositoryResult<Option<Style>> {
        let sql = format!("SELECT {} FROM styles WHERE style_id = ?1", STYLE_COLUMNS);
        let style = conn
            .query_row(&sql, params![style_id], Self::map_row)
            .optional()?;
        Ok(style)
    }

    /// 查询订单下全部款式
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<Style>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM styles WHERE order_id = ?1 ORDER BY style_number",
            STYLE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let styles = stmt
            .query_map(params![order_id], Self::map_row)?
            .collect::<Result<Vec<Style>, _>>()?;
        Ok(styles)
    }

    /// 按款号查询（款号仅在订单内唯一，取最早创建的一条）
    pub fn find_by_style_number(&self, style_number: &str) -> RepositoryResult<Option<Style>> {
        let conn = self.get_conn()?;
        Self::find_by_style_number_tx(&conn, style_number)
    }

    /// 在调用方事务内按款号查询
    pub fn find_by_style_number_tx(
        conn: &Connection,
        style_number: &str,
    ) -> RepositoryResult<Option<Style>> {
        let sql = format!(
            "SELECT {} FROM styles WHERE style_number = ?1 ORDER BY created_at LIMIT 1",
            STYLE_COLUMNS
        );
        let style = conn
            .query_row(&sql, params![style_number.trim()], Self::map_row)
            .optional()?;
        Ok(style)
    }

    /// 在调用方事务内按订单+款号查询
    pub fn find_in_order_tx(
        conn: &Connection,
        order_id: &str,
        style_number: &str,
    ) -> RepositoryResult<Option<Style>> {
        let sql = format!(
            "SELECT {} FROM styles WHERE order_id = ?1 AND style_number = ?2",
            STYLE_COLUMNS
        );
        let style = conn
            .query_row(&sql, params![order_id, style_number.trim()], Self::map_row)
            .optional()?;
        Ok(style)
    }

    /// 设置/清除人工覆写状态
    pub fn set_manual_status(
        &self,
        style_id: &str,
        status: Option<StyleStatus>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE styles SET manual_status = ?1 WHERE style_id = ?2",
            params![status.map(|s| s.as_str()), style_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Style", style_id));
        }
        Ok(())
    }

    /// 删除款式并重算订单总数量（单事务）
    ///
    /// # 返回
    /// - Err(BusinessRuleViolation): 款式仍被引用
    pub fn delete(&self, style_id: &str) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let style = Self::find_by_id_tx(&tx, style_id)?
            .ok_or_else(|| RepositoryError::not_found("Style", style_id))?;

        let references = Self::count_references_tx(&tx, style_id)?;
        if references > 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "款式 {} 仍被 {} 条物料/分配/生产记录引用，不可删除",
                style.style_number, references
            )));
        }

        tx.execute("DELETE FROM styles WHERE style_id = ?1", params![style_id])?;
        let total = OrderRepository::recompute_total_quantity_tx(&tx, &style.order_id)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(total)
    }

    /// 统计引用该款式的下游记录数
    fn count_references_tx(conn: &Connection, style_id: &str) -> RepositoryResult<i64> {
        let count: i64 = conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM materials WHERE style_id = ?1)
              + (SELECT COUNT(*) FROM line_allocations WHERE style_id = ?1)
              + (SELECT COUNT(*) FROM production_entries WHERE style_id = ?1)
            "#,
            params![style_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_row(row: &Row) -> rusqlite::Result<Style> {
        let size_json: String = row.get(6)?;
        let size_breakdown: SizeBreakdown = serde_json::from_str(&size_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Style {
            style_id: row.get(0)?,
            order_id: row.get(1)?,
            style_number: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            color: row.get(5)?,
            size_breakdown,
            quantity: row.get(7)?,
            manual_status: parse_optional_enum_column(8, row.get(8)?)?,
            created_at: row.get(9)?,
        })
    }
}

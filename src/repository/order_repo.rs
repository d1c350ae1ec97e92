// ==========================================
// 成衣产线排产系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: total_quantity 只能由款式汇总重算得出
// ==========================================

use crate::domain::order::{NewOrder, Order};
use crate::domain::types::OrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{now, parse_optional_enum_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "order_id, po_number, buyer_id, order_date, delivery_date, \
                             manual_status, total_quantity, created_at, updated_at";

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
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

    /// 新增订单（total_quantity 初始为 0）
    ///
    /// # 返回
    /// - Err(ValidationError): 交期早于下单日期 / PO 号为空
    /// - Err(UniqueConstraintViolation): PO 号重复
    pub fn insert(&self, new_order: &NewOrder) -> RepositoryResult<Order> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, new_order, None)
    }

    /// 在调用方事务内新增订单
    pub fn insert_tx(
        conn: &Connection,
        new_order: &NewOrder,
        manual_status: Option<OrderStatus>,
    ) -> RepositoryResult<Order> {
        new_order
            .validate()
            .map_err(RepositoryError::ValidationError)?;

        let order = Order {
            order_id: Uuid::new_v4().to_string(),
            po_number: new_order.po_number.trim().to_string(),
            buyer_id: new_order.buyer_id.clone(),
            order_date: new_order.order_date,
            delivery_date: new_order.delivery_date,
            manual_status,
            total_quantity: 0,
            created_at: now(),
            updated_at: None,
        };

        conn.execute(
            r#"
            INSERT INTO orders (
                order_id, po_number, buyer_id, order_date, delivery_date,
                manual_status, total_quantity, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            "#,
            params![
                order.order_id,
                order.po_number,
                order.buyer_id,
                order.order_date,
                order.delivery_date,
                order.manual_status.map(|s| s.as_str()),
                order.created_at,
            ],
        )?;

        Ok(order)
    }

    /// 按ID查询订单
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, order_id)
    }

    /// 在调用方事务内按ID查询订单
    pub fn find_by_id_tx(conn: &Connection, order_id: &str) -> RepositoryResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE order_id = ?1", ORDER_COLUMNS);
        let order = conn
            .query_row(&sql, params![order_id], Self::map_row)
            .optional()?;
        Ok(order)
    }

    /// 按PO号查询订单
    pub fn find_by_po(&self, po_number: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        Self::find_by_po_tx(&conn, po_number)
    }

    /// 在调用方事务内按PO号查询订单
    pub fn find_by_po_tx(conn: &Connection, po_number: &str) -> RepositoryResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE po_number = ?1", ORDER_COLUMNS);
        let order = conn
            .query_row(&sql, params![po_number.trim()], Self::map_row)
            .optional()?;
        Ok(order)
    }

    /// 查询全部订单（按交期升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders ORDER BY delivery_date, po_number",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<Order>, _>>()?;
        Ok(orders)
    }

    /// 查询某客户的全部订单（按交期升序）
    pub fn find_by_buyer(&self, buyer_id: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE buyer_id = ?1 ORDER BY delivery_date, po_number",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![buyer_id], Self::map_row)?
            .collect::<Result<Vec<Order>, _>>()?;
        Ok(orders)
    }

    /// 设置/清除人工覆写状态
    ///
    /// # 参数
    /// - status: Some 为覆写；None 恢复为派生状态
    pub fn set_manual_status(
        &self,
        order_id: &str,
        status: Option<OrderStatus>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE orders SET manual_status = ?1, updated_at = ?2 WHERE order_id = ?3",
            params![status.map(|s| s.as_str()), now(), order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Order", order_id));
        }
        Ok(())
    }

    /// 删除订单（级联删除其款式）
    ///
    /// 若任一款式仍被物料/分配/生产记录引用，外键 RESTRICT 会拒绝整个删除
    pub fn delete(&self, order_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM orders WHERE order_id = ?1", params![order_id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Order", order_id));
        }
        Ok(())
    }

    /// 在调用方事务内重算订单总数量
    ///
    /// # 返回
    /// - Ok(i64): 重算后的 total_quantity
    pub fn recompute_total_quantity_tx(conn: &Connection, order_id: &str) -> RepositoryResult<i64> {
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM styles WHERE order_id = ?1",
            params![order_id],
            |row| row.get(0),
        )?;

        let affected = conn.execute(
            "UPDATE orders SET total_quantity = ?1, updated_at = ?2 WHERE order_id = ?3",
            params![total, now(), order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Order", order_id));
        }

        Ok(total)
    }

    fn map_row(row: &Row) -> rusqlite::Result<Order> {
        Ok(Order {
            order_id: row.get(0)?,
            po_number: row.get(1)?,
            buyer_id: row.get(2)?,
            order_date: row.get(3)?,
            delivery_date: row.get(4)?,
            manual_status: parse_optional_enum_column(5, row.get(5)?)?,
            total_quantity: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

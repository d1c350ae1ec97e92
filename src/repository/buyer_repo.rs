// ==========================================
// 成衣产线排产系统 - 买家数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::order::Buyer;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::now;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const BUYER_COLUMNS: &str = "buyer_id, name, contact_person, email, phone, created_at";

// ==========================================
// BuyerRepository - 买家仓储
// ==========================================
pub struct BuyerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BuyerRepository {
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

    /// 新增买家
    pub fn insert(
        &self,
        name: &str,
        contact_person: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> RepositoryResult<Buyer> {
        if name.trim().is_empty() {
            return Err(RepositoryError::ValidationError("买家名称不能为空".to_string()));
        }
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, name.trim(), contact_person, email, phone)
    }

    /// 在调用方事务内新增买家
    pub fn insert_tx(
        conn: &Connection,
        name: &str,
        contact_person: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> RepositoryResult<Buyer> {
        let buyer = Buyer {
            buyer_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            contact_person,
            email,
            phone,
            created_at: now(),
        };

        conn.execute(
            r#"
            INSERT INTO buyers (buyer_id, name, contact_person, email, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                buyer.buyer_id,
                buyer.name,
                buyer.contact_person,
                buyer.email,
                buyer.phone,
                buyer.created_at,
            ],
        )?;

        Ok(buyer)
    }

    /// 按ID查询
    pub fn find_by_id(&self, buyer_id: &str) -> RepositoryResult<Option<Buyer>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM buyers WHERE buyer_id = ?1", BUYER_COLUMNS);
        let buyer = conn
            .query_row(&sql, params![buyer_id], Self::map_row)
            .optional()?;
        Ok(buyer)
    }

    /// 按名称查询
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Buyer>> {
        let conn = self.get_conn()?;
        Self::find_by_name_tx(&conn, name)
    }

    /// 在调用方事务内按名称查询
    pub fn find_by_name_tx(conn: &Connection, name: &str) -> RepositoryResult<Option<Buyer>> {
        let sql = format!("SELECT {} FROM buyers WHERE name = ?1", BUYER_COLUMNS);
        let buyer = conn
            .query_row(&sql, params![name.trim()], Self::map_row)
            .optional()?;
        Ok(buyer)
    }

    /// 查询全部买家
    pub fn list_all(&self) -> RepositoryResult<Vec<Buyer>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM buyers ORDER BY name", BUYER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let buyers = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<Buyer>, _>>()?;
        Ok(buyers)
    }

    fn map_row(row: &Row) -> rusqlite::Result<Buyer> {
        Ok(Buyer {
            buyer_id: row.get(0)?,
            name: row.get(1)?,
            contact_person: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

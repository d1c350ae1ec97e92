// ==========================================
// 成衣产线排产系统 - 物料数据仓储
// ==========================================
// 红线: 状态与到货/发料数量必须在同一事务内落库，不允许部分写入可见
// ==========================================

use crate::domain::material::{Material, NewMaterial};
use crate::domain::types::MaterialStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{now, parse_enum_column};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const MATERIAL_COLUMNS: &str = "material_id, style_id, name, material_type, unit, \
                                required_quantity, received_quantity, issued_quantity, status, \
                                po_number, po_date, expected_delivery, actual_delivery, remarks, \
                                created_at";

// ==========================================
// MaterialRepository - 物料仓储
// ==========================================
pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
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

    /// 新增物料（状态 Pending，到货/发料为 0）
    pub fn insert(&self, new_material: &NewMaterial) -> RepositoryResult<Material> {
        let conn = self.get_conn()?;

        if new_material.name.trim().is_empty() {
            return Err(RepositoryError::ValidationError("物料名称不能为空".to_string()));
        }
        if new_material.required_quantity < 0.0 {
            return Err(RepositoryError::FieldValueError {
                field: "required_quantity".to_string(),
                message: format!("需求数量不能为负: {}", new_material.required_quantity),
            });
        }

        let material = Material {
            material_id: Uuid::new_v4().to_string(),
            style_id: new_material.style_id.clone(),
            name: new_material.name.trim().to_string(),
            material_type: new_material.material_type,
            unit: new_material.unit.clone(),
            required_quantity: new_material.required_quantity,
            received_quantity: 0.0,
            issued_quantity: 0.0,
            status: MaterialStatus::Pending,
            po_number: None,
            po_date: None,
            expected_delivery: None,
            actual_delivery: None,
            remarks: None,
            created_at: now(),
        };

        Self::insert_material_tx(&conn, &material)?;
        Ok(material)
    }

    /// 在调用方事务内插入完整物料记录（导入场景可带初始数量）
    pub fn insert_material_tx(conn: &Connection, material: &Material) -> RepositoryResult<()> {
        material
            .check_quantities()
            .map_err(RepositoryError::ValidationError)?;

        conn.execute(
            r#"
            INSERT INTO materials (
                material_id, style_id, name, material_type, unit,
                required_quantity, received_quantity, issued_quantity, status,
                po_number, po_date, expected_delivery, actual_delivery, remarks, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                material.material_id,
                material.style_id,
                material.name,
                material.material_type.as_str(),
                material.unit,
                material.required_quantity,
                material.received_quantity,
                material.issued_quantity,
                material.status.as_str(),
                material.po_number,
                material.po_date,
                material.expected_delivery,
                material.actual_delivery,
                material.remarks,
                material.created_at,
            ],
        )?;
        Ok(())
    }

    /// 在 IMMEDIATE 事务内执行闭包（读-改-写 物料事件）
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

    /// 按ID查询物料
    pub fn find_by_id(&self, material_id: &str) -> RepositoryResult<Option<Material>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, material_id)
    }

    /// 在调用方事务内按ID查询物料
    pub fn find_by_id_tx(conn: &Connection, material_id: &str) -> RepositoryResult<Option<Material>> {
        let sql = format!("SELECT {} FROM materials WHERE material_id = ?1", MATERIAL_COLUMNS);
        let material = conn
            .query_row(&sql, params![material_id], Self::map_row)
            .optional()?;
        Ok(material)
    }

    /// 查询款式下全部物料
    pub fn find_by_style(&self, style_id: &str) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM materials WHERE style_id = ?1 ORDER BY material_type, name",
            MATERIAL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let materials = stmt
            .query_map(params![style_id], Self::map_row)?
            .collect::<Result<Vec<Material>, _>>()?;
        Ok(materials)
    }

    /// 在调用方事务内按 款式+名称+类型 查询（导入去重）
    pub fn find_by_identity_tx(
        conn: &Connection,
        style_id: &str,
        name: &str,
        material_type: &str,
    ) -> RepositoryResult<Option<Material>> {
        let sql = format!(
            "SELECT {} FROM materials WHERE style_id = ?1 AND name = ?2 AND material_type = ?3",
            MATERIAL_COLUMNS
        );
        let material = conn
            .query_row(&sql, params![style_id, name, material_type], Self::map_row)
            .optional()?;
        Ok(material)
    }

    /// 按状态统计物料数
    pub fn count_by_status(&self) -> RepositoryResult<HashMap<MaterialStatus, i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM materials GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| {
                let raw: String = row.get(0)?;
                Ok((parse_enum_column::<MaterialStatus>(0, &raw)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().collect())
    }

    /// 在调用方事务内写入物料状态与数量/采购字段
    ///
    /// # 返回
    /// - Err(NotFound): 物料不存在
    /// - Err(ValidationError): 数量不变量被破坏（事务回滚）
    pub fn apply_update_tx(conn: &Connection, material: &Material) -> RepositoryResult<()> {
        material
            .check_quantities()
            .map_err(RepositoryError::ValidationError)?;

        let affected = conn.execute(
            r#"
            UPDATE materials SET
                status = ?1,
                received_quantity = ?2,
                issued_quantity = ?3,
                po_number = ?4,
                po_date = ?5,
                expected_delivery = ?6,
                actual_delivery = ?7,
                remarks = ?8
            WHERE material_id = ?9
            "#,
            params![
                material.status.as_str(),
                material.received_quantity,
                material.issued_quantity,
                material.po_number,
                material.po_date,
                material.expected_delivery,
                material.actual_delivery,
                material.remarks,
                material.material_id,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::not_found("Material", material.material_id.as_str()));
        }
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<Material> {
        let material_type: String = row.get(3)?;
        let status: String = row.get(8)?;
        Ok(Material {
            material_id: row.get(0)?,
            style_id: row.get(1)?,
            name: row.get(2)?,
            material_type: parse_enum_column(3, &material_type)?,
            unit: row.get(4)?,
            required_quantity: row.get(5)?,
            received_quantity: row.get(6)?,
            issued_quantity: row.get(7)?,
            status: parse_enum_column(8, &status)?,
            po_number: row.get(9)?,
            po_date: row.get(10)?,
            expected_delivery: row.get(11)?,
            actual_delivery: row.get(12)?,
            remarks: row.get(13)?,
            created_at: row.get(14)?,
        })
    }
}

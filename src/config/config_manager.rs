// ==========================================
// 成衣产线排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::planning_config_trait::{defaults, PlanningConfigReader};
use crate::domain::types::OverlapPolicy;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 配置键
pub mod config_keys {
    pub const OVERLAP_POLICY: &str = "allocation.overlap_policy";
    pub const STYLE_COMPLETION_PCT: &str = "progress.style_completion_pct";
    pub const IMPORT_DEADLINE_SECS: &str = "import.deadline_secs";
    pub const OVERLOAD_THRESHOLD_PCT: &str = "load.overload_threshold_pct";
}

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let config_map = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<BTreeMap<String, String>, _>>()?;

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取并解析配置值，缺失时返回默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| RepositoryError::FieldValueError {
                field: key.to_string(),
                message: format!("配置值 '{}' 格式错误: {}", raw, e),
            }),
        }
    }
}

impl PlanningConfigReader for ConfigManager {
    fn overlap_policy(&self) -> RepositoryResult<OverlapPolicy> {
        self.get_parsed_or(config_keys::OVERLAP_POLICY, defaults::OVERLAP_POLICY)
    }

    fn style_completion_pct(&self) -> RepositoryResult<f64> {
        let pct = self.get_parsed_or(
            config_keys::STYLE_COMPLETION_PCT,
            defaults::STYLE_COMPLETION_PCT,
        )?;
        if !(pct > 0.0 && pct <= 100.0) {
            return Err(RepositoryError::FieldValueError {
                field: config_keys::STYLE_COMPLETION_PCT.to_string(),
                message: format!("完成率阈值必须在 (0, 100] 之间: {}", pct),
            });
        }
        Ok(pct)
    }

    fn import_deadline_secs(&self) -> RepositoryResult<u64> {
        self.get_parsed_or(config_keys::IMPORT_DEADLINE_SECS, defaults::IMPORT_DEADLINE_SECS)
    }

    fn overload_threshold_pct(&self) -> RepositoryResult<f64> {
        self.get_parsed_or(
            config_keys::OVERLOAD_THRESHOLD_PCT,
            defaults::OVERLOAD_THRESHOLD_PCT,
        )
    }
}

// ==========================================
// 成衣产线排产系统 - 引擎层错误类型
// ==========================================
// 职责: 业务规则违反的结构化错误（区间、数量、状态迁移、重叠拦截）
// ==========================================

use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("日期区间非法: 结束日期 {end} 早于开始日期 {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("数量非法 ({field}): {value}")]
    InvalidQuantity { field: String, value: f64 },

    #[error("{entity} 不存在: {id}")]
    NotFound { entity: String, id: String },

    #[error("状态迁移非法: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("产线 {line_id} 分配区间与已有分配重叠: {conflicting:?}")]
    OverlapRejected {
        line_id: String,
        conflicting: Vec<String>,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    pub fn invalid_quantity(field: &str, value: impl Into<f64>) -> Self {
        EngineError::InvalidQuantity {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

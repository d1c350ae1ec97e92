// ==========================================
// 成衣产线排产系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 任一行错误 → 整个导入事务回滚
// ==========================================

use crate::repository::error::RepositoryError;
use std::time::Duration;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("工作簿缺少可导入的工作表（需要 Orders/Styles/Materials/Production 之一）")]
    SheetMissing,

    #[error("工作表 {sheet} 缺少列: {column}")]
    ColumnMissing { sheet: String, column: String },

    // ===== 数据映射错误 =====
    #[error("必填字段为空 ({sheet} 行 {row}, 字段 {field})")]
    RequiredFieldMissing {
        sheet: String,
        row: usize,
        field: String,
    },

    #[error("类型转换失败 ({sheet} 行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        sheet: String,
        row: usize,
        field: String,
        message: String,
    },

    #[error("日期格式错误 ({sheet} 行 {row}, 字段 {field}): 期望 YYYY-MM-DD 或 Excel 日期序列号，实际 {value}")]
    DateFormatError {
        sheet: String,
        row: usize,
        field: String,
        value: String,
    },

    // ===== 引用与规则错误 =====
    #[error("引用不存在 ({sheet} 行 {row}): {entity} '{key}'")]
    UnknownReference {
        sheet: String,
        row: usize,
        entity: String,
        key: String,
    },

    #[error("数据校验失败 ({sheet} 行 {row}): {message}")]
    RowValidationError {
        sheet: String,
        row: usize,
        message: String,
    },

    // ===== 截止与取消 =====
    #[error("导入超过截止时长 {0:?}，已整体回滚")]
    DeadlineExceeded(Duration),

    #[error("导入已被取消，已整体回滚")]
    Cancelled,

    // ===== 数据库错误 =====
    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据写入失败 ({sheet} 行 {row}): {source}")]
    RowWriteError {
        sheet: String,
        row: usize,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

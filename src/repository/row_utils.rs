// ==========================================
// 成衣产线排产系统 - 行映射辅助函数
// ==========================================

use rusqlite::types::Type;
use std::str::FromStr;

/// 将文本列解析为领域枚举
///
/// 解析失败时返回 FromSqlConversionFailure，保留列序号便于排查
pub fn parse_enum_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 可空文本列解析为可选枚举
pub fn parse_optional_enum_column<T>(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.as_deref()
        .map(|v| parse_enum_column::<T>(idx, v))
        .transpose()
}

/// 当前时间（UTC，写入 created_at/updated_at）
pub fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

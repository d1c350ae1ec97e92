// ==========================================
// 成衣产线排产系统 - 字段映射器
// ==========================================
// 职责: 原始行 → 类型化导入记录（类型转换 + 必填校验）
// 日期: 接受 ISO 文本 (YYYY-MM-DD[ HH:MM:SS]) 或 Excel 日期序列号（基准 1899-12-30）
// ==========================================

use crate::domain::order::{size_breakdown_total, SizeBreakdown};
use crate::domain::types::{MaterialStatus, MaterialType, OrderStatus, Process, StyleStatus};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRow;
use chrono::{Duration, NaiveDate};
use std::str::FromStr;

/// 款式尺码列（按表头顺序）
pub const SIZE_COLUMNS: [&str; 6] = ["XS", "S", "M", "L", "XL", "XXL"];

pub const ORDER_COLUMNS: [&str; 3] = ["po_number", "order_date", "delivery_date"];
pub const STYLE_COLUMNS: [&str; 2] = ["po_number", "style_number"];
pub const MATERIAL_COLUMNS: [&str; 4] =
    ["style_number", "material_name", "material_type", "required_quantity"];
pub const PRODUCTION_COLUMNS: [&str; 5] =
    ["date", "style_number", "line_name", "process", "quantity"];

// ==========================================
// 类型化导入记录
// ==========================================

#[derive(Debug, Clone)]
pub struct OrderRow {
    pub row: usize,
    pub po_number: String,
    pub buyer_name: Option<String>,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone)]
pub struct StyleRow {
    pub row: usize,
    pub po_number: String,
    pub style_number: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub size_breakdown: SizeBreakdown,
    pub quantity: i64,
    pub status: Option<StyleStatus>,
}

#[derive(Debug, Clone)]
pub struct MaterialRow {
    pub row: usize,
    pub style_number: String,
    pub name: String,
    pub material_type: MaterialType,
    pub unit: Option<String>,
    pub required_quantity: f64,
    pub received_quantity: f64,
    pub issued_quantity: f64,
    pub status: Option<MaterialStatus>,
    pub po_number: Option<String>,
    pub po_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub actual_delivery: Option<NaiveDate>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProductionRow {
    pub row: usize,
    pub date: NaiveDate,
    pub style_number: String,
    pub line_name: String,
    pub capacity: Option<i64>,
    pub process: Process,
    pub quantity: i64,
    pub efficiency: Option<f64>,
    pub defects: i64,
    pub delay_reason: Option<String>,
    pub remarks: Option<String>,
}

// ==========================================
// FieldMapper
// ==========================================
pub struct FieldMapper {
    sheet: String,
}

impl FieldMapper {
    pub fn new(sheet: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
        }
    }

    pub fn map_order(&self, row_number: usize, row: &RawRow) -> ImportResult<OrderRow> {
        Ok(OrderRow {
            row: row_number,
            po_number: self.required_string(row, "po_number", row_number)?,
            buyer_name: self.get_string(row, "buyer_name"),
            order_date: self.required_date(row, "order_date", row_number)?,
            delivery_date: self.required_date(row, "delivery_date", row_number)?,
            status: self.parse_enum(row, "status", row_number)?,
        })
    }

    pub fn map_style(&self, row_number: usize, row: &RawRow) -> ImportResult<StyleRow> {
        let mut size_breakdown = SizeBreakdown::new();
        for size in SIZE_COLUMNS {
            if let Some(qty) = self.parse_i64(row, size, row_number)? {
                if qty > 0 {
                    size_breakdown.insert(size.to_string(), qty);
                }
            }
        }
        let quantity = match self.parse_i64(row, "quantity", row_number)? {
            Some(q) => q,
            None => size_breakdown_total(&size_breakdown).ok_or_else(|| {
                ImportError::RowValidationError {
                    sheet: self.sheet.clone(),
                    row: row_number,
                    message: "尺码合计超出数量上限".to_string(),
                }
            })?,
        };

        Ok(StyleRow {
            row: row_number,
            po_number: self.required_string(row, "po_number", row_number)?,
            style_number: self.required_string(row, "style_number", row_number)?,
            description: self.get_string(row, "description"),
            category: self.get_string(row, "category"),
            color: self.get_string(row, "color"),
            size_breakdown,
            quantity,
            status: self.parse_enum(row, "status", row_number)?,
        })
    }

    pub fn map_material(&self, row_number: usize, row: &RawRow) -> ImportResult<MaterialRow> {
        let material_type = self
            .parse_enum(row, "material_type", row_number)?
            .ok_or_else(|| self.missing("material_type", row_number))?;
        let required_quantity = self
            .parse_f64(row, "required_quantity", row_number)?
            .ok_or_else(|| self.missing("required_quantity", row_number))?;

        Ok(MaterialRow {
            row: row_number,
            style_number: self.required_string(row, "style_number", row_number)?,
            name: self.required_string(row, "material_name", row_number)?,
            material_type,
            unit: self.get_string(row, "unit"),
            required_quantity,
            received_quantity: self
                .parse_f64(row, "received_quantity", row_number)?
                .unwrap_or(0.0),
            issued_quantity: self
                .parse_f64(row, "issued_quantity", row_number)?
                .unwrap_or(0.0),
            status: self.parse_enum(row, "status", row_number)?,
            po_number: self.get_string(row, "po_number"),
            po_date: self.parse_date(row, "po_date", row_number)?,
            expected_delivery: self.parse_date(row, "expected_delivery", row_number)?,
            actual_delivery: self.parse_date(row, "actual_delivery", row_number)?,
            remarks: self.get_string(row, "remarks"),
        })
    }

    pub fn map_production(&self, row_number: usize, row: &RawRow) -> ImportResult<ProductionRow> {
        let process = self
            .parse_enum(row, "process", row_number)?
            .ok_or_else(|| self.missing("process", row_number))?;
        let quantity = self
            .parse_i64(row, "quantity", row_number)?
            .ok_or_else(|| self.missing("quantity", row_number))?;

        Ok(ProductionRow {
            row: row_number,
            date: self.required_date(row, "date", row_number)?,
            style_number: self.required_string(row, "style_number", row_number)?,
            line_name: self.required_string(row, "line_name", row_number)?,
            capacity: self.parse_i64(row, "capacity", row_number)?,
            process,
            quantity,
            efficiency: self.parse_f64(row, "efficiency", row_number)?,
            defects: self.parse_i64(row, "defects", row_number)?.unwrap_or(0),
            delay_reason: self.get_string(row, "delay_reason"),
            remarks: self.get_string(row, "remarks"),
        })
    }

    // ==========================================
    // 基础转换
    // ==========================================

    fn get_string(&self, row: &RawRow, key: &str) -> Option<String> {
        row.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn missing(&self, field: &str, row_number: usize) -> ImportError {
        ImportError::RequiredFieldMissing {
            sheet: self.sheet.clone(),
            row: row_number,
            field: field.to_string(),
        }
    }

    fn required_string(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<String> {
        self.get_string(row, key)
            .ok_or_else(|| self.missing(key, row_number))
    }

    fn conversion_error(&self, key: &str, row_number: usize, message: String) -> ImportError {
        ImportError::TypeConversionError {
            sheet: self.sheet.clone(),
            row: row_number,
            field: key.to_string(),
            message,
        }
    }

    fn parse_f64(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<Option<f64>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(value) => value.parse::<f64>().map(Some).map_err(|_| {
                self.conversion_error(key, row_number, format!("无法解析为数值: {}", value))
            }),
        }
    }

    /// 整数字段（Excel 数值可能带 .0）
    fn parse_i64(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<Option<i64>> {
        match self.parse_f64(row, key, row_number)? {
            None => Ok(None),
            Some(v) if v.fract() == 0.0 => Ok(Some(v as i64)),
            Some(v) => Err(self.conversion_error(key, row_number, format!("无法解析为整数: {}", v))),
        }
    }

    fn parse_enum<T>(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|e| self.conversion_error(key, row_number, e.to_string())),
        }
    }

    fn parse_date(
        &self,
        row: &RawRow,
        key: &str,
        row_number: usize,
    ) -> ImportResult<Option<NaiveDate>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(value) => parse_date_value(&value).map(Some).ok_or_else(|| {
                ImportError::DateFormatError {
                    sheet: self.sheet.clone(),
                    row: row_number,
                    field: key.to_string(),
                    value,
                }
            }),
        }
    }

    fn required_date(&self, row: &RawRow, key: &str, row_number: usize) -> ImportResult<NaiveDate> {
        self.parse_date(row, key, row_number)?
            .ok_or_else(|| self.missing(key, row_number))
    }
}

/// 日期文本解析
///
/// 依次尝试: YYYY-MM-DD / 带时间部分的 ISO 文本 / YYYY/MM/DD / Excel 序列号
pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if value.len() > 10 && value.is_char_boundary(10) {
        if let Ok(date) = NaiveDate::parse_from_str(&value[..10], "%Y-%m-%d") {
            return Some(date);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y/%m/%d") {
        return Some(date);
    }
    let serial = value.parse::<f64>().ok()?;
    excel_serial_to_date(serial)
}

/// Excel 日期序列号 → 日期（1900 日期系统）
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

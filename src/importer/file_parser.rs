// ==========================================
// 成衣产线排产系统 - 工作簿解析器
// ==========================================
// 阶段 0: 整个文件一次性读入内存
// 支持: Excel (.xlsx/.xls)，按固定表名读取 Orders/Styles/Materials/Production
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::Path;

pub const SHEET_ORDERS: &str = "Orders";
pub const SHEET_STYLES: &str = "Styles";
pub const SHEET_MATERIALS: &str = "Materials";
pub const SHEET_PRODUCTION: &str = "Production";

/// 原始行: 表头 → 单元格文本
pub type RawRow = HashMap<String, String>;

/// 单个工作表（行号为 Excel 行号，表头为第 1 行）
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<(usize, RawRow)>,
}

impl SheetData {
    /// 从表头 + 行值构造（内存数据源与测试共用）
    pub fn from_rows<S: AsRef<str>>(name: &str, headers: &[S], rows: &[Vec<S>]) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.as_ref().trim().to_string()).collect();
        let mut data_rows = Vec::new();
        for (idx, values) in rows.iter().enumerate() {
            let row: RawRow = headers
                .iter()
                .zip(values.iter())
                .map(|(h, v)| (h.clone(), v.as_ref().trim().to_string()))
                .collect();
            // 跳过完全空白的行
            if row.values().all(|v| v.is_empty()) {
                continue;
            }
            data_rows.push((idx + 2, row));
        }
        Self {
            name: name.to_string(),
            headers,
            rows: data_rows,
        }
    }

    /// 校验必需列存在
    pub fn require_columns(&self, columns: &[&str]) -> ImportResult<()> {
        for column in columns {
            if !self.headers.iter().any(|h| h == column) {
                return Err(ImportError::ColumnMissing {
                    sheet: self.name.clone(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// 整个工作簿（缺失的表为 None）
#[derive(Debug, Clone, Default)]
pub struct WorkbookData {
    pub orders: Option<SheetData>,
    pub styles: Option<SheetData>,
    pub materials: Option<SheetData>,
    pub production: Option<SheetData>,
}

impl WorkbookData {
    pub fn is_empty(&self) -> bool {
        self.orders.is_none()
            && self.styles.is_none()
            && self.materials.is_none()
            && self.production.is_none()
    }

    pub fn total_rows(&self) -> usize {
        [&self.orders, &self.styles, &self.materials, &self.production]
            .iter()
            .filter_map(|s| s.as_ref())
            .map(|s| s.rows.len())
            .sum()
    }
}

// ==========================================
// WorkbookParser
// ==========================================
pub struct WorkbookParser;

impl WorkbookParser {
    /// 解析工作簿文件
    ///
    /// # 错误
    /// - FileNotFound / UnsupportedFormat / ExcelParseError
    /// - SheetMissing: 四个固定表一个都没有
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<WorkbookData> {
        let path = file_path.as_ref();

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();

        let mut read_sheet = |name: &str| -> ImportResult<Option<SheetData>> {
            if !sheet_names.iter().any(|s| s == name) {
                return Ok(None);
            }
            let range = workbook.worksheet_range(name)?;
            let mut rows = range.rows();
            let headers: Vec<String> = match rows.next() {
                Some(header_row) => header_row.iter().map(cell_to_string).collect(),
                None => Vec::new(),
            };
            let values: Vec<Vec<String>> = rows
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect();
            Ok(Some(SheetData::from_rows(name, &headers, &values)))
        };

        let data = WorkbookData {
            orders: read_sheet(SHEET_ORDERS)?,
            styles: read_sheet(SHEET_STYLES)?,
            materials: read_sheet(SHEET_MATERIALS)?,
            production: read_sheet(SHEET_PRODUCTION)?,
        };

        if data.is_empty() {
            return Err(ImportError::SheetMissing);
        }
        Ok(data)
    }
}

/// 单元格 → 文本
///
/// 整数值浮点去掉小数部分；日期单元格输出 Excel 序列号，由字段映射统一解析
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

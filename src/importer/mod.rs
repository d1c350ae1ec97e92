// ==========================================
// 成衣产线排产系统 - 导入层
// ==========================================
// 职责: Excel 工作簿批量导入（Orders/Styles/Materials/Production）
// 约束: 全部行在同一事务内提交，任一行失败整体回滚
// 约束: 支持截止时长与取消令牌
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod workbook_importer;
pub mod workbook_importer_trait;

pub use error::{ImportError, ImportResult};
pub use file_parser::{SheetData, WorkbookData, WorkbookParser};
pub use workbook_importer::WorkbookImportService;
pub use workbook_importer_trait::{
    CancellationFlag, ImportOptions, ImportSummary, SheetSummary, WorkbookImporter,
};

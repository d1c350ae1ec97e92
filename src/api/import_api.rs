// ==========================================
// 成衣产线排产系统 - 导入 API
// ==========================================
// 职责: Excel 工作簿批量导入入口（异步，阻塞工作移至 spawn_blocking）
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::importer::{ImportOptions, ImportSummary, WorkbookImporter};

pub struct ImportApi {
    importer: Arc<dyn WorkbookImporter>,
}

impl ImportApi {
    pub fn new(importer: Arc<dyn WorkbookImporter>) -> Self {
        Self { importer }
    }

    /// 导入工作簿
    ///
    /// # 参数
    /// - file_path: .xlsx/.xls 文件路径
    /// - options: 截止时长与取消令牌（None 截止时长取配置值）
    pub async fn import_workbook(
        &self,
        file_path: &str,
        options: ImportOptions,
    ) -> ApiResult<ImportSummary> {
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }
        let summary = self
            .importer
            .import_workbook(PathBuf::from(file_path), options)
            .await?;
        info!(
            import_id = %summary.import_id,
            inserted = summary.total_inserted(),
            skipped = summary.total_skipped(),
            "工作簿导入成功"
        );
        Ok(summary)
    }
}

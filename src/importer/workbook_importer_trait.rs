// ==========================================
// 成衣产线排产系统 - 工作簿导入 Trait
// ==========================================
// 职责: 定义批量导入接口与导入选项/结果（不包含实现）
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ==========================================
// CancellationFlag - 取消令牌
// ==========================================
// 克隆共享同一标志；导入在每行写入前检查
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 导入选项
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    // None: 使用配置 import.deadline_secs
    pub deadline: Option<Duration>,
    pub cancel: CancellationFlag,
}

impl ImportOptions {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationFlag::new(),
        }
    }
}

/// 单个工作表的导入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// 导入结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub import_id: String,
    pub orders: SheetSummary,
    pub styles: SheetSummary,
    pub materials: SheetSummary,
    pub production: SheetSummary,
    pub buyers_created: usize,
    pub lines_created: usize,
    pub elapsed_ms: u64,
}

impl ImportSummary {
    pub fn total_inserted(&self) -> usize {
        self.orders.inserted + self.styles.inserted + self.materials.inserted + self.production.inserted
    }

    pub fn total_skipped(&self) -> usize {
        self.orders.skipped + self.styles.skipped + self.materials.skipped + self.production.skipped
    }
}

// ==========================================
// WorkbookImporter Trait
// ==========================================
// 实现者: WorkbookImportService
#[async_trait]
pub trait WorkbookImporter: Send + Sync {
    /// 从 Excel 工作簿导入订单/款式/物料/生产记录
    ///
    /// # 参数
    /// - file_path: 工作簿路径（.xlsx/.xls）
    /// - options: 截止时长与取消令牌
    ///
    /// # 返回
    /// - Ok(ImportSummary): 全部行已在同一事务内提交
    /// - Err: 任一行失败、超时或取消，事务整体回滚
    async fn import_workbook(
        &self,
        file_path: PathBuf,
        options: ImportOptions,
    ) -> ImportResult<ImportSummary>;
}

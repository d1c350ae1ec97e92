// ==========================================
// 成衣产线排产系统 - 生产记录与进度 API
// ==========================================
// 职责: 生产记录追加/查询，款式/订单进度，看板汇总
// 红线: 生产记录只追加，不提供修改接口
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::production::{NewProductionEntry, OrderProgress, ProductionEntry, StyleProgress};
use crate::domain::types::Process;
use crate::engine::dashboard::{self, DashboardSummary};
use crate::engine::ProgressTracker;
use crate::repository::{
    MaterialRepository, OrderRepository, ProductionEntryRepository, ProductionLineRepository,
    StyleRepository,
};

// ==========================================
// ProductionApi - 生产记录与进度 API
// ==========================================
pub struct ProductionApi {
    production_repo: Arc<ProductionEntryRepository>,
    style_repo: Arc<StyleRepository>,
    line_repo: Arc<ProductionLineRepository>,
    order_repo: Arc<OrderRepository>,
    material_repo: Arc<MaterialRepository>,
    tracker: Arc<ProgressTracker>,
}

impl ProductionApi {
    pub fn new(
        production_repo: Arc<ProductionEntryRepository>,
        style_repo: Arc<StyleRepository>,
        line_repo: Arc<ProductionLineRepository>,
        order_repo: Arc<OrderRepository>,
        material_repo: Arc<MaterialRepository>,
        tracker: Arc<ProgressTracker>,
    ) -> Self {
        Self {
            production_repo,
            style_repo,
            line_repo,
            order_repo,
            material_repo,
            tracker,
        }
    }

    /// 追加生产记录
    #[allow(clippy::too_many_arguments)]
    pub fn add_production_entry(
        &self,
        date: NaiveDate,
        style_id: &str,
        line_id: &str,
        process: Process,
        quantity: i64,
        efficiency: Option<f64>,
        defects: i64,
        delay_reason: Option<String>,
        remarks: Option<String>,
    ) -> ApiResult<ProductionEntry> {
        if self.style_repo.find_by_id(style_id)?.is_none() {
            return Err(ApiError::NotFound(format!("Style(id={})不存在", style_id)));
        }
        if self.line_repo.find_by_id(line_id)?.is_none() {
            return Err(ApiError::NotFound(format!("ProductionLine(id={})不存在", line_id)));
        }

        let entry = self.production_repo.insert(&NewProductionEntry {
            date,
            style_id: style_id.to_string(),
            line_id: line_id.to_string(),
            process,
            quantity,
            efficiency,
            defects,
            delay_reason,
            remarks,
        })?;
        info!(
            entry_id = %entry.entry_id,
            style_id = %style_id,
            process = %process,
            quantity,
            "生产记录已追加"
        );
        Ok(entry)
    }

    pub fn get_entries_by_style(&self, style_id: &str) -> ApiResult<Vec<ProductionEntry>> {
        Ok(self.production_repo.find_by_style(style_id)?)
    }

    pub fn get_entries_by_date_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<Vec<ProductionEntry>> {
        if end_date < start_date {
            return Err(ApiError::InvalidInput(format!(
                "结束日期 {} 早于开始日期 {}",
                end_date, start_date
            )));
        }
        Ok(self.production_repo.find_by_date_range(start_date, end_date)?)
    }

    pub fn style_progress(&self, style_id: &str) -> ApiResult<StyleProgress> {
        Ok(self.tracker.style_progress(style_id)?)
    }

    pub fn order_progress(&self, order_id: &str) -> ApiResult<OrderProgress> {
        Ok(self.tracker.order_progress(order_id)?)
    }

    /// 看板汇总（订单按生效状态计数、近 30 天工序产量、产线平均效率、物料状态）
    pub fn dashboard_summary(&self, today: NaiveDate) -> ApiResult<DashboardSummary> {
        let order_statuses = self
            .order_repo
            .list_all()?
            .iter()
            .map(|order| {
                self.tracker
                    .order_progress(&order.order_id)
                    .map(|p| p.effective_status)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entries = self
            .production_repo
            .find_by_date_range(dashboard::window_start(today), today)?;
        let lines = self.line_repo.list_all()?;
        let material_counts = self.material_repo.count_by_status()?;

        Ok(dashboard::summarize(
            today,
            &order_statuses,
            &entries,
            &lines,
            &material_counts,
        ))
    }
}

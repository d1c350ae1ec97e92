// ==========================================
// 成衣产线排产系统 - 产线计划 API
// ==========================================
// 职责: 产线维护、款式分配（新建/修改/删除/重叠检测）、负荷查询
// 红线: 重叠默认只提示不拦截，结果中带回重叠分配ID
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::line::{AllocationOutcome, AllocationRequest, LineAllocation, ProductionLine};
use crate::engine::{AllocationScheduler, LineLoadRow, LoadCalculator};
use crate::repository::{LineAllocationRepository, ProductionLineRepository};

// ==========================================
// LinePlanApi - 产线计划 API
// ==========================================
pub struct LinePlanApi {
    line_repo: Arc<ProductionLineRepository>,
    allocation_repo: Arc<LineAllocationRepository>,
    scheduler: Arc<AllocationScheduler>,
    load_calculator: Arc<LoadCalculator>,
}

impl LinePlanApi {
    pub fn new(
        line_repo: Arc<ProductionLineRepository>,
        allocation_repo: Arc<LineAllocationRepository>,
        scheduler: Arc<AllocationScheduler>,
        load_calculator: Arc<LoadCalculator>,
    ) -> Self {
        Self {
            line_repo,
            allocation_repo,
            scheduler,
            load_calculator,
        }
    }

    // ==========================================
    // 产线
    // ==========================================

    pub fn add_production_line(
        &self,
        name: &str,
        capacity: i64,
        supervisor: Option<String>,
    ) -> ApiResult<ProductionLine> {
        let line = self.line_repo.insert(name, capacity, supervisor)?;
        info!(line_id = %line.line_id, name = %line.name, capacity = line.capacity, "产线已创建");
        Ok(line)
    }

    pub fn list_production_lines(&self, active_only: bool) -> ApiResult<Vec<ProductionLine>> {
        if active_only {
            Ok(self.line_repo.list_active()?)
        } else {
            Ok(self.line_repo.list_all()?)
        }
    }

    /// 修改产能（只影响之后的负荷计算结果）
    pub fn update_line_capacity(&self, line_id: &str, capacity: i64) -> ApiResult<()> {
        self.line_repo.update_capacity(line_id, capacity)?;
        info!(line_id = %line_id, capacity, "产线产能已修改");
        Ok(())
    }

    pub fn set_line_active(&self, line_id: &str, active: bool) -> ApiResult<()> {
        Ok(self.line_repo.set_active(line_id, active)?)
    }

    // ==========================================
    // 分配
    // ==========================================

    /// 将款式分配到产线
    ///
    /// # 返回
    /// - AllocationOutcome: 分配 + 重叠提示 + 超产能提示
    pub fn allocate_style_to_line(
        &self,
        line_id: &str,
        style_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        planned_quantity: i64,
        remarks: Option<String>,
    ) -> ApiResult<AllocationOutcome> {
        let request = AllocationRequest {
            line_id: line_id.to_string(),
            style_id: style_id.to_string(),
            start_date,
            end_date,
            planned_quantity,
            remarks,
        };
        Ok(self.scheduler.create_allocation(&request)?)
    }

    pub fn update_allocation(
        &self,
        allocation_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        planned_quantity: i64,
        remarks: Option<String>,
    ) -> ApiResult<AllocationOutcome> {
        Ok(self.scheduler.update_allocation(
            allocation_id,
            start_date,
            end_date,
            planned_quantity,
            remarks,
        )?)
    }

    pub fn delete_allocation(&self, allocation_id: &str) -> ApiResult<()> {
        Ok(self.scheduler.delete_allocation(allocation_id)?)
    }

    pub fn get_allocations_by_line(&self, line_id: &str) -> ApiResult<Vec<LineAllocation>> {
        if self.line_repo.find_by_id(line_id)?.is_none() {
            return Err(ApiError::NotFound(format!("ProductionLine(id={})不存在", line_id)));
        }
        Ok(self.allocation_repo.find_by_line(line_id)?)
    }

    pub fn get_allocations_by_style(&self, style_id: &str) -> ApiResult<Vec<LineAllocation>> {
        Ok(self.allocation_repo.find_by_style(style_id)?)
    }

    pub fn detect_overlap(
        &self,
        line_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exclude_id: Option<&str>,
    ) -> ApiResult<Vec<String>> {
        Ok(self
            .scheduler
            .detect_overlap(line_id, start_date, end_date, exclude_id)?)
    }

    // ==========================================
    // 负荷
    // ==========================================

    pub fn daily_load(&self, line_id: &str, date: NaiveDate) -> ApiResult<f64> {
        Ok(self.load_calculator.daily_load(line_id, date)?)
    }

    pub fn range_load(
        &self,
        line_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<BTreeMap<NaiveDate, f64>> {
        Ok(self.load_calculator.range_load(line_id, start_date, end_date)?)
    }

    pub fn load_matrix(&self, start_date: NaiveDate, end_date: NaiveDate) -> ApiResult<Vec<LineLoadRow>> {
        Ok(self.load_calculator.load_matrix(start_date, end_date)?)
    }

    pub fn overloaded_days(
        &self,
        line_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<Vec<(NaiveDate, f64)>> {
        Ok(self
            .load_calculator
            .overloaded_days(line_id, start_date, end_date)?)
    }
}

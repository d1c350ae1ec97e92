// ==========================================
// 成衣产线排产系统 - 产线分配调度引擎
// ==========================================
// 职责: 款式→产线 日期区间分配的新建/修改/删除 + 重叠检测
// 红线: 重叠默认只提示不拦截 (OverlapPolicy::Warn)
// 红线: 查重叠与写入在同一 IMMEDIATE 事务内完成
// 红线: 不修改订单/款式状态
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::line::{
    inclusive_days, AllocationOutcome, AllocationRequest, LineAllocation, ProductionLine,
};
use crate::domain::types::OverlapPolicy;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::row_utils::now;
use crate::repository::{LineAllocationRepository, ProductionLineRepository, StyleRepository};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// AllocationScheduler - 产线分配调度器
// ==========================================
pub struct AllocationScheduler {
    allocation_repo: Arc<LineAllocationRepository>,
    config: Arc<dyn PlanningConfigReader>,
}

impl AllocationScheduler {
    /// 创建调度器
    ///
    /// # 参数
    /// - allocation_repo: 分配仓储（提供 transact）
    /// - config: 配置读取器（重叠策略）
    pub fn new(
        allocation_repo: Arc<LineAllocationRepository>,
        config: Arc<dyn PlanningConfigReader>,
    ) -> Self {
        Self {
            allocation_repo,
            config,
        }
    }

    // ==========================================
    // 校验
    // ==========================================

    /// 校验日期区间与计划数量
    pub fn validate(start: NaiveDate, end: NaiveDate, planned_quantity: i64) -> EngineResult<()> {
        if end < start {
            return Err(EngineError::InvalidRange { start, end });
        }
        if planned_quantity <= 0 {
            return Err(EngineError::invalid_quantity(
                "planned_quantity",
                planned_quantity as f64,
            ));
        }
        Ok(())
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 新建分配
    ///
    /// # 返回
    /// - AllocationOutcome: 已落库的分配 + 重叠提示 + 超产能提示
    ///
    /// # 错误
    /// - InvalidRange / InvalidQuantity: 参数非法
    /// - NotFound: 产线或款式不存在
    /// - OverlapRejected: 策略为 Reject 且存在重叠（不落库）
    #[instrument(skip(self, request), fields(
        line_id = %request.line_id,
        style_id = %request.style_id,
        start = %request.start_date,
        end = %request.end_date
    ))]
    pub fn create_allocation(&self, request: &AllocationRequest) -> EngineResult<AllocationOutcome> {
        Self::validate(request.start_date, request.end_date, request.planned_quantity)?;
        // 配置与仓储共用连接锁，必须在 transact 之外读取
        let policy = self.config.overlap_policy()?;

        let outcome = self.allocation_repo.transact(|conn| -> EngineResult<AllocationOutcome> {
            let line = Self::require_line(conn, &request.line_id)?;
            if StyleRepository::find_by_id_tx(conn, &request.style_id)?.is_none() {
                return Err(EngineError::not_found("Style", request.style_id.as_str()));
            }

            let overlaps = Self::check_overlap(
                conn,
                policy,
                &request.line_id,
                request.start_date,
                request.end_date,
                None,
            )?;

            let allocation = LineAllocation {
                allocation_id: Uuid::new_v4().to_string(),
                line_id: request.line_id.clone(),
                style_id: request.style_id.clone(),
                start_date: request.start_date,
                end_date: request.end_date,
                planned_quantity: request.planned_quantity,
                remarks: request.remarks.clone(),
                created_at: now(),
            };
            LineAllocationRepository::insert_tx(conn, &allocation)?;

            Ok(Self::build_outcome(allocation, overlaps, &line))
        })?;

        info!(
            allocation_id = %outcome.allocation.allocation_id,
            overlaps = outcome.overlaps.len(),
            exceeds_capacity = outcome.exceeds_capacity,
            "产线分配已创建"
        );
        Ok(outcome)
    }

    /// 检测同产线重叠分配
    ///
    /// # 参数
    /// - exclude_id: 排除的分配ID（修改时排除自身）
    ///
    /// # 返回
    /// - 重叠分配ID列表（按开始日期排序）
    pub fn detect_overlap(
        &self,
        line_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<&str>,
    ) -> EngineResult<Vec<String>> {
        if end < start {
            return Err(EngineError::InvalidRange { start, end });
        }
        let overlapping = self
            .allocation_repo
            .find_overlapping(line_id, start, end, exclude_id)?;
        Ok(overlapping.into_iter().map(|a| a.allocation_id).collect())
    }

    /// 修改分配（日期/数量/备注）
    ///
    /// 重新校验并排除自身重跑重叠检测，策略与新建一致
    #[instrument(skip(self, remarks))]
    pub fn update_allocation(
        &self,
        allocation_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        planned_quantity: i64,
        remarks: Option<String>,
    ) -> EngineResult<AllocationOutcome> {
        Self::validate(start, end, planned_quantity)?;
        let policy = self.config.overlap_policy()?;

        let outcome = self.allocation_repo.transact(|conn| -> EngineResult<AllocationOutcome> {
            let mut allocation = LineAllocationRepository::find_by_id_tx(conn, allocation_id)?
                .ok_or_else(|| EngineError::not_found("LineAllocation", allocation_id))?;
            let line = Self::require_line(conn, &allocation.line_id)?;

            let overlaps = Self::check_overlap(
                conn,
                policy,
                &allocation.line_id,
                start,
                end,
                Some(allocation_id),
            )?;

            allocation.start_date = start;
            allocation.end_date = end;
            allocation.planned_quantity = planned_quantity;
            allocation.remarks = remarks;
            LineAllocationRepository::update_tx(conn, &allocation)?;

            Ok(Self::build_outcome(allocation, overlaps, &line))
        })?;

        info!(
            allocation_id = %allocation_id,
            overlaps = outcome.overlaps.len(),
            "产线分配已修改"
        );
        Ok(outcome)
    }

    /// 删除分配（无条件，不影响生产记录）
    pub fn delete_allocation(&self, allocation_id: &str) -> EngineResult<()> {
        self.allocation_repo.delete(allocation_id).map_err(|e| match e {
            crate::repository::RepositoryError::NotFound { entity, id } => {
                EngineError::NotFound { entity, id }
            }
            other => EngineError::Repository(other),
        })?;
        info!(allocation_id = %allocation_id, "产线分配已删除");
        Ok(())
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn require_line(conn: &Connection, line_id: &str) -> EngineResult<ProductionLine> {
        ProductionLineRepository::find_by_id_tx(conn, line_id)?
            .ok_or_else(|| EngineError::not_found("ProductionLine", line_id))
    }

    /// 事务内查重叠并按策略处理
    fn check_overlap(
        conn: &Connection,
        policy: OverlapPolicy,
        line_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<&str>,
    ) -> EngineResult<Vec<String>> {
        let overlaps: Vec<String> =
            LineAllocationRepository::find_overlapping_tx(conn, line_id, start, end, exclude_id)?
                .into_iter()
                .map(|a| a.allocation_id)
                .collect();

        if overlaps.is_empty() {
            return Ok(overlaps);
        }

        match policy {
            OverlapPolicy::Warn => {
                warn!(
                    line_id = %line_id,
                    start = %start,
                    end = %end,
                    conflicting = ?overlaps,
                    "分配区间与同产线已有分配重叠（仅提示）"
                );
                Ok(overlaps)
            }
            OverlapPolicy::Reject => Err(EngineError::OverlapRejected {
                line_id: line_id.to_string(),
                conflicting: overlaps,
            }),
        }
    }

    fn build_outcome(
        allocation: LineAllocation,
        overlaps: Vec<String>,
        line: &ProductionLine,
    ) -> AllocationOutcome {
        let daily = allocation.planned_quantity as f64
            / inclusive_days(allocation.start_date, allocation.end_date) as f64;
        let exceeds_capacity = daily > line.capacity as f64;
        if exceeds_capacity {
            warn!(
                line = %line.name,
                daily_units = daily,
                capacity = line.capacity,
                "摊销日产量超过产线产能"
            );
        } else {
            debug!(line = %line.name, daily_units = daily, "摊销日产量在产能内");
        }
        AllocationOutcome {
            allocation,
            overlaps,
            exceeds_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_validate_rejects_reversed_range() {
        let err = AllocationScheduler::validate(d(2024, 1, 3), d(2024, 1, 1), 10).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { .. }));
    }

    #[test]
    fn test_validate_rejects_non_positive_quantity() {
        for qty in [0, -5] {
            let err = AllocationScheduler::validate(d(2024, 1, 1), d(2024, 1, 1), qty).unwrap_err();
            assert!(matches!(err, EngineError::InvalidQuantity { .. }));
        }
    }

    #[test]
    fn test_validate_accepts_single_day() {
        assert!(AllocationScheduler::validate(d(2024, 1, 1), d(2024, 1, 1), 1).is_ok());
    }
}

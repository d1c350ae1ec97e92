// ==========================================
// 成衣产线排产系统 - 进度跟踪引擎
// ==========================================
// 职责: 物料到货/发料状态机 + 生产记录累计（WIP、完成率）+ 款式/订单状态派生
// 红线: 各实体状态机相互独立，由事件驱动
// 红线: WIP/完成率/派生状态读时计算，不落库
// 红线: 人工状态 (manual_status) 优先于派生状态
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::material::{
    check_quantity_invariant, Material, MaterialFieldUpdate, MaterialIssue, MaterialReceipt,
};
use crate::domain::order::Style;
use crate::domain::production::{OrderProgress, ProcessTotals, StyleProgress};
use crate::domain::types::{MaterialStatus, OrderStatus, Process, StyleStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{
    MaterialRepository, OrderRepository, ProductionEntryRepository, StyleRepository,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// 物料事件处理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialEventOutcome {
    pub material: Material,
    // 到货累计超过需求量（仅提示，不拦截）
    pub over_received: bool,
    // 再次到货时携带了与首次不同的 PO 信息（已忽略）
    pub po_conflict: bool,
}

// ==========================================
// 物料状态机（纯函数）
// ==========================================

/// 应用到货事件
///
/// 规则:
/// - 允许状态: Pending / Ordered / Received；Issued 不再接收到货
/// - received += qty；received >= required → Received，否则 Ordered
/// - PO 号/日期各自在首次出现时记录，之后保持不变（不同值仅标记冲突）
pub fn apply_receipt(
    material: &Material,
    receipt: &MaterialReceipt,
) -> EngineResult<MaterialEventOutcome> {
    if !(receipt.quantity > 0.0) {
        return Err(EngineError::invalid_quantity("quantity", receipt.quantity));
    }
    if material.status == MaterialStatus::Issued {
        return Err(EngineError::InvalidStateTransition {
            from: material.status.to_string(),
            to: MaterialStatus::Received.to_string(),
        });
    }

    let mut updated = material.clone();
    updated.received_quantity += receipt.quantity;
    updated.status = if updated.received_quantity >= updated.required_quantity {
        MaterialStatus::Received
    } else {
        MaterialStatus::Ordered
    };

    // PO 号与 PO 日期各自只写一次：首个携带该字段的到货生效
    let mut po_conflict = false;
    match (&material.po_number, &receipt.po_number) {
        (None, Some(incoming)) => updated.po_number = Some(incoming.clone()),
        (Some(recorded), Some(incoming)) if recorded != incoming => po_conflict = true,
        _ => {}
    }
    match (material.po_date, receipt.po_date) {
        (None, Some(incoming)) => updated.po_date = Some(incoming),
        (Some(recorded), Some(incoming)) if recorded != incoming => po_conflict = true,
        _ => {}
    }

    if receipt.actual_delivery.is_some() {
        updated.actual_delivery = receipt.actual_delivery;
    }
    if receipt.remarks.is_some() {
        updated.remarks = receipt.remarks.clone();
    }

    Ok(MaterialEventOutcome {
        over_received: updated.is_over_received(),
        material: updated,
        po_conflict,
    })
}

/// 应用发料事件
///
/// 规则:
/// - 只允许从 Received 发料
/// - issued += qty 且 issued <= received
/// - issued >= required → Issued，否则保持 Received
pub fn apply_issue(material: &Material, issue: &MaterialIssue) -> EngineResult<Material> {
    if !(issue.quantity > 0.0) {
        return Err(EngineError::invalid_quantity("quantity", issue.quantity));
    }
    if material.status != MaterialStatus::Received {
        return Err(EngineError::InvalidStateTransition {
            from: material.status.to_string(),
            to: MaterialStatus::Issued.to_string(),
        });
    }

    let issued = material.issued_quantity + issue.quantity;
    if issued > material.received_quantity {
        return Err(EngineError::invalid_quantity("issued_quantity", issued));
    }

    let mut updated = material.clone();
    updated.issued_quantity = issued;
    updated.status = if issued >= updated.required_quantity {
        MaterialStatus::Issued
    } else {
        MaterialStatus::Received
    };
    if issue.remarks.is_some() {
        updated.remarks = issue.remarks.clone();
    }
    Ok(updated)
}

// ==========================================
// 生产进度（纯函数）
// ==========================================

/// 各工序 WIP = Σq(p) − Σq(next(p))，Dispatch 无后道工序不计
pub fn compute_wip(totals: &ProcessTotals) -> BTreeMap<Process, i64> {
    Process::PIPELINE
        .iter()
        .filter_map(|p| p.next().map(|next| (*p, totals.get(*p) - totals.get(next))))
        .collect()
}

/// 各工序完成率 = Σq(p) / 款式数量 × 100（款式数量为 0 时记 0）
pub fn completion_by_process(totals: &ProcessTotals, quantity: i64) -> BTreeMap<Process, f64> {
    Process::PIPELINE
        .iter()
        .map(|p| {
            let pct = if quantity > 0 {
                totals.get(*p) as f64 / quantity as f64 * 100.0
            } else {
                0.0
            };
            (*p, pct)
        })
        .collect()
}

/// 款式派生状态
///
/// - 出货量 >= 数量 × 阈值% → Completed（数量为 0 的款式不会自动完成）
/// - 任一工序有产出 → In Progress
/// - 否则 → New
pub fn derive_style_status(totals: &ProcessTotals, quantity: i64, threshold_pct: f64) -> StyleStatus {
    let dispatched = totals.get(Process::Dispatch) as f64;
    if quantity > 0 && dispatched >= quantity as f64 * threshold_pct / 100.0 {
        StyleStatus::Completed
    } else if totals.has_any_output() {
        StyleStatus::InProgress
    } else {
        StyleStatus::New
    }
}

/// 订单派生状态（输入为各款式的生效状态）
pub fn derive_order_status(style_statuses: &[StyleStatus]) -> OrderStatus {
    if !style_statuses.is_empty() && style_statuses.iter().all(|s| *s == StyleStatus::Completed) {
        OrderStatus::Completed
    } else if style_statuses.iter().any(|s| *s != StyleStatus::New) {
        OrderStatus::InProgress
    } else {
        OrderStatus::New
    }
}

// ==========================================
// ProgressTracker - 进度跟踪服务
// ==========================================
pub struct ProgressTracker {
    order_repo: Arc<OrderRepository>,
    style_repo: Arc<StyleRepository>,
    material_repo: Arc<MaterialRepository>,
    production_repo: Arc<ProductionEntryRepository>,
    config: Arc<dyn PlanningConfigReader>,
}

impl ProgressTracker {
    pub fn new(
        order_repo: Arc<OrderRepository>,
        style_repo: Arc<StyleRepository>,
        material_repo: Arc<MaterialRepository>,
        production_repo: Arc<ProductionEntryRepository>,
        config: Arc<dyn PlanningConfigReader>,
    ) -> Self {
        Self {
            order_repo,
            style_repo,
            material_repo,
            production_repo,
            config,
        }
    }

    /// 物料事件的读-改-写在同一 IMMEDIATE 事务内完成
    fn require_material_tx(conn: &Connection, material_id: &str) -> EngineResult<Material> {
        MaterialRepository::find_by_id_tx(conn, material_id)?
            .ok_or_else(|| EngineError::not_found("Material", material_id))
    }

    // ==========================================
    // 物料事件
    // ==========================================

    /// 物料到货
    pub fn receive_material(
        &self,
        material_id: &str,
        receipt: &MaterialReceipt,
    ) -> EngineResult<MaterialEventOutcome> {
        let (material, outcome) = self.material_repo.transact(
            |conn| -> EngineResult<(Material, MaterialEventOutcome)> {
                let material = Self::require_material_tx(conn, material_id)?;
                let outcome = apply_receipt(&material, receipt)?;
                MaterialRepository::apply_update_tx(conn, &outcome.material)?;
                Ok((material, outcome))
            },
        )?;

        if outcome.po_conflict {
            warn!(
                material_id = %material_id,
                recorded_po = ?material.po_number,
                incoming_po = ?receipt.po_number,
                "PO 信息已记录，忽略不一致的新值"
            );
        }
        if outcome.over_received {
            warn!(
                material_id = %material_id,
                received = outcome.material.received_quantity,
                required = outcome.material.required_quantity,
                "物料超量到货"
            );
        }
        info!(
            material_id = %material_id,
            quantity = receipt.quantity,
            status = %outcome.material.status,
            "物料到货已记录"
        );
        Ok(outcome)
    }

    /// 物料发料
    pub fn issue_material(&self, material_id: &str, issue: &MaterialIssue) -> EngineResult<Material> {
        let updated = self.material_repo.transact(|conn| -> EngineResult<Material> {
            let material = Self::require_material_tx(conn, material_id)?;
            let updated = apply_issue(&material, issue)?;
            MaterialRepository::apply_update_tx(conn, &updated)?;
            Ok(updated)
        })?;
        info!(
            material_id = %material_id,
            quantity = issue.quantity,
            status = %updated.status,
            "物料发料已记录"
        );
        Ok(updated)
    }

    /// 通用物料状态更新（状态与字段同事务落库）
    pub fn update_material_status(
        &self,
        material_id: &str,
        status: MaterialStatus,
        fields: &MaterialFieldUpdate,
    ) -> EngineResult<Material> {
        let material = self.material_repo.transact(|conn| -> EngineResult<Material> {
            let mut material = Self::require_material_tx(conn, material_id)?;
            fields.apply_to(&mut material);
            material.status = status;

            if let Err(message) =
                check_quantity_invariant(material.received_quantity, material.issued_quantity)
            {
                warn!(material_id = %material_id, %message, "物料数量不变量校验失败");
                let (field, value) = if material.received_quantity < 0.0 {
                    ("received_quantity", material.received_quantity)
                } else {
                    ("issued_quantity", material.issued_quantity)
                };
                return Err(EngineError::invalid_quantity(field, value));
            }

            MaterialRepository::apply_update_tx(conn, &material)?;
            Ok(material)
        })?;
        info!(material_id = %material_id, status = %status, "物料状态已更新");
        Ok(material)
    }

    // ==========================================
    // 进度视图
    // ==========================================

    /// 款式进度
    pub fn style_progress(&self, style_id: &str) -> EngineResult<StyleProgress> {
        let style = self
            .style_repo
            .find_by_id(style_id)?
            .ok_or_else(|| EngineError::not_found("Style", style_id))?;
        let threshold = self.config.style_completion_pct()?;
        self.build_style_progress(style, threshold)
    }

    /// 订单进度
    pub fn order_progress(&self, order_id: &str) -> EngineResult<OrderProgress> {
        let order = self
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::not_found("Order", order_id))?;
        let threshold = self.config.style_completion_pct()?;

        let styles = self
            .style_repo
            .find_by_order(order_id)?
            .into_iter()
            .map(|style| self.build_style_progress(style, threshold))
            .collect::<EngineResult<Vec<StyleProgress>>>()?;

        let statuses: Vec<StyleStatus> = styles.iter().map(|s| s.effective_status).collect();
        let derived_status = derive_order_status(&statuses);
        let dispatched_quantity: i64 = styles
            .iter()
            .map(|s| s.totals.get(Process::Dispatch))
            .sum();
        let completion_pct = if order.total_quantity > 0 {
            dispatched_quantity as f64 / order.total_quantity as f64 * 100.0
        } else {
            0.0
        };

        Ok(OrderProgress {
            effective_status: order.manual_status.unwrap_or(derived_status),
            order_id: order.order_id,
            po_number: order.po_number,
            total_quantity: order.total_quantity,
            dispatched_quantity,
            completion_pct,
            styles,
            derived_status,
            manual_status: order.manual_status,
        })
    }

    fn build_style_progress(&self, style: Style, threshold: f64) -> EngineResult<StyleProgress> {
        let totals = self.production_repo.process_totals_by_style(&style.style_id)?;
        let derived_status = derive_style_status(&totals, style.quantity, threshold);
        Ok(StyleProgress {
            wip: compute_wip(&totals),
            completion_pct: completion_by_process(&totals, style.quantity),
            effective_status: style.manual_status.unwrap_or(derived_status),
            derived_status,
            manual_status: style.manual_status,
            style_id: style.style_id,
            style_number: style.style_number,
            quantity: style.quantity,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MaterialType;
    use chrono::{NaiveDate, NaiveDateTime};

    fn material(required: f64) -> Material {
        Material {
            material_id: "M1".to_string(),
            style_id: "S1".to_string(),
            name: "Cotton Jersey".to_string(),
            material_type: MaterialType::Fabric,
            unit: Some("Meters".to_string()),
            required_quantity: required,
            received_quantity: 0.0,
            issued_quantity: 0.0,
            status: MaterialStatus::Pending,
            po_number: None,
            po_date: None,
            expected_delivery: None,
            actual_delivery: None,
            remarks: None,
            created_at: NaiveDateTime::default(),
        }
    }

    fn receipt(quantity: f64, po: Option<&str>) -> MaterialReceipt {
        MaterialReceipt {
            quantity,
            po_number: po.map(str::to_string),
            po_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            actual_delivery: None,
            remarks: None,
        }
    }

    #[test]
    fn test_full_receipt_transitions_to_received() {
        let outcome = apply_receipt(&material(100.0), &receipt(100.0, Some("PO-1"))).unwrap();
        assert_eq!(outcome.material.status, MaterialStatus::Received);
        assert!(!outcome.over_received);
        assert_eq!(outcome.material.po_number.as_deref(), Some("PO-1"));
    }

    #[test]
    fn test_partial_receipts_accumulate() {
        let first = apply_receipt(&material(100.0), &receipt(40.0, Some("PO-1"))).unwrap();
        assert_eq!(first.material.status, MaterialStatus::Ordered);

        let second = apply_receipt(&first.material, &receipt(30.0, Some("PO-2"))).unwrap();
        assert_eq!(second.material.received_quantity, 70.0);
        assert_eq!(second.material.status, MaterialStatus::Ordered);
        // PO 保持首次记录
        assert_eq!(second.material.po_number.as_deref(), Some("PO-1"));
        assert!(second.po_conflict);

        let third = apply_receipt(&second.material, &receipt(40.0, None)).unwrap();
        assert_eq!(third.material.received_quantity, 110.0);
        assert_eq!(third.material.status, MaterialStatus::Received);
        assert!(third.over_received);
    }

    #[test]
    fn test_po_fields_recorded_independently() {
        let number_only = MaterialReceipt {
            po_date: None,
            ..receipt(20.0, Some("PO-1"))
        };
        let first = apply_receipt(&material(100.0), &number_only).unwrap();
        assert_eq!(first.material.po_number.as_deref(), Some("PO-1"));
        assert_eq!(first.material.po_date, None);

        // 后续到货补充 PO 日期：应记录，不算冲突
        let second = apply_receipt(&first.material, &receipt(20.0, Some("PO-1"))).unwrap();
        assert_eq!(second.material.po_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(!second.po_conflict);

        // 已记录的日期不被覆盖
        let later_date = MaterialReceipt {
            po_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            ..receipt(10.0, None)
        };
        let third = apply_receipt(&second.material, &later_date).unwrap();
        assert_eq!(third.material.po_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(third.po_conflict);
    }

    #[test]
    fn test_issue_rules() {
        let received = apply_receipt(&material(100.0), &receipt(100.0, None))
            .unwrap()
            .material;

        let partial = apply_issue(&received, &MaterialIssue { quantity: 60.0, remarks: None }).unwrap();
        assert_eq!(partial.status, MaterialStatus::Received);

        let err = apply_issue(&partial, &MaterialIssue { quantity: 50.0, remarks: None }).unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity { .. }));

        let done = apply_issue(&partial, &MaterialIssue { quantity: 40.0, remarks: None }).unwrap();
        assert_eq!(done.status, MaterialStatus::Issued);

        let err = apply_receipt(&done, &receipt(1.0, None)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_issue_from_pending_rejected() {
        let err = apply_issue(&material(10.0), &MaterialIssue { quantity: 1.0, remarks: None })
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_wip_and_status() {
        let totals: ProcessTotals = vec![
            (Process::Cutting, 500),
            (Process::Stitching, 300),
            (Process::Packing, 100),
        ]
        .into_iter()
        .collect();

        let wip = compute_wip(&totals);
        assert_eq!(wip[&Process::Cutting], 200);
        assert_eq!(wip[&Process::Stitching], 200);
        assert_eq!(wip[&Process::Packing], 100);
        assert!(!wip.contains_key(&Process::Dispatch));

        assert_eq!(derive_style_status(&totals, 500, 100.0), StyleStatus::InProgress);
        assert_eq!(derive_style_status(&ProcessTotals::default(), 500, 100.0), StyleStatus::New);

        let mut shipped = totals.clone();
        shipped.add(Process::Dispatch, 475);
        assert_eq!(derive_style_status(&shipped, 500, 100.0), StyleStatus::InProgress);
        assert_eq!(derive_style_status(&shipped, 500, 95.0), StyleStatus::Completed);
    }

    #[test]
    fn test_order_status_derivation() {
        assert_eq!(derive_order_status(&[]), OrderStatus::New);
        assert_eq!(
            derive_order_status(&[StyleStatus::New, StyleStatus::New]),
            OrderStatus::New
        );
        assert_eq!(
            derive_order_status(&[StyleStatus::Completed, StyleStatus::New]),
            OrderStatus::InProgress
        );
        assert_eq!(
            derive_order_status(&[StyleStatus::Completed, StyleStatus::Completed]),
            OrderStatus::Completed
        );
    }
}

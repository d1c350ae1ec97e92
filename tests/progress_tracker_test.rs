// ==========================================
// 进度跟踪集成测试
// ==========================================
// 测试目标: 物料到货/发料、工序 WIP、款式/订单派生状态、人工覆写
// ==========================================


use garment_line_aps::api::ApiError;
use garment_line_aps::config::config_keys;
use garment_line_aps::domain::{MaterialFieldUpdate, MaterialIssue, MaterialReceipt};
use garment_line_aps::logging;
use garment_line_aps::{MaterialStatus, MaterialType, OrderStatus, Process, StyleStatus};
use test_helpers::{create_test_state, d, seed_line, seed_order, seed_order_with_style, seed_style};

fn receipt(quantity: f64, po: Option<&str>) -> MaterialReceipt {
    MaterialReceipt {
        quantity,
        po_number: po.map(str::to_string),
        po_date: po.map(|_| d(2024, 1, 2)),
        actual_delivery: Some(d(2024, 1, 10)),
        remarks: None,
    }
}

fn issue(quantity: f64) -> MaterialIssue {
    MaterialIssue {
        quantity,
        remarks: None,
    }
}

#[test]
fn test_material_receive_and_issue_flow() {
    logging::init_test();
    println!("\n=== 测试：物料到货与发料 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let (_, style) = seed_order_with_style(&state, "PO-001", "ST-A", 500);
    let api = &state.material_api;

    let material = api
        .add_material(&style.style_id, "Cotton Jersey", MaterialType::Fabric, Some("Meters".to_string()), 100.0)
        .unwrap();
    assert_eq!(material.status, MaterialStatus::Pending);

    // 部分到货 → Ordered
    let first = api
        .receive_material(&material.material_id, &receipt(60.0, Some("MPO-1")))
        .unwrap();
    assert_eq!(first.material.status, MaterialStatus::Ordered);
    assert_eq!(first.material.received_quantity, 60.0);
    assert_eq!(first.material.po_number.as_deref(), Some("MPO-1"));
    assert!(!first.po_conflict);

    // 尚未 Received 不能发料
    let early = api.issue_material(&material.material_id, &issue(10.0));
    assert!(matches!(early, Err(ApiError::InvalidStateTransition { .. })));

    // 第二次到货累计，PO 号保持首次值并标记冲突
    let second = api
        .receive_material(&material.material_id, &receipt(40.0, Some("MPO-2")))
        .unwrap();
    assert_eq!(second.material.status, MaterialStatus::Received);
    assert_eq!(second.material.received_quantity, 100.0);
    assert_eq!(second.material.po_number.as_deref(), Some("MPO-1"));
    assert!(second.po_conflict);
    assert!(!second.over_received);

    // 发料不能超过到货
    let too_much = api.issue_material(&material.material_id, &issue(120.0));
    assert!(matches!(too_much, Err(ApiError::ValidationError(_))));

    let partial = api.issue_material(&material.material_id, &issue(30.0)).unwrap();
    assert_eq!(partial.status, MaterialStatus::Received);
    assert_eq!(partial.available_quantity(), 70.0);

    let full = api.issue_material(&material.material_id, &issue(70.0)).unwrap();
    assert_eq!(full.status, MaterialStatus::Issued);

    // 已发完的物料不再接收到货
    let late = api.receive_material(&material.material_id, &receipt(5.0, None));
    assert!(matches!(late, Err(ApiError::InvalidStateTransition { .. })));

    // 持久化一致
    let stored = api.get_material(&material.material_id).unwrap();
    assert_eq!(stored.status, MaterialStatus::Issued);
    assert_eq!(stored.issued_quantity, 100.0);
    println!("✓ 物料到货与发料验证通过");
}

#[test]
fn test_over_receipt_and_manual_update() {
    logging::init_test();
    println!("\n=== 测试：超量到货与人工状态更新 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let (_, style) = seed_order_with_style(&state, "PO-001", "ST-A", 500);
    let api = &state.material_api;

    let material = api
        .add_material(&style.style_id, "Buttons", MaterialType::Trim, Some("Pieces".to_string()), 1000.0)
        .unwrap();

    let outcome = api
        .receive_material(&material.material_id, &receipt(1200.0, None))
        .unwrap();
    assert!(outcome.over_received);
    assert_eq!(outcome.material.status, MaterialStatus::Received);

    // 人工更新: 发料数量超过到货数量被拒绝
    let invalid = MaterialFieldUpdate {
        issued_quantity: Some(1500.0),
        ..MaterialFieldUpdate::default()
    };
    let result = api.update_material_status(&material.material_id, MaterialStatus::Issued, &invalid);
    assert!(matches!(result, Err(ApiError::ValidationError(_))));

    let valid = MaterialFieldUpdate {
        issued_quantity: Some(1000.0),
        remarks: Some("一次发完".to_string()),
        ..MaterialFieldUpdate::default()
    };
    let updated = api
        .update_material_status(&material.material_id, MaterialStatus::Issued, &valid)
        .unwrap();
    assert_eq!(updated.status, MaterialStatus::Issued);
    assert_eq!(updated.issued_quantity, 1000.0);
    assert_eq!(updated.remarks.as_deref(), Some("一次发完"));

    let materials = api.get_materials_by_style(&style.style_id).unwrap();
    assert_eq!(materials.len(), 1);
    println!("✓ 超量到货与人工更新验证通过");
}

#[test]
fn test_style_progress_wip_and_status() {
    logging::init_test();
    println!("\n=== 测试：款式 WIP 与派生状态 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let (order, style) = seed_order_with_style(&state, "PO-001", "ST-A", 100);
    let line = seed_line(&state, "Line 1", 200);
    let api = &state.production_api;

    let progress = api.style_progress(&style.style_id).unwrap();
    assert_eq!(progress.derived_status, StyleStatus::New);

    api.add_production_entry(d(2024, 1, 2), &style.style_id, &line.line_id, Process::Cutting, 100, Some(90.0), 0, None, None)
        .unwrap();
    api.add_production_entry(d(2024, 1, 3), &style.style_id, &line.line_id, Process::Stitching, 80, Some(85.0), 2, None, None)
        .unwrap();
    api.add_production_entry(d(2024, 1, 4), &style.style_id, &line.line_id, Process::Packing, 50, None, 0, None, None)
        .unwrap();
    api.add_production_entry(d(2024, 1, 5), &style.style_id, &line.line_id, Process::Dispatch, 40, None, 0, None, None)
        .unwrap();

    let progress = api.style_progress(&style.style_id).unwrap();
    assert_eq!(progress.wip[&Process::Cutting], 20);
    assert_eq!(progress.wip[&Process::Stitching], 30);
    assert_eq!(progress.wip[&Process::Packing], 10);
    assert!(!progress.wip.contains_key(&Process::Dispatch));
    assert_eq!(progress.completion_pct[&Process::Cutting], 100.0);
    assert_eq!(progress.derived_status, StyleStatus::InProgress);

    let order_progress = api.order_progress(&order.order_id).unwrap();
    assert_eq!(order_progress.dispatched_quantity, 40);
    assert_eq!(order_progress.completion_pct, 40.0);
    assert_eq!(order_progress.effective_status, OrderStatus::InProgress);

    // 出货补齐 → Completed
    api.add_production_entry(d(2024, 1, 6), &style.style_id, &line.line_id, Process::Dispatch, 60, None, 0, None, None)
        .unwrap();
    let progress = api.style_progress(&style.style_id).unwrap();
    assert_eq!(progress.derived_status, StyleStatus::Completed);
    let order_progress = api.order_progress(&order.order_id).unwrap();
    assert_eq!(order_progress.derived_status, OrderStatus::Completed);
    println!("✓ 款式 WIP 与派生状态验证通过");
}

#[test]
fn test_completion_threshold_is_configurable() {
    logging::init_test();
    println!("\n=== 测试：完成阈值配置 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let (_, style) = seed_order_with_style(&state, "PO-001", "ST-A", 100);
    let line = seed_line(&state, "Line 1", 200);
    let api = &state.production_api;

    api.add_production_entry(d(2024, 1, 5), &style.style_id, &line.line_id, Process::Dispatch, 95, None, 0, None, None)
        .unwrap();
    assert_eq!(
        api.style_progress(&style.style_id).unwrap().derived_status,
        StyleStatus::InProgress
    );

    state
        .config_manager
        .set_global_config_value(config_keys::STYLE_COMPLETION_PCT, "95")
        .unwrap();
    assert_eq!(
        api.style_progress(&style.style_id).unwrap().derived_status,
        StyleStatus::Completed
    );
    println!("✓ 完成阈值配置验证通过");
}

#[test]
fn test_manual_status_overrides_derived() {
    logging::init_test();
    println!("\n=== 测试：人工状态覆写 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let order = seed_order(&state, "PO-001");
    let style_a = seed_style(&state, &order.order_id, "ST-A", 100);
    let style_b = seed_style(&state, &order.order_id, "ST-B", 50);

    let progress = state.production_api.order_progress(&order.order_id).unwrap();
    assert_eq!(progress.effective_status, OrderStatus::New);

    // 款式人工完成 → 订单派生为 In Progress（另一款仍为 New）
    state
        .order_api
        .update_style_status(&style_a.style_id, Some(StyleStatus::Completed))
        .unwrap();
    let progress = state.production_api.order_progress(&order.order_id).unwrap();
    assert_eq!(progress.derived_status, OrderStatus::InProgress);

    state
        .order_api
        .update_style_status(&style_b.style_id, Some(StyleStatus::Completed))
        .unwrap();
    let progress = state.production_api.order_progress(&order.order_id).unwrap();
    assert_eq!(progress.derived_status, OrderStatus::Completed);

    // 订单取消覆写派生状态
    state
        .order_api
        .update_order_status(&order.order_id, Some(OrderStatus::Cancelled))
        .unwrap();
    let progress = state.production_api.order_progress(&order.order_id).unwrap();
    assert_eq!(progress.effective_status, OrderStatus::Cancelled);
    assert_eq!(progress.derived_status, OrderStatus::Completed);

    // 清除覆写 → 回到派生状态
    state.order_api.update_order_status(&order.order_id, None).unwrap();
    state.order_api.update_style_status(&style_b.style_id, None).unwrap();
    let progress = state.production_api.order_progress(&order.order_id).unwrap();
    assert_eq!(progress.effective_status, OrderStatus::InProgress);
    println!("✓ 人工状态覆写验证通过");
}

#[test]
fn test_dashboard_summary() {
    logging::init_test();
    println!("\n=== 测试：看板汇总 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let (_, style) = seed_order_with_style(&state, "PO-001", "ST-A", 100);
    seed_order(&state, "PO-002");
    let line = seed_line(&state, "Line 1", 200);
    let api = &state.production_api;

    let today = d(2024, 2, 1);
    // 窗口外（31 天前）
    api.add_production_entry(d(2024, 1, 1), &style.style_id, &line.line_id, Process::Cutting, 30, Some(70.0), 0, None, None)
        .unwrap();
    api.add_production_entry(d(2024, 1, 20), &style.style_id, &line.line_id, Process::Cutting, 70, Some(90.0), 0, None, None)
        .unwrap();
    api.add_production_entry(today, &style.style_id, &line.line_id, Process::Stitching, 40, Some(80.0), 1, None, None)
        .unwrap();

    state
        .material_api
        .add_material(&style.style_id, "Zipper", MaterialType::Accessories, None, 100.0)
        .unwrap();

    let summary = api.dashboard_summary(today).unwrap();
    assert_eq!(summary.total_orders, 2);
    assert_eq!(summary.orders_by_status.get("New"), Some(&1));
    assert_eq!(summary.orders_by_status.get("In Progress"), Some(&1));
    assert_eq!(summary.process_totals.get(&Process::Cutting), Some(&70));
    assert_eq!(summary.process_totals.get(&Process::Stitching), Some(&40));
    assert_eq!(summary.materials_by_status.get("Pending"), Some(&1));
    assert!(summary.line_efficiency.contains_key("Line 1"));
    println!("✓ 看板汇总验证通过");
}

#[test]
fn test_unknown_entities_are_not_found() {
    logging::init_test();
    let (_tmp, state) = create_test_state().unwrap();
    assert!(matches!(
        state.production_api.style_progress("missing"),
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        state.production_api.order_progress("missing"),
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        state.material_api.receive_material("missing", &receipt(1.0, None)),
        Err(ApiError::NotFound(_))
    ));
}

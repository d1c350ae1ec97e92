// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 订单总数量与款式同步、引用保护、唯一约束、持久化往返
// ==========================================


use garment_line_aps::api::ApiError;
use garment_line_aps::app::AppState;
use garment_line_aps::logging;
use garment_line_aps::{MaterialType, Process};
use test_helpers::{create_test_state, d, seed_line, seed_order, seed_order_with_style, seed_style, sizes};

#[test]
fn test_order_total_tracks_styles() {
    logging::init_test();
    println!("\n=== 测试：订单总数量随款式同步 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let order = seed_order(&state, "PO-001");
    assert_eq!(order.total_quantity, 0);

    seed_style(&state, &order.order_id, "ST-A", 120);
    assert_eq!(state.order_api.get_order(&order.order_id).unwrap().total_quantity, 120);

    let style_b = seed_style(&state, &order.order_id, "ST-B", 80);
    assert_eq!(state.order_api.get_order(&order.order_id).unwrap().total_quantity, 200);

    for i in 0..5 {
        seed_style(&state, &order.order_id, &format!("ST-N{}", i), 10);
    }
    assert_eq!(state.order_api.get_order(&order.order_id).unwrap().total_quantity, 250);

    // 删除未被引用的款式 → 重算
    let total = state.order_api.delete_style(&style_b.style_id).unwrap();
    assert_eq!(total, 170);
    assert_eq!(state.order_api.get_order(&order.order_id).unwrap().total_quantity, 170);
    assert_eq!(state.order_api.get_styles_by_order(&order.order_id).unwrap().len(), 6);
    println!("✓ 订单总数量同步验证通过");
}

#[test]
fn test_size_breakdown_must_match_quantity() {
    logging::init_test();
    println!("\n=== 测试：尺码分布与数量一致 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let order = seed_order(&state, "PO-001");

    let style = state
        .order_api
        .add_style(
            &order.order_id,
            "ST-A",
            Some("Basic Tee".to_string()),
            Some("T-shirt".to_string()),
            Some("Navy".to_string()),
            sizes(&[("S", 30), ("M", 50), ("L", 20)]),
            100,
        )
        .unwrap();
    let stored = state.order_api.get_style(&style.style_id).unwrap();
    assert_eq!(stored.size_breakdown.get("M"), Some(&50));
    assert_eq!(stored.color.as_deref(), Some("Navy"));

    let mismatch = state.order_api.add_style(
        &order.order_id,
        "ST-B",
        None,
        None,
        None,
        sizes(&[("S", 30), ("M", 50)]),
        100,
    );
    assert!(mismatch.is_err());
    assert_eq!(state.order_api.get_order(&order.order_id).unwrap().total_quantity, 100);
    println!("✓ 尺码分布校验通过");
}

fn assert_style_delete_blocked(state: &AppState, style_id: &str) {
    let result = state.order_api.delete_style(style_id);
    assert!(
        matches!(result, Err(ApiError::BusinessRuleViolation(_))),
        "被引用的款式不应被删除"
    );
    assert!(state.order_api.get_style(style_id).is_ok());
}

#[test]
fn test_referenced_style_cannot_be_deleted() {
    logging::init_test();
    println!("\n=== 测试：被引用款式删除保护 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let line = seed_line(&state, "Line 1", 100);

    // 物料引用
    let (_, with_material) = seed_order_with_style(&state, "PO-001", "ST-M", 100);
    state
        .material_api
        .add_material(&with_material.style_id, "Cotton", MaterialType::Fabric, None, 50.0)
        .unwrap();
    assert_style_delete_blocked(&state, &with_material.style_id);

    // 分配引用
    let (_, with_allocation) = seed_order_with_style(&state, "PO-002", "ST-A", 100);
    state
        .line_plan_api
        .allocate_style_to_line(&line.line_id, &with_allocation.style_id, d(2024, 1, 1), d(2024, 1, 2), 100, None)
        .unwrap();
    assert_style_delete_blocked(&state, &with_allocation.style_id);

    // 生产记录引用
    let (order, with_entry) = seed_order_with_style(&state, "PO-003", "ST-P", 100);
    state
        .production_api
        .add_production_entry(d(2024, 1, 1), &with_entry.style_id, &line.line_id, Process::Cutting, 10, None, 0, None, None)
        .unwrap();
    assert_style_delete_blocked(&state, &with_entry.style_id);

    // 订单级联删除同样受保护
    assert!(state.order_api.delete_order(&order.order_id).is_err());
    assert!(state.order_api.get_order(&order.order_id).is_ok());
    println!("✓ 引用保护验证通过");
}

#[test]
fn test_unreferenced_order_delete_cascades_styles() {
    logging::init_test();
    let (_tmp, state) = create_test_state().unwrap();
    let (order, style) = seed_order_with_style(&state, "PO-001", "ST-A", 100);

    state.order_api.delete_order(&order.order_id).unwrap();
    assert!(matches!(
        state.order_api.get_order(&order.order_id),
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        state.order_api.get_style(&style.style_id),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn test_unique_constraints() {
    logging::init_test();
    println!("\n=== 测试：唯一约束 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let order = seed_order(&state, "PO-001");

    let dup_po = state
        .order_api
        .add_order("PO-001", None, d(2024, 1, 1), d(2024, 2, 1));
    assert!(matches!(dup_po, Err(ApiError::BusinessRuleViolation(_))));

    seed_style(&state, &order.order_id, "ST-A", 10);
    let dup_style = state.order_api.add_style(
        &order.order_id,
        "ST-A",
        None,
        None,
        None,
        Default::default(),
        10,
    );
    assert!(dup_style.is_err());

    seed_line(&state, "Line 1", 100);
    let dup_line = state.line_plan_api.add_production_line("Line 1", 80, None);
    assert!(matches!(dup_line, Err(ApiError::BusinessRuleViolation(_))));

    let dup_buyer_first = state.order_api.add_buyer("Acme", None, None, None);
    assert!(dup_buyer_first.is_ok());
    let dup_buyer = state.order_api.add_buyer("Acme", None, None, None);
    assert!(dup_buyer.is_err());
    println!("✓ 唯一约束验证通过");
}

#[test]
fn test_order_validation_and_buyer_link() {
    logging::init_test();
    let (_tmp, state) = create_test_state().unwrap();

    // 交期早于下单日
    let bad_dates = state
        .order_api
        .add_order("PO-BAD", None, d(2024, 3, 1), d(2024, 2, 1));
    assert!(bad_dates.is_err());

    // 客户不存在
    let bad_buyer = state.order_api.add_order(
        "PO-X",
        Some("missing-buyer".to_string()),
        d(2024, 1, 1),
        d(2024, 2, 1),
    );
    assert!(matches!(bad_buyer, Err(ApiError::NotFound(_))));

    let buyer = state
        .order_api
        .add_buyer("Acme Apparel", Some("Jo".to_string()), None, None)
        .unwrap();
    let order = state
        .order_api
        .add_order("PO-OK", Some(buyer.buyer_id.clone()), d(2024, 1, 1), d(2024, 2, 1))
        .unwrap();
    let stored = state.order_api.get_order_by_po("PO-OK").unwrap();
    assert_eq!(stored.order_id, order.order_id);
    assert_eq!(stored.buyer_id.as_deref(), Some(buyer.buyer_id.as_str()));
    assert_eq!(state.order_api.get_all_buyers().unwrap().len(), 1);
}

#[test]
fn test_production_entry_validation() {
    logging::init_test();
    let (_tmp, state) = create_test_state().unwrap();
    let (_, style) = seed_order_with_style(&state, "PO-001", "ST-A", 100);
    let line = seed_line(&state, "Line 1", 100);
    let api = &state.production_api;

    // 效率超出 [0, 100]
    let bad_eff = api.add_production_entry(d(2024, 1, 1), &style.style_id, &line.line_id, Process::Cutting, 10, Some(120.0), 0, None, None);
    assert!(bad_eff.is_err());

    // 负数量
    let negative = api.add_production_entry(d(2024, 1, 1), &style.style_id, &line.line_id, Process::Cutting, -1, None, 0, None, None);
    assert!(negative.is_err());

    // 引用不存在
    let no_line = api.add_production_entry(d(2024, 1, 1), &style.style_id, "missing", Process::Cutting, 10, None, 0, None, None);
    assert!(matches!(no_line, Err(ApiError::NotFound(_))));

    api.add_production_entry(d(2024, 1, 1), &style.style_id, &line.line_id, Process::Cutting, 10, Some(88.0), 0, Some("换线".to_string()), None)
        .unwrap();
    let entries = api.get_entries_by_date_range(d(2024, 1, 1), d(2024, 1, 1)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].delay_reason.as_deref(), Some("换线"));
    assert!(matches!(
        api.get_entries_by_date_range(d(2024, 1, 2), d(2024, 1, 1)),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_orders_by_buyer() {
    logging::init_test();
    println!("\n=== 测试：按客户查询订单 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let api = &state.order_api;
    let acme = api.add_buyer("Acme Apparel", None, None, None).unwrap();
    let other = api.add_buyer("Northwind", None, None, None).unwrap();

    api.add_order("PO-A2", Some(acme.buyer_id.clone()), d(2024, 1, 1), d(2024, 3, 1))
        .unwrap();
    api.add_order("PO-A1", Some(acme.buyer_id.clone()), d(2024, 1, 1), d(2024, 2, 1))
        .unwrap();
    api.add_order("PO-N1", Some(other.buyer_id.clone()), d(2024, 1, 1), d(2024, 2, 1))
        .unwrap();
    seed_order(&state, "PO-NOBUYER");

    assert_eq!(api.get_buyer(&acme.buyer_id).unwrap().name, "Acme Apparel");
    let orders = api.get_orders_by_buyer(&acme.buyer_id).unwrap();
    let pos: Vec<_> = orders.iter().map(|o| o.po_number.as_str()).collect();
    assert_eq!(pos, vec!["PO-A1", "PO-A2"]);
    assert_eq!(api.get_orders_by_buyer(&other.buyer_id).unwrap().len(), 1);

    // 未知客户
    assert!(matches!(api.get_buyer("missing"), Err(ApiError::NotFound(_))));
    assert!(matches!(
        api.get_orders_by_buyer("missing"),
        Err(ApiError::NotFound(_))
    ));
    println!("✓ 按客户查询订单验证通过");
}

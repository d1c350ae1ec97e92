// ==========================================
// 并发控制集成测试
// ==========================================
// 测试目标: 多线程共享 AppState 时，重叠检测与写入原子、物料到货不丢更新
// ==========================================


use std::sync::{Arc, Barrier};
use std::thread;

use garment_line_aps::api::ApiError;
use garment_line_aps::config::config_keys;
use garment_line_aps::domain::MaterialReceipt;
use garment_line_aps::logging;
use garment_line_aps::{MaterialStatus, MaterialType};
use test_helpers::{create_test_state, d, seed_line, seed_order_with_style};

#[test]
fn test_concurrent_allocations_see_each_other_under_warn() {
    logging::init_test();
    println!("\n=== 测试：并发分配互相可见（Warn） ===");

    let (_tmp, state) = create_test_state().unwrap();
    let (_, s1) = seed_order_with_style(&state, "PO-001", "S1", 300);
    let (_, s2) = seed_order_with_style(&state, "PO-002", "S2", 300);
    let line = seed_line(&state, "L1", 100);

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [s1.style_id.clone(), s2.style_id.clone()]
        .into_iter()
        .map(|style_id| {
            let api = Arc::clone(&state.line_plan_api);
            let barrier = Arc::clone(&barrier);
            let line_id = line.line_id.clone();
            thread::spawn(move || {
                barrier.wait();
                api.allocate_style_to_line(&line_id, &style_id, d(2024, 1, 1), d(2024, 1, 3), 300, None)
            })
        })
        .collect();
    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    // 后提交者必然看到先提交者
    let ids: Vec<_> = outcomes.iter().map(|o| o.allocation.allocation_id.clone()).collect();
    let reported: Vec<_> = outcomes.iter().filter(|o| !o.overlaps.is_empty()).collect();
    assert_eq!(reported.len(), 1);
    let later = reported[0];
    let earlier_id = ids
        .iter()
        .find(|id| **id != later.allocation.allocation_id)
        .unwrap();
    assert_eq!(later.overlaps, vec![earlier_id.clone()]);

    let api = &state.line_plan_api;
    assert_eq!(api.get_allocations_by_line(&line.line_id).unwrap().len(), 2);
    for id in &ids {
        let others = api
            .detect_overlap(&line.line_id, d(2024, 1, 1), d(2024, 1, 3), Some(id.as_str()))
            .unwrap();
        assert_eq!(others.len(), 1);
        assert_ne!(&others[0], id);
    }
    println!("✓ 并发分配重叠检测验证通过");
}

#[test]
fn test_concurrent_allocations_commit_once_under_reject() {
    logging::init_test();
    println!("\n=== 测试：并发分配仅一个提交（Reject） ===");

    let (_tmp, state) = create_test_state().unwrap();
    state
        .config_manager
        .set_global_config_value(config_keys::OVERLAP_POLICY, "REJECT")
        .unwrap();
    let line = seed_line(&state, "L1", 100);
    let styles: Vec<_> = (0..4)
        .map(|i| seed_order_with_style(&state, &format!("PO-{}", i), &format!("S{}", i), 200).1)
        .collect();

    let barrier = Arc::new(Barrier::new(styles.len()));
    let handles: Vec<_> = styles
        .iter()
        .map(|style| {
            let api = Arc::clone(&state.line_plan_api);
            let barrier = Arc::clone(&barrier);
            let line_id = line.line_id.clone();
            let style_id = style.style_id.clone();
            thread::spawn(move || {
                barrier.wait();
                api.allocate_style_to_line(&line_id, &style_id, d(2024, 2, 1), d(2024, 2, 2), 200, None)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ApiError::OverlapRejected { .. })));
    assert_eq!(
        state
            .line_plan_api
            .get_allocations_by_line(&line.line_id)
            .unwrap()
            .len(),
        1
    );
    println!("✓ Reject 策略并发提交验证通过");
}

#[test]
fn test_concurrent_receipts_accumulate() {
    logging::init_test();
    println!("\n=== 测试：并发到货累计 ===");

    let (_tmp, state) = create_test_state().unwrap();
    let (_, style) = seed_order_with_style(&state, "PO-001", "S1", 100);
    let material = state
        .material_api
        .add_material(&style.style_id, "Cotton", MaterialType::Fabric, None, 1000.0)
        .unwrap();

    const THREADS: usize = 4;
    const RECEIPTS_PER_THREAD: usize = 200;
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let api = Arc::clone(&state.material_api);
            let barrier = Arc::clone(&barrier);
            let material_id = material.material_id.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..RECEIPTS_PER_THREAD {
                    let receipt = MaterialReceipt {
                        quantity: 1.0,
                        po_number: None,
                        po_date: None,
                        actual_delivery: None,
                        remarks: None,
                    };
                    api.receive_material(&material_id, &receipt).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = state.material_api.get_material(&material.material_id).unwrap();
    assert_eq!(stored.received_quantity, (THREADS * RECEIPTS_PER_THREAD) as f64);
    assert_eq!(stored.status, MaterialStatus::Ordered);
    println!("✓ 并发到货累计验证通过");
}

// ==========================================
// 工作簿导入集成测试
// ==========================================
// 测试目标: 四表导入、整体回滚、幂等重导、取消/截止、文件级错误
// ==========================================


use garment_line_aps::api::{ApiError, ImportApi};
use garment_line_aps::config::{ConfigManager, PlanningConfigReader};
use garment_line_aps::db::{init_schema, open_sqlite_connection};
use garment_line_aps::importer::{
    ImportError, ImportOptions, SheetData, WorkbookData, WorkbookImportService, WorkbookImporter,
};
use garment_line_aps::logging;
use garment_line_aps::repository::{
    BuyerRepository, MaterialRepository, OrderRepository, ProductionEntryRepository,
    ProductionLineRepository, StyleRepository,
};
use garment_line_aps::{MaterialStatus, OrderStatus};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use test_helpers::d;

struct Fixture {
    _tmp: NamedTempFile,
    conn: Arc<Mutex<Connection>>,
    service: WorkbookImportService,
}

impl Fixture {
    fn new() -> Self {
        let tmp = NamedTempFile::new().unwrap();
        let conn = open_sqlite_connection(&tmp.path().to_string_lossy()).unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let config: Arc<dyn PlanningConfigReader> = Arc::new(ConfigManager::new(conn.clone()));
        let service = WorkbookImportService::new(conn.clone(), config);
        Self {
            _tmp: tmp,
            conn,
            service,
        }
    }

    fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.conn.clone())
    }

    fn styles(&self) -> StyleRepository {
        StyleRepository::new(self.conn.clone())
    }
}

fn orders_sheet() -> SheetData {
    SheetData::from_rows(
        "Orders",
        &["po_number", "buyer_name", "order_date", "delivery_date", "status"],
        &[
            vec!["PO-1001", "Acme Apparel", "45292", "2024-02-15", ""],
            vec!["PO-1002", "Acme Apparel", "2024/01/05", "2024-03-01", "Cancelled"],
            vec!["", "", "", "", ""],
        ],
    )
}

fn styles_sheet() -> SheetData {
    SheetData::from_rows(
        "Styles",
        &["po_number", "style_number", "category", "color", "S", "M", "L"],
        &[
            vec!["PO-1001", "TS-01", "T-shirt", "White", "30", "50", "20"],
            vec!["PO-1001", "PT-02", "Pants", "Black", "10", "20", "10"],
            vec!["PO-1002", "JK-03", "Jacket", "", "5", "5", "0"],
        ],
    )
}

fn materials_sheet() -> SheetData {
    SheetData::from_rows(
        "Materials",
        &[
            "style_number",
            "material_name",
            "material_type",
            "unit",
            "required_quantity",
            "received_quantity",
            "issued_quantity",
        ],
        &[
            vec!["TS-01", "Cotton Jersey", "Fabric", "Meters", "150", "150", "0"],
            vec!["TS-01", "Neck Label", "Trims", "Pieces", "100", "0", "0"],
            vec!["PT-02", "Twill", "fabric", "Meters", "80", "40", "0"],
        ],
    )
}

fn production_sheet() -> SheetData {
    SheetData::from_rows(
        "Production",
        &["date", "style_number", "line_name", "process", "quantity", "capacity", "efficiency"],
        &[
            vec!["2024-01-10", "TS-01", "Line A", "Cutting", "100", "200", "92.5"],
            vec!["2024-01-11", "TS-01", "Line A", "Sewing", "60", "", "85"],
        ],
    )
}

fn full_workbook() -> WorkbookData {
    WorkbookData {
        orders: Some(orders_sheet()),
        styles: Some(styles_sheet()),
        materials: Some(materials_sheet()),
        production: Some(production_sheet()),
    }
}

#[test]
fn test_full_workbook_import() {
    logging::init_test();
    println!("\n=== 测试：四表完整导入 ===");

    let fx = Fixture::new();
    let summary = fx.service.apply(&full_workbook(), &ImportOptions::default()).unwrap();

    assert_eq!(summary.orders.inserted, 2);
    assert_eq!(summary.styles.inserted, 3);
    assert_eq!(summary.materials.inserted, 3);
    assert_eq!(summary.production.inserted, 2);
    assert_eq!(summary.buyers_created, 1);
    assert_eq!(summary.lines_created, 1);
    assert_eq!(summary.total_skipped(), 0);

    // Excel 序列日期 45292 = 2024-01-01
    let order = fx.orders().find_by_po("PO-1001").unwrap().unwrap();
    assert_eq!(order.order_date, d(2024, 1, 1));
    // 款式数量缺省为尺码合计，订单总数量重算
    assert_eq!(order.total_quantity, 140);
    assert!(order.manual_status.is_none());

    let cancelled = fx.orders().find_by_po("PO-1002").unwrap().unwrap();
    assert_eq!(cancelled.manual_status, Some(OrderStatus::Cancelled));
    assert_eq!(cancelled.total_quantity, 10);

    let buyer = BuyerRepository::new(fx.conn.clone())
        .find_by_name("Acme Apparel")
        .unwrap()
        .unwrap();
    assert_eq!(order.buyer_id.as_deref(), Some(buyer.buyer_id.as_str()));

    // 未给状态列时按数量推断物料状态
    let style = fx.styles().find_by_style_number("TS-01").unwrap().unwrap();
    let materials = MaterialRepository::new(fx.conn.clone())
        .find_by_style(&style.style_id)
        .unwrap();
    let jersey = materials.iter().find(|m| m.name == "Cotton Jersey").unwrap();
    assert_eq!(jersey.status, MaterialStatus::Received);
    let label = materials.iter().find(|m| m.name == "Neck Label").unwrap();
    assert_eq!(label.status, MaterialStatus::Pending);

    let line = ProductionLineRepository::new(fx.conn.clone())
        .find_by_name("Line A")
        .unwrap()
        .unwrap();
    assert_eq!(line.capacity, 200);
    let entries = ProductionEntryRepository::new(fx.conn.clone())
        .find_by_style(&style.style_id)
        .unwrap();
    assert_eq!(entries.len(), 2);
    println!("✓ 四表完整导入验证通过");
}

#[test]
fn test_reimport_is_idempotent() {
    logging::init_test();
    println!("\n=== 测试：重复导入幂等 ===");

    let fx = Fixture::new();
    let data = full_workbook();
    fx.service.apply(&data, &ImportOptions::default()).unwrap();

    let again = fx.service.apply(&data, &ImportOptions::default()).unwrap();
    assert_eq!(again.total_inserted(), 0);
    assert_eq!(again.orders.skipped, 2);
    assert_eq!(again.styles.skipped, 3);
    assert_eq!(again.materials.skipped, 3);
    assert_eq!(again.production.skipped, 2);
    assert_eq!(again.buyers_created, 0);
    assert_eq!(again.lines_created, 0);

    assert_eq!(fx.orders().list_all().unwrap().len(), 2);
    let order = fx.orders().find_by_po("PO-1001").unwrap().unwrap();
    assert_eq!(order.total_quantity, 140);
    println!("✓ 重复导入幂等验证通过");
}

#[test]
fn test_unknown_reference_rolls_back_everything() {
    logging::init_test();
    println!("\n=== 测试：未知引用整体回滚 ===");

    let fx = Fixture::new();
    let styles = SheetData::from_rows(
        "Styles",
        &["po_number", "style_number", "quantity"],
        &[
            vec!["PO-1001", "TS-01", "100"],
            vec!["PO-404", "XX-99", "10"],
        ],
    );
    let data = WorkbookData {
        orders: Some(orders_sheet()),
        styles: Some(styles),
        ..WorkbookData::default()
    };

    let err = fx.service.apply(&data, &ImportOptions::default()).unwrap_err();
    match err {
        ImportError::UnknownReference { sheet, row, entity, key } => {
            assert_eq!(sheet, "Styles");
            assert_eq!(row, 3);
            assert_eq!(entity, "Order");
            assert_eq!(key, "PO-404");
        }
        other => panic!("应返回 UnknownReference, 实际: {}", other),
    }

    // Orders 表中已写入的行也一并回滚
    assert!(fx.orders().list_all().unwrap().is_empty());
    println!("✓ 整体回滚验证通过");
}

#[test]
fn test_invalid_rows_abort_import() {
    logging::init_test();
    println!("\n=== 测试：非法行中止导入 ===");

    let fx = Fixture::new();

    // 日期格式错误
    let bad_date = WorkbookData {
        orders: Some(SheetData::from_rows(
            "Orders",
            &["po_number", "order_date", "delivery_date"],
            &[vec!["PO-1", "yesterday", "2024-02-01"]],
        )),
        ..WorkbookData::default()
    };
    let err = fx.service.apply(&bad_date, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::DateFormatError { .. }));

    // 缺少必需列
    let missing_column = WorkbookData {
        orders: Some(SheetData::from_rows(
            "Orders",
            &["po_number", "order_date"],
            &[vec!["PO-1", "2024-01-01"]],
        )),
        ..WorkbookData::default()
    };
    let err = fx.service.apply(&missing_column, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::ColumnMissing { .. }));

    // 新产线未提供产能
    let mut data = full_workbook();
    data.production = Some(SheetData::from_rows(
        "Production",
        &["date", "style_number", "line_name", "process", "quantity"],
        &[vec!["2024-01-10", "TS-01", "Line Z", "Cutting", "10"]],
    ));
    let err = fx.service.apply(&data, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::RowValidationError { .. }));

    assert!(fx.orders().list_all().unwrap().is_empty());

    // 空工作簿
    let err = fx
        .service
        .apply(&WorkbookData::default(), &ImportOptions::default())
        .unwrap_err();
    assert!(matches!(err, ImportError::SheetMissing));
    println!("✓ 非法行中止验证通过");
}

#[test]
fn test_cancel_and_deadline() {
    logging::init_test();
    println!("\n=== 测试：取消与截止时长 ===");

    let fx = Fixture::new();

    let cancelled = ImportOptions::default();
    cancelled.cancel.cancel();
    let err = fx.service.apply(&full_workbook(), &cancelled).unwrap_err();
    assert!(matches!(err, ImportError::Cancelled));
    assert!(fx.orders().list_all().unwrap().is_empty());

    let expired = ImportOptions::with_deadline(Duration::ZERO);
    let err = fx.service.apply(&full_workbook(), &expired).unwrap_err();
    assert!(matches!(err, ImportError::DeadlineExceeded(_)));
    assert!(fx.orders().list_all().unwrap().is_empty());

    // 正常导入不受之前失败影响
    let summary = fx
        .service
        .apply(&full_workbook(), &ImportOptions::with_deadline(Duration::from_secs(60)))
        .unwrap();
    assert_eq!(summary.orders.inserted, 2);
    println!("✓ 取消与截止时长验证通过");
}

#[tokio::test]
async fn test_file_level_errors() {
    logging::init_test();
    println!("\n=== 测试：文件级错误 ===");

    let fx = Fixture::new();

    let err = fx
        .service
        .import_workbook("/nonexistent/orders.xlsx".into(), ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::FileNotFound(_)));

    let csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    let err = fx
        .service
        .import_workbook(csv.path().to_path_buf(), ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(_)));

    // API 层映射
    let api = ImportApi::new(Arc::new(fx.service.clone()));
    let err = api
        .import_workbook("/nonexistent/orders.xlsx", ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    let err = api.import_workbook("  ", ImportOptions::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
    println!("✓ 文件级错误验证通过");
}

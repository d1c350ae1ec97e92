// ==========================================
// 成衣产线排产系统 - 工作簿导入实现
// ==========================================
// 流程:
// 1. 文件整体解析到内存 (WorkbookParser)
// 2. 字段映射与类型转换 (FieldMapper)
// 3. 单个 IMMEDIATE 事务内按 Orders → Styles → Materials → Production 顺序落库
// 4. 任一行失败 / 超过截止时长 / 被取消 → 整体回滚
// 幂等: 已存在的订单/款式/物料/生产记录跳过，重复导入不产生重复数据
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::material::Material;
use crate::domain::order::{NewOrder, NewStyle};
use crate::domain::production::NewProductionEntry;
use crate::domain::types::{MaterialStatus, OrderStatus, StyleStatus};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{
    FieldMapper, MaterialRow, ORDER_COLUMNS, MATERIAL_COLUMNS, PRODUCTION_COLUMNS, STYLE_COLUMNS,
};
use crate::importer::file_parser::{SheetData, WorkbookData, WorkbookParser};
use crate::importer::workbook_importer_trait::{
    CancellationFlag, ImportOptions, ImportSummary, SheetSummary, WorkbookImporter,
};
use crate::repository::error::RepositoryError;
use crate::repository::row_utils::now;
use crate::repository::{
    BuyerRepository, MaterialRepository, OrderRepository, ProductionEntryRepository,
    ProductionLineRepository, StyleRepository,
};
use async_trait::async_trait;
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 截止时长 + 取消检查
struct ImportGuard<'a> {
    started: Instant,
    deadline: Duration,
    cancel: &'a CancellationFlag,
}

impl ImportGuard<'_> {
    fn check(&self) -> ImportResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        if self.started.elapsed() > self.deadline {
            return Err(ImportError::DeadlineExceeded(self.deadline));
        }
        Ok(())
    }
}

fn row_error(sheet: &str, row: usize) -> impl FnOnce(RepositoryError) -> ImportError + '_ {
    move |source| ImportError::RowWriteError {
        sheet: sheet.to_string(),
        row,
        source,
    }
}

fn unknown_reference(sheet: &str, row: usize, entity: &str, key: &str) -> ImportError {
    ImportError::UnknownReference {
        sheet: sheet.to_string(),
        row,
        entity: entity.to_string(),
        key: key.to_string(),
    }
}

// ==========================================
// WorkbookImportService
// ==========================================
#[derive(Clone)]
pub struct WorkbookImportService {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn PlanningConfigReader>,
}

impl WorkbookImportService {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<dyn PlanningConfigReader>) -> Self {
        Self { conn, config }
    }

    /// 解析并导入工作簿文件（同步，阻塞调用方线程）
    #[instrument(skip(self, file_path, options), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        options: &ImportOptions,
    ) -> ImportResult<ImportSummary> {
        let data = WorkbookParser.parse(file_path.as_ref())?;
        info!(rows = data.total_rows(), "工作簿解析完成");
        self.apply(&data, options)
    }

    /// 将已解析的工作簿数据在单个事务内落库
    #[instrument(skip(self, data, options), fields(rows = data.total_rows()))]
    pub fn apply(&self, data: &WorkbookData, options: &ImportOptions) -> ImportResult<ImportSummary> {
        if data.is_empty() {
            return Err(ImportError::SheetMissing);
        }
        // 配置与导入共用连接锁，先读配置
        let deadline = match options.deadline {
            Some(d) => d,
            None => Duration::from_secs(self.config.import_deadline_secs()?),
        };
        let guard = ImportGuard {
            started: Instant::now(),
            deadline,
            cancel: &options.cancel,
        };

        let mut summary = ImportSummary {
            import_id: Uuid::new_v4().to_string(),
            ..ImportSummary::default()
        };

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        let result = Self::apply_all(&tx, data, &guard, &mut summary);
        if let Err(e) = result {
            // tx 随 drop 回滚
            warn!(import_id = %summary.import_id, error = %e, "导入失败，事务已整体回滚");
            return Err(e);
        }

        guard.check()?;
        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        summary.elapsed_ms = guard.started.elapsed().as_millis() as u64;
        info!(
            import_id = %summary.import_id,
            inserted = summary.total_inserted(),
            skipped = summary.total_skipped(),
            elapsed_ms = summary.elapsed_ms,
            "导入完成"
        );
        Ok(summary)
    }

    fn apply_all(
        conn: &Connection,
        data: &WorkbookData,
        guard: &ImportGuard<'_>,
        summary: &mut ImportSummary,
    ) -> ImportResult<()> {
        if let Some(sheet) = &data.orders {
            summary.orders = Self::apply_orders(conn, sheet, guard, &mut summary.buyers_created)?;
        }
        if let Some(sheet) = &data.styles {
            summary.styles = Self::apply_styles(conn, sheet, guard)?;
        }
        if let Some(sheet) = &data.materials {
            summary.materials = Self::apply_materials(conn, sheet, guard)?;
        }
        if let Some(sheet) = &data.production {
            summary.production =
                Self::apply_production(conn, sheet, guard, &mut summary.lines_created)?;
        }
        Ok(())
    }

    // ==========================================
    // Orders
    // ==========================================
    fn apply_orders(
        conn: &Connection,
        sheet: &SheetData,
        guard: &ImportGuard<'_>,
        buyers_created: &mut usize,
    ) -> ImportResult<SheetSummary> {
        sheet.require_columns(&ORDER_COLUMNS)?;
        let mapper = FieldMapper::new(&sheet.name);
        let mut stats = SheetSummary::default();

        for (row_number, raw) in &sheet.rows {
            guard.check()?;
            let row = mapper.map_order(*row_number, raw)?;
            let on_err = || row_error(&sheet.name, row.row);

            if OrderRepository::find_by_po_tx(conn, &row.po_number).map_err(on_err())?.is_some() {
                debug!(po_number = %row.po_number, "订单已存在，跳过");
                stats.skipped += 1;
                continue;
            }

            let buyer_id = match &row.buyer_name {
                None => None,
                Some(name) => match BuyerRepository::find_by_name_tx(conn, name).map_err(on_err())? {
                    Some(buyer) => Some(buyer.buyer_id),
                    None => {
                        *buyers_created += 1;
                        let buyer = BuyerRepository::insert_tx(conn, name, None, None, None)
                            .map_err(on_err())?;
                        Some(buyer.buyer_id)
                    }
                },
            };

            let new_order = NewOrder {
                po_number: row.po_number.clone(),
                buyer_id,
                order_date: row.order_date,
                delivery_date: row.delivery_date,
            };
            OrderRepository::insert_tx(conn, &new_order, Self::order_override(row.status))
                .map_err(on_err())?;
            stats.inserted += 1;
        }
        Ok(stats)
    }

    /// 导入的状态列只保留无法由生产数据派生的终态
    fn order_override(status: Option<OrderStatus>) -> Option<OrderStatus> {
        status.filter(|s| matches!(s, OrderStatus::Cancelled | OrderStatus::Completed))
    }

    fn style_override(status: Option<StyleStatus>) -> Option<StyleStatus> {
        status.filter(|s| *s == StyleStatus::Completed)
    }

    // ==========================================
    // Styles
    // ==========================================
    fn apply_styles(
        conn: &Connection,
        sheet: &SheetData,
        guard: &ImportGuard<'_>,
    ) -> ImportResult<SheetSummary> {
        sheet.require_columns(&STYLE_COLUMNS)?;
        let mapper = FieldMapper::new(&sheet.name);
        let mut stats = SheetSummary::default();
        let mut touched_orders = BTreeSet::new();

        for (row_number, raw) in &sheet.rows {
            guard.check()?;
            let row = mapper.map_style(*row_number, raw)?;
            let on_err = || row_error(&sheet.name, row.row);

            let order = OrderRepository::find_by_po_tx(conn, &row.po_number)
                .map_err(on_err())?
                .ok_or_else(|| unknown_reference(&sheet.name, row.row, "Order", &row.po_number))?;

            if StyleRepository::find_in_order_tx(conn, &order.order_id, &row.style_number)
                .map_err(on_err())?
                .is_some()
            {
                debug!(po_number = %row.po_number, style_number = %row.style_number, "款式已存在，跳过");
                stats.skipped += 1;
                continue;
            }

            let new_style = NewStyle {
                order_id: order.order_id.clone(),
                style_number: row.style_number.clone(),
                description: row.description.clone(),
                category: row.category.clone(),
                color: row.color.clone(),
                size_breakdown: row.size_breakdown.clone(),
                quantity: row.quantity,
            };
            StyleRepository::insert_tx(conn, &new_style, Self::style_override(row.status))
                .map_err(on_err())?;
            touched_orders.insert(order.order_id);
            stats.inserted += 1;
        }

        for order_id in &touched_orders {
            OrderRepository::recompute_total_quantity_tx(conn, order_id)?;
        }
        Ok(stats)
    }

    // ==========================================
    // Materials
    // ==========================================
    fn apply_materials(
        conn: &Connection,
        sheet: &SheetData,
        guard: &ImportGuard<'_>,
    ) -> ImportResult<SheetSummary> {
        sheet.require_columns(&MATERIAL_COLUMNS)?;
        let mapper = FieldMapper::new(&sheet.name);
        let mut stats = SheetSummary::default();

        for (row_number, raw) in &sheet.rows {
            guard.check()?;
            let row = mapper.map_material(*row_number, raw)?;
            let on_err = || row_error(&sheet.name, row.row);

            let style = StyleRepository::find_by_style_number_tx(conn, &row.style_number)
                .map_err(on_err())?
                .ok_or_else(|| unknown_reference(&sheet.name, row.row, "Style", &row.style_number))?;

            if MaterialRepository::find_by_identity_tx(
                conn,
                &style.style_id,
                &row.name,
                row.material_type.as_str(),
            )
            .map_err(on_err())?
            .is_some()
            {
                stats.skipped += 1;
                continue;
            }

            if row.required_quantity < 0.0 {
                return Err(ImportError::RowValidationError {
                    sheet: sheet.name.clone(),
                    row: row.row,
                    message: format!("需求数量不能为负: {}", row.required_quantity),
                });
            }

            let material = Self::material_from_row(&row, style.style_id);
            MaterialRepository::insert_material_tx(conn, &material).map_err(on_err())?;
            stats.inserted += 1;
        }
        Ok(stats)
    }

    /// 未给出状态列时按数量推断
    fn material_from_row(row: &MaterialRow, style_id: String) -> Material {
        let status = row.status.unwrap_or(if row.received_quantity <= 0.0 {
            MaterialStatus::Pending
        } else if row.issued_quantity >= row.required_quantity {
            MaterialStatus::Issued
        } else if row.received_quantity >= row.required_quantity {
            MaterialStatus::Received
        } else {
            MaterialStatus::Ordered
        });

        Material {
            material_id: Uuid::new_v4().to_string(),
            style_id,
            name: row.name.clone(),
            material_type: row.material_type,
            unit: row.unit.clone(),
            required_quantity: row.required_quantity,
            received_quantity: row.received_quantity,
            issued_quantity: row.issued_quantity,
            status,
            po_number: row.po_number.clone(),
            po_date: row.po_date,
            expected_delivery: row.expected_delivery,
            actual_delivery: row.actual_delivery,
            remarks: row.remarks.clone(),
            created_at: now(),
        }
    }

    // ==========================================
    // Production
    // ==========================================
    fn apply_production(
        conn: &Connection,
        sheet: &SheetData,
        guard: &ImportGuard<'_>,
        lines_created: &mut usize,
    ) -> ImportResult<SheetSummary> {
        sheet.require_columns(&PRODUCTION_COLUMNS)?;
        let mapper = FieldMapper::new(&sheet.name);
        let mut stats = SheetSummary::default();

        for (row_number, raw) in &sheet.rows {
            guard.check()?;
            let row = mapper.map_production(*row_number, raw)?;
            let on_err = || row_error(&sheet.name, row.row);

            let style = StyleRepository::find_by_style_number_tx(conn, &row.style_number)
                .map_err(on_err())?
                .ok_or_else(|| unknown_reference(&sheet.name, row.row, "Style", &row.style_number))?;

            let line = match ProductionLineRepository::find_by_name_tx(conn, &row.line_name)
                .map_err(on_err())?
            {
                Some(line) => line,
                None => {
                    // 新产线必须提供正产能
                    let capacity = row.capacity.filter(|c| *c > 0).ok_or_else(|| {
                        ImportError::RowValidationError {
                            sheet: sheet.name.clone(),
                            row: row.row,
                            message: format!("产线 '{}' 不存在且未提供有效产能", row.line_name),
                        }
                    })?;
                    *lines_created += 1;
                    ProductionLineRepository::insert_tx(conn, &row.line_name, capacity, None)
                        .map_err(on_err())?
                }
            };

            if ProductionEntryRepository::exists_tx(
                conn,
                row.date,
                &style.style_id,
                &line.line_id,
                row.process,
            )
            .map_err(on_err())?
            {
                stats.skipped += 1;
                continue;
            }

            let entry = NewProductionEntry {
                date: row.date,
                style_id: style.style_id,
                line_id: line.line_id,
                process: row.process,
                quantity: row.quantity,
                efficiency: row.efficiency,
                defects: row.defects,
                delay_reason: row.delay_reason.clone(),
                remarks: row.remarks.clone(),
            };
            ProductionEntryRepository::insert_tx(conn, &entry).map_err(on_err())?;
            stats.inserted += 1;
        }
        Ok(stats)
    }
}

#[async_trait]
impl WorkbookImporter for WorkbookImportService {
    async fn import_workbook(
        &self,
        file_path: PathBuf,
        options: ImportOptions,
    ) -> ImportResult<ImportSummary> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.import_file(&file_path, &options))
            .await
            .map_err(|e| ImportError::InternalError(format!("导入任务异常终止: {}", e)))?
    }
}

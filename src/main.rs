// ==========================================
// 成衣产线排产系统 - 命令行入口
// ==========================================
// 用法: garment-line-aps [db_path] [workbook.xlsx]
// 1. 初始化日志
// 2. 打开/初始化数据库
// 3. 可选导入工作簿
// 4. 输出各产线未来 14 天负荷
// ==========================================

use anyhow::{anyhow, Context};
use chrono::{Duration, Local};
use garment_line_aps::app::{get_default_db_path, AppState};
use garment_line_aps::importer::ImportOptions;
use garment_line_aps::{logging, APP_NAME, VERSION};

// 负荷预览天数（含当天）
const LOAD_PREVIEW_DAYS: i64 = 14;

fn main() {
    logging::init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "运行失败");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing::info!(app = APP_NAME, version = VERSION, "启动");

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let workbook = args.next();

    tracing::info!(db_path = %db_path, "使用数据库");
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    if let Some(path) = workbook {
        let runtime = tokio::runtime::Runtime::new().context("无法创建异步运行时")?;
        let summary = runtime
            .block_on(state.import_api.import_workbook(&path, ImportOptions::default()))
            .with_context(|| format!("导入失败: {}", path))?;
        tracing::info!(
            import_id = %summary.import_id,
            orders = summary.orders.inserted,
            styles = summary.styles.inserted,
            materials = summary.materials.inserted,
            production = summary.production.inserted,
            skipped = summary.total_skipped(),
            elapsed_ms = summary.elapsed_ms,
            "导入完成"
        );
    }

    let today = Local::now().date_naive();
    let end = today + Duration::days(LOAD_PREVIEW_DAYS - 1);
    let matrix = state.line_plan_api.load_matrix(today, end)?;
    if matrix.is_empty() {
        tracing::info!("无启用产线");
    }

    for row in &matrix {
        let peak = row.daily.values().cloned().fold(0.0_f64, f64::max);
        let overloaded = row.daily.values().filter(|pct| **pct > 100.0).count();
        tracing::info!(
            line_id = %row.line_id,
            line_name = %row.line_name,
            capacity = row.capacity,
            peak_pct = peak,
            overloaded_days = overloaded,
            "产线负荷"
        );
        for (date, pct) in &row.daily {
            tracing::debug!(line_id = %row.line_id, date = %date, load_pct = pct, "日负荷");
        }
    }

    Ok(())
}

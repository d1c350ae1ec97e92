// ==========================================
// 成衣产线排产系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约束: 全部仓储共享同一个 Arc<Mutex<Connection>>
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ImportApi, LinePlanApi, MaterialApi, OrderApi, ProductionApi};
use crate::config::{ConfigManager, PlanningConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{AllocationScheduler, LoadCalculator, ProgressTracker};
use crate::importer::WorkbookImportService;
use crate::repository::{
    BuyerRepository, LineAllocationRepository, MaterialRepository, OrderRepository,
    ProductionEntryRepository, ProductionLineRepository, StyleRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 订单/款式API
    pub order_api: Arc<OrderApi>,

    /// 物料API
    pub material_api: Arc<MaterialApi>,

    /// 产线计划API
    pub line_plan_api: Arc<LinePlanApi>,

    /// 生产记录与进度API
    pub production_api: Arc<ProductionApi>,

    /// 工作簿导入API
    pub import_api: Arc<ImportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 为内存库）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 1. 打开连接并初始化 schema
    /// 2. 初始化所有Repository
    /// 3. 初始化所有Engine
    /// 4. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库 schema 初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let buyer_repo = Arc::new(BuyerRepository::new(conn.clone()));
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let style_repo = Arc::new(StyleRepository::new(conn.clone()));
        let material_repo = Arc::new(MaterialRepository::new(conn.clone()));
        let line_repo = Arc::new(ProductionLineRepository::new(conn.clone()));
        let allocation_repo = Arc::new(LineAllocationRepository::new(conn.clone()));
        let production_repo = Arc::new(ProductionEntryRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let config_manager = Arc::new(ConfigManager::new(conn.clone()));
        let config: Arc<dyn PlanningConfigReader> = config_manager.clone();

        let scheduler = Arc::new(AllocationScheduler::new(
            allocation_repo.clone(),
            config.clone(),
        ));
        let load_calculator = Arc::new(LoadCalculator::new(
            line_repo.clone(),
            allocation_repo.clone(),
            config.clone(),
        ));
        let tracker = Arc::new(ProgressTracker::new(
            order_repo.clone(),
            style_repo.clone(),
            material_repo.clone(),
            production_repo.clone(),
            config.clone(),
        ));
        let importer = Arc::new(WorkbookImportService::new(conn.clone(), config));

        // ==========================================
        // 创建API实例
        // ==========================================
        let order_api = Arc::new(OrderApi::new(
            buyer_repo,
            order_repo.clone(),
            style_repo.clone(),
        ));
        let material_api = Arc::new(MaterialApi::new(
            material_repo.clone(),
            style_repo.clone(),
            tracker.clone(),
        ));
        let line_plan_api = Arc::new(LinePlanApi::new(
            line_repo.clone(),
            allocation_repo,
            scheduler,
            load_calculator,
        ));
        let production_api = Arc::new(ProductionApi::new(
            production_repo,
            style_repo,
            line_repo,
            order_repo,
            material_repo,
            tracker,
        ));
        let import_api = Arc::new(ImportApi::new(importer));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            order_api,
            material_api,
            line_plan_api,
            production_api,
            import_api,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 GARMENT_LINE_APS_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("GARMENT_LINE_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./garment_line_aps.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("garment-line-aps");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("garment_line_aps.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_in_memory() {
        let state = AppState::new(":memory:".to_string()).unwrap();
        assert!(state.order_api.get_all_orders().unwrap().is_empty());
    }
}

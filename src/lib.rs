// ==========================================
// 成衣产线排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 产线产能分配与订单/物料进度跟踪核心（单进程库）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/schema）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    MaterialStatus, MaterialType, OrderStatus, OverlapPolicy, Process, StyleStatus,
};

// 领域实体
pub use domain::{
    AllocationOutcome, Buyer, LineAllocation, Material, Order, ProductionEntry, ProductionLine,
    Style,
};

// 引擎
pub use engine::{AllocationScheduler, EngineError, LoadCalculator, ProgressTracker};

// API
pub use api::{ApiError, ImportApi, LinePlanApi, MaterialApi, OrderApi, ProductionApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "成衣产线排产系统";

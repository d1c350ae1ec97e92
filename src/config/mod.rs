// ==========================================
// 成衣产线排产系统 - 配置层
// ==========================================
// 职责: 系统配置管理（重叠策略、完成率阈值、导入截止时长、超负荷阈值）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod planning_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use planning_config_trait::{PlanningConfigReader, StaticPlanningConfig};

// ==========================================
// 成衣产线排产系统 - API 层
// ==========================================
// 职责: 面向界面/报表/导入等协作方的操作入口
// 约定: 所有失败以 ApiError 显式返回
// ==========================================

pub mod error;
pub mod import_api;
pub mod line_plan_api;
pub mod material_api;
pub mod order_api;
pub mod production_api;

pub use error::{ApiError, ApiResult};
pub use import_api::ImportApi;
pub use line_plan_api::LinePlanApi;
pub use material_api::MaterialApi;
pub use order_api::OrderApi;
pub use production_api::ProductionApi;

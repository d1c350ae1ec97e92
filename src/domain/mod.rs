// ==========================================
// 成衣产线排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、实体级不变量
// 红线: 不含数据访问逻辑,不含引擎逻辑
// 关系: 以外键字段显式表达，经仓储查询解析，无懒加载
// ==========================================

pub mod line;
pub mod material;
pub mod order;
pub mod production;
pub mod types;

// 重导出核心类型
pub use line::{AllocationOutcome, AllocationRequest, LineAllocation, ProductionLine};
pub use material::{Material, MaterialFieldUpdate, MaterialIssue, MaterialReceipt, NewMaterial};
pub use order::{Buyer, NewOrder, NewStyle, Order, SizeBreakdown, Style};
pub use production::{
    NewProductionEntry, OrderProgress, ProcessTotals, ProductionEntry, StyleProgress,
};
pub use types::{
    MaterialStatus, MaterialType, OrderStatus, OverlapPolicy, Process, StyleStatus,
};

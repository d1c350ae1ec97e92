// ==========================================
// 成衣产线排产系统 - 引擎层
// ==========================================
// 职责: 实现业务规则（分配调度、负荷计算、进度跟踪、看板汇总）
// 红线: Engine 不拼 SQL，数据访问统一经由 repository
// ==========================================

pub mod allocation_scheduler;
pub mod dashboard;
pub mod error;
pub mod load_calculator;
pub mod progress_tracker;

// 重导出核心引擎
pub use allocation_scheduler::AllocationScheduler;
pub use dashboard::DashboardSummary;
pub use error::{EngineError, EngineResult};
pub use load_calculator::{LineLoadRow, LoadCalculator};
pub use progress_tracker::{MaterialEventOutcome, ProgressTracker};

// ==========================================
// 成衣产线排产系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: *_tx 关联函数供跨仓储的单事务组合写入复用
// ==========================================

pub mod allocation_repo;
pub mod buyer_repo;
pub mod error;
pub mod line_repo;
pub mod material_repo;
pub mod order_repo;
pub mod production_repo;
pub mod row_utils;
pub mod style_repo;

// 重导出核心仓储
pub use allocation_repo::LineAllocationRepository;
pub use buyer_repo::BuyerRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use line_repo::ProductionLineRepository;
pub use material_repo::MaterialRepository;
pub use order_repo::OrderRepository;
pub use production_repo::ProductionEntryRepository;
pub use style_repo::StyleRepository;

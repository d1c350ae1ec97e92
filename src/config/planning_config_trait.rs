// ==========================================
// 成衣产线排产系统 - 排产配置读取 Trait
// ==========================================
// 职责: 定义调度器/进度跟踪/导入所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::OverlapPolicy;
use crate::repository::error::RepositoryResult;

/// 默认值
pub mod defaults {
    use crate::domain::types::OverlapPolicy;

    pub const OVERLAP_POLICY: OverlapPolicy = OverlapPolicy::Warn;
    pub const STYLE_COMPLETION_PCT: f64 = 100.0;
    pub const IMPORT_DEADLINE_SECS: u64 = 300;
    pub const OVERLOAD_THRESHOLD_PCT: f64 = 100.0;
}

// ==========================================
// PlanningConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait PlanningConfigReader: Send + Sync {
    /// 产线分配重叠策略
    ///
    /// # 默认值
    /// - WARN（只提示不拦截）
    fn overlap_policy(&self) -> RepositoryResult<OverlapPolicy>;

    /// 款式判定为 Completed 的出货完成率阈值（百分比）
    ///
    /// # 默认值
    /// - 100.0
    fn style_completion_pct(&self) -> RepositoryResult<f64>;

    /// Excel 批量导入的截止时长（秒）
    ///
    /// # 默认值
    /// - 300
    fn import_deadline_secs(&self) -> RepositoryResult<u64>;

    /// 判定产线超负荷的负荷百分比阈值
    ///
    /// # 默认值
    /// - 100.0
    fn overload_threshold_pct(&self) -> RepositoryResult<f64>;
}

/// 固定值配置（测试与无库场景使用）
#[derive(Debug, Clone)]
pub struct StaticPlanningConfig {
    pub overlap_policy: OverlapPolicy,
    pub style_completion_pct: f64,
    pub import_deadline_secs: u64,
    pub overload_threshold_pct: f64,
}

impl Default for StaticPlanningConfig {
    fn default() -> Self {
        Self {
            overlap_policy: defaults::OVERLAP_POLICY,
            style_completion_pct: defaults::STYLE_COMPLETION_PCT,
            import_deadline_secs: defaults::IMPORT_DEADLINE_SECS,
            overload_threshold_pct: defaults::OVERLOAD_THRESHOLD_PCT,
        }
    }
}

impl PlanningConfigReader for StaticPlanningConfig {
    fn overlap_policy(&self) -> RepositoryResult<OverlapPolicy> {
        Ok(self.overlap_policy)
    }

    fn style_completion_pct(&self) -> RepositoryResult<f64> {
        Ok(self.style_completion_pct)
    }

    fn import_deadline_secs(&self) -> RepositoryResult<u64> {
        Ok(self.import_deadline_secs)
    }

    fn overload_threshold_pct(&self) -> RepositoryResult<f64> {
        Ok(self.overload_threshold_pct)
    }
}

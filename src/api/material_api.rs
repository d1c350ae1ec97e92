// ==========================================
// 成衣产线排产系统 - 物料 API
// ==========================================
// 职责: 物料新增/查询，到货/发料事件，通用状态更新
// 红线: 状态与数量字段在同一事务内落库
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::material::{
    Material, MaterialFieldUpdate, MaterialIssue, MaterialReceipt, NewMaterial,
};
use crate::domain::types::{MaterialStatus, MaterialType};
use crate::engine::{MaterialEventOutcome, ProgressTracker};
use crate::repository::{MaterialRepository, StyleRepository};

// ==========================================
// MaterialApi - 物料 API
// ==========================================
pub struct MaterialApi {
    material_repo: Arc<MaterialRepository>,
    style_repo: Arc<StyleRepository>,
    tracker: Arc<ProgressTracker>,
}

impl MaterialApi {
    pub fn new(
        material_repo: Arc<MaterialRepository>,
        style_repo: Arc<StyleRepository>,
        tracker: Arc<ProgressTracker>,
    ) -> Self {
        Self {
            material_repo,
            style_repo,
            tracker,
        }
    }

    fn ensure_style(&self, style_id: &str) -> ApiResult<()> {
        if self.style_repo.find_by_id(style_id)?.is_none() {
            return Err(ApiError::NotFound(format!("Style(id={})不存在", style_id)));
        }
        Ok(())
    }

    pub fn get_materials_by_style(&self, style_id: &str) -> ApiResult<Vec<Material>> {
        self.ensure_style(style_id)?;
        Ok(self.material_repo.find_by_style(style_id)?)
    }

    pub fn get_material(&self, material_id: &str) -> ApiResult<Material> {
        self.material_repo
            .find_by_id(material_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Material(id={})不存在", material_id)))
    }

    /// 新增物料（初始状态 Pending）
    pub fn add_material(
        &self,
        style_id: &str,
        name: &str,
        material_type: MaterialType,
        unit: Option<String>,
        required_quantity: f64,
    ) -> ApiResult<Material> {
        self.ensure_style(style_id)?;
        let material = self.material_repo.insert(&NewMaterial {
            style_id: style_id.to_string(),
            name: name.trim().to_string(),
            material_type,
            unit,
            required_quantity,
        })?;
        info!(material_id = %material.material_id, style_id = %style_id, "物料已创建");
        Ok(material)
    }

    /// 通用状态更新（状态 + 字段原子落库）
    pub fn update_material_status(
        &self,
        material_id: &str,
        status: MaterialStatus,
        fields: &MaterialFieldUpdate,
    ) -> ApiResult<Material> {
        Ok(self.tracker.update_material_status(material_id, status, fields)?)
    }

    /// 到货事件
    pub fn receive_material(
        &self,
        material_id: &str,
        receipt: &MaterialReceipt,
    ) -> ApiResult<MaterialEventOutcome> {
        Ok(self.tracker.receive_material(material_id, receipt)?)
    }

    /// 发料事件
    pub fn issue_material(&self, material_id: &str, issue: &MaterialIssue) -> ApiResult<Material> {
        Ok(self.tracker.issue_material(material_id, issue)?)
    }
}

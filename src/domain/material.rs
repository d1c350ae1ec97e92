// ==========================================
// 成衣产线排产系统 - 物料领域模型
// ==========================================
// 红线: 0 <= issued_quantity <= received_quantity
// 超量到货 (received > required) 只标记不拦截
// ==========================================

use crate::domain::types::{MaterialStatus, MaterialType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Material - 款式物料（面料/辅料/配件）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub material_id: String,
    pub style_id: String,
    pub name: String,
    pub material_type: MaterialType,
    pub unit: Option<String>,     // Meters, Pieces ...

    // ===== 数量 =====
    pub required_quantity: f64,
    pub received_quantity: f64,
    pub issued_quantity: f64,

    pub status: MaterialStatus,

    // ===== 采购信息（首次到货时记录） =====
    pub po_number: Option<String>,
    pub po_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub actual_delivery: Option<NaiveDate>,
    pub remarks: Option<String>,

    pub created_at: NaiveDateTime,
}

impl Material {
    /// 可发料数量
    pub fn available_quantity(&self) -> f64 {
        (self.received_quantity - self.issued_quantity).max(0.0)
    }

    /// 是否超量到货
    pub fn is_over_received(&self) -> bool {
        self.received_quantity > self.required_quantity
    }

    /// 校验数量不变量
    pub fn check_quantities(&self) -> Result<(), String> {
        check_quantity_invariant(self.received_quantity, self.issued_quantity)
    }
}

/// 数量不变量: 0 <= issued <= received
pub fn check_quantity_invariant(received: f64, issued: f64) -> Result<(), String> {
    if received < 0.0 {
        return Err(format!("到货数量不能为负: {}", received));
    }
    if issued < 0.0 {
        return Err(format!("发料数量不能为负: {}", issued));
    }
    if issued > received {
        return Err(format!(
            "发料数量 {} 超过到货数量 {}",
            issued, received
        ));
    }
    Ok(())
}

/// 新建物料参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaterial {
    pub style_id: String,
    pub name: String,
    pub material_type: MaterialType,
    pub unit: Option<String>,
    pub required_quantity: f64,
}

// ==========================================
// 物料事件
// ==========================================

/// 到货事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialReceipt {
    pub quantity: f64,
    pub po_number: Option<String>,
    pub po_date: Option<NaiveDate>,
    pub actual_delivery: Option<NaiveDate>,
    pub remarks: Option<String>,
}

/// 发料事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialIssue {
    pub quantity: f64,
    pub remarks: Option<String>,
}

/// 物料字段更新（与状态在同一事务内落库）
///
/// 为 None 的字段保持原值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialFieldUpdate {
    pub received_quantity: Option<f64>,
    pub issued_quantity: Option<f64>,
    pub po_number: Option<String>,
    pub po_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub actual_delivery: Option<NaiveDate>,
    pub remarks: Option<String>,
}

impl MaterialFieldUpdate {
    /// 应用到物料快照上（不落库）
    pub fn apply_to(&self, material: &mut Material) {
        if let Some(v) = self.received_quantity {
            material.received_quantity = v;
        }
        if let Some(v) = self.issued_quantity {
            material.issued_quantity = v;
        }
        if let Some(v) = &self.po_number {
            material.po_number = Some(v.clone());
        }
        if let Some(v) = self.po_date {
            material.po_date = Some(v);
        }
        if let Some(v) = self.expected_delivery {
            material.expected_delivery = Some(v);
        }
        if let Some(v) = self.actual_delivery {
            material.actual_delivery = Some(v);
        }
        if let Some(v) = &self.remarks {
            material.remarks = Some(v.clone());
        }
    }
}

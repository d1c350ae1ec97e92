// ==========================================
// 成衣产线排产系统 - 订单/款式领域模型
// ==========================================
// 所有权: Order 独占其 Style（级联范围）
// 红线: Order.total_quantity = Σ style.quantity
// ==========================================

use crate::domain::types::{OrderStatus, StyleStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Buyer - 买家
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buyer {
    pub buyer_id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// Order - 订单 (PO)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub po_number: String,       // 唯一
    pub buyer_id: Option<String>,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,

    // 人工覆写状态（如 Cancelled）；为空时状态由进度派生
    pub manual_status: Option<OrderStatus>,

    // 冗余汇总: 新增/删除款式时在同一事务内重算
    pub total_quantity: i64,

    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

/// 新建订单参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub po_number: String,
    pub buyer_id: Option<String>,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
}

impl NewOrder {
    /// 校验订单不变量
    ///
    /// # 返回
    /// - Err(String): 违反原因
    pub fn validate(&self) -> Result<(), String> {
        if self.po_number.trim().is_empty() {
            return Err("po_number 不能为空".to_string());
        }
        if self.delivery_date < self.order_date {
            return Err(format!(
                "交货日期 {} 早于下单日期 {}",
                self.delivery_date, self.order_date
            ));
        }
        Ok(())
    }
}

// ==========================================
// SizeBreakdown - 尺码配比
// ==========================================
// 存储: styles.size_breakdown 列内的 JSON 文档
pub type SizeBreakdown = BTreeMap<String, i64>;

/// 尺码配比合计；i64 溢出时返回 None
pub fn size_breakdown_total(breakdown: &SizeBreakdown) -> Option<i64> {
    breakdown
        .values()
        .try_fold(0i64, |acc, qty| acc.checked_add(*qty))
}

// ==========================================
// Style - 款式
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub style_id: String,
    pub order_id: String,
    pub style_number: String,
    pub description: Option<String>,
    pub category: Option<String>,   // T-shirt, Pants, Jacket ...
    pub color: Option<String>,
    pub size_breakdown: SizeBreakdown,
    pub quantity: i64,

    // 人工覆写状态；为空时状态由生产记录派生
    pub manual_status: Option<StyleStatus>,

    pub created_at: NaiveDateTime,
}

/// 新建款式参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStyle {
    pub order_id: String,
    pub style_number: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub size_breakdown: SizeBreakdown,
    pub quantity: i64,
}

impl NewStyle {
    /// 校验款式不变量
    ///
    /// 规则:
    /// - style_number 非空
    /// - quantity >= 0，尺码数量 >= 0
    /// - 尺码配比非空时 quantity 必须等于尺码合计
    pub fn validate(&self) -> Result<(), String> {
        if self.style_number.trim().is_empty() {
            return Err("style_number 不能为空".to_string());
        }
        if self.quantity < 0 {
            return Err(format!("款式数量不能为负: {}", self.quantity));
        }
        if let Some((size, qty)) = self.size_breakdown.iter().find(|(_, q)| **q < 0) {
            return Err(format!("尺码 {} 数量不能为负: {}", size, qty));
        }
        if !self.size_breakdown.is_empty() {
            let total = size_breakdown_total(&self.size_breakdown)
                .ok_or_else(|| "尺码合计超出数量上限".to_string())?;
            if total != self.quantity {
                return Err(format!(
                    "款式数量 {} 与尺码合计 {} 不一致",
                    self.quantity, total
                ));
            }
        }
        Ok(())
    }
}

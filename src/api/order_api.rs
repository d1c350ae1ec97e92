// ==========================================
// 成衣产线排产系统 - 订单/款式 API
// ==========================================
// 职责: 客户、订单、款式的增删查，订单/款式人工状态覆写
// 红线: 新增/删除款式与订单总数量重算在同一事务内完成
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::{Buyer, NewOrder, NewStyle, Order, SizeBreakdown, Style};
use crate::domain::types::{OrderStatus, StyleStatus};
use crate::repository::{BuyerRepository, OrderRepository, StyleRepository};

// ==========================================
// OrderApi - 订单/款式 API
// ==========================================
pub struct OrderApi {
    buyer_repo: Arc<BuyerRepository>,
    order_repo: Arc<OrderRepository>,
    style_repo: Arc<StyleRepository>,
}

impl OrderApi {
    pub fn new(
        buyer_repo: Arc<BuyerRepository>,
        order_repo: Arc<OrderRepository>,
        style_repo: Arc<StyleRepository>,
    ) -> Self {
        Self {
            buyer_repo,
            order_repo,
            style_repo,
        }
    }

    // ==========================================
    // 客户
    // ==========================================

    pub fn add_buyer(
        &self,
        name: &str,
        contact_person: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> ApiResult<Buyer> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("客户名称不能为空".to_string()));
        }
        Ok(self.buyer_repo.insert(name, contact_person, email, phone)?)
    }

    pub fn get_all_buyers(&self) -> ApiResult<Vec<Buyer>> {
        Ok(self.buyer_repo.list_all()?)
    }

    pub fn get_buyer(&self, buyer_id: &str) -> ApiResult<Buyer> {
        self.buyer_repo
            .find_by_id(buyer_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Buyer(id={})不存在", buyer_id)))
    }

    /// 客户订单列表；客户不存在时返回 NotFound（而非空列表）
    pub fn get_orders_by_buyer(&self, buyer_id: &str) -> ApiResult<Vec<Order>> {
        self.get_buyer(buyer_id)?;
        Ok(self.order_repo.find_by_buyer(buyer_id)?)
    }

    // ==========================================
    // 订单
    // ==========================================

    /// 新建订单（total_quantity 初始为 0，随款式增加重算）
    pub fn add_order(
        &self,
        po_number: &str,
        buyer_id: Option<String>,
        order_date: NaiveDate,
        delivery_date: NaiveDate,
    ) -> ApiResult<Order> {
        if let Some(id) = &buyer_id {
            if self.buyer_repo.find_by_id(id)?.is_none() {
                return Err(ApiError::NotFound(format!("Buyer(id={})不存在", id)));
            }
        }
        let order = self.order_repo.insert(&NewOrder {
            po_number: po_number.trim().to_string(),
            buyer_id,
            order_date,
            delivery_date,
        })?;
        info!(order_id = %order.order_id, po_number = %order.po_number, "订单已创建");
        Ok(order)
    }

    pub fn get_all_orders(&self) -> ApiResult<Vec<Order>> {
        Ok(self.order_repo.list_all()?)
    }

    pub fn get_order(&self, order_id: &str) -> ApiResult<Order> {
        self.order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Order(id={})不存在", order_id)))
    }

    pub fn get_order_by_po(&self, po_number: &str) -> ApiResult<Order> {
        self.order_repo
            .find_by_po(po_number)?
            .ok_or_else(|| ApiError::NotFound(format!("Order(po_number={})不存在", po_number)))
    }

    /// 设置/清除订单人工状态
    ///
    /// # 参数
    /// - status: Some → 覆写（如 Cancelled），None → 恢复派生状态
    pub fn update_order_status(&self, order_id: &str, status: Option<OrderStatus>) -> ApiResult<()> {
        self.order_repo.set_manual_status(order_id, status)?;
        info!(order_id = %order_id, status = ?status, "订单人工状态已更新");
        Ok(())
    }

    /// 删除订单（级联删除款式；款式被物料/分配/生产记录引用时拒绝）
    pub fn delete_order(&self, order_id: &str) -> ApiResult<()> {
        self.order_repo.delete(order_id)?;
        info!(order_id = %order_id, "订单已删除");
        Ok(())
    }

    // ==========================================
    // 款式
    // ==========================================

    pub fn get_styles_by_order(&self, order_id: &str) -> ApiResult<Vec<Style>> {
        self.get_order(order_id)?;
        Ok(self.style_repo.find_by_order(order_id)?)
    }

    pub fn get_style(&self, style_id: &str) -> ApiResult<Style> {
        self.style_repo
            .find_by_id(style_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Style(id={})不存在", style_id)))
    }

    /// 新增款式并重算订单总数量（同一事务）
    #[allow(clippy::too_many_arguments)]
    pub fn add_style(
        &self,
        order_id: &str,
        style_number: &str,
        description: Option<String>,
        category: Option<String>,
        color: Option<String>,
        size_breakdown: SizeBreakdown,
        quantity: i64,
    ) -> ApiResult<Style> {
        let (style, total) = self.style_repo.add_style(&NewStyle {
            order_id: order_id.to_string(),
            style_number: style_number.trim().to_string(),
            description,
            category,
            color,
            size_breakdown,
            quantity,
        })?;
        info!(
            style_id = %style.style_id,
            order_id = %order_id,
            order_total = total,
            "款式已创建"
        );
        Ok(style)
    }

    pub fn update_style_status(&self, style_id: &str, status: Option<StyleStatus>) -> ApiResult<()> {
        self.style_repo.set_manual_status(style_id, status)?;
        info!(style_id = %style_id, status = ?status, "款式人工状态已更新");
        Ok(())
    }

    /// 删除款式（被引用时拒绝），返回订单新的总数量
    pub fn delete_style(&self, style_id: &str) -> ApiResult<i64> {
        let total = self.style_repo.delete(style_id)?;
        info!(style_id = %style_id, order_total = total, "款式已删除");
        Ok(total)
    }
}

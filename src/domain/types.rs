// ==========================================
// 成衣产线排产系统 - 领域类型定义
// ==========================================
// 职责: 订单/款式/物料/工序的状态枚举与解析
// 序列化格式: 与数据库及导入表格中的显示名一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 枚举解析失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "无法识别的{}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

/// 统一的宽松匹配: 忽略大小写、空格、下划线与连字符
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// Cancelled 只能通过人工覆写进入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::New,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "new" => Ok(OrderStatus::New),
            "inprogress" => Ok(OrderStatus::InProgress),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(ParseEnumError {
                kind: "订单状态",
                value: s.to_string(),
            }),
        }
    }
}

// ==========================================
// 款式状态 (Style Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleStatus {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl StyleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleStatus::New => "New",
            StyleStatus::InProgress => "In Progress",
            StyleStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for StyleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "new" => Ok(StyleStatus::New),
            "inprogress" => Ok(StyleStatus::InProgress),
            "completed" => Ok(StyleStatus::Completed),
            _ => Err(ParseEnumError {
                kind: "款式状态",
                value: s.to_string(),
            }),
        }
    }
}

// ==========================================
// 物料状态 (Material Status)
// ==========================================
// 流转: Pending → Ordered(部分到货) → Received → Issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialStatus {
    Pending,
    Ordered,
    Received,
    Issued,
}

impl MaterialStatus {
    pub const ALL: [MaterialStatus; 4] = [
        MaterialStatus::Pending,
        MaterialStatus::Ordered,
        MaterialStatus::Received,
        MaterialStatus::Issued,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialStatus::Pending => "Pending",
            MaterialStatus::Ordered => "Ordered",
            MaterialStatus::Received => "Received",
            MaterialStatus::Issued => "Issued",
        }
    }
}

impl fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "pending" => Ok(MaterialStatus::Pending),
            "ordered" => Ok(MaterialStatus::Ordered),
            "received" => Ok(MaterialStatus::Received),
            "issued" => Ok(MaterialStatus::Issued),
            _ => Err(ParseEnumError {
                kind: "物料状态",
                value: s.to_string(),
            }),
        }
    }
}

// ==========================================
// 物料类型 (Material Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialType {
    Fabric,
    Trim,
    Accessories,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Fabric => "Fabric",
            MaterialType::Trim => "Trim",
            MaterialType::Accessories => "Accessories",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "fabric" => Ok(MaterialType::Fabric),
            "trim" | "trims" => Ok(MaterialType::Trim),
            "accessories" | "accessory" => Ok(MaterialType::Accessories),
            _ => Err(ParseEnumError {
                kind: "物料类型",
                value: s.to_string(),
            }),
        }
    }
}

// ==========================================
// 生产工序 (Process)
// ==========================================
// 顺序: Cutting < Stitching < Packing < Dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Process {
    Cutting,
    Stitching,
    Packing,
    Dispatch,
}

impl Process {
    /// 按流水线顺序排列的全部工序
    pub const PIPELINE: [Process; 4] = [
        Process::Cutting,
        Process::Stitching,
        Process::Packing,
        Process::Dispatch,
    ];

    /// 下一道工序（Dispatch 为末道）
    pub fn next(&self) -> Option<Process> {
        match self {
            Process::Cutting => Some(Process::Stitching),
            Process::Stitching => Some(Process::Packing),
            Process::Packing => Some(Process::Dispatch),
            Process::Dispatch => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Process::Cutting => "Cutting",
            Process::Stitching => "Stitching",
            Process::Packing => "Packing",
            Process::Dispatch => "Dispatch",
        }
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Process {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "cutting" => Ok(Process::Cutting),
            "stitching" | "sewing" => Ok(Process::Stitching),
            "packing" => Ok(Process::Packing),
            "dispatch" => Ok(Process::Dispatch),
            _ => Err(ParseEnumError {
                kind: "工序",
                value: s.to_string(),
            }),
        }
    }
}

// ==========================================
// 重叠策略 (Overlap Policy)
// ==========================================
// 默认 WARN: 重叠只提示不拦截（允许急单人工插单）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverlapPolicy {
    #[default]
    Warn,
    Reject,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Warn => write!(f, "WARN"),
            OverlapPolicy::Reject => write!(f, "REJECT"),
        }
    }
}

impl FromStr for OverlapPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "warn" => Ok(OverlapPolicy::Warn),
            "reject" => Ok(OverlapPolicy::Reject),
            _ => Err(ParseEnumError {
                kind: "重叠策略",
                value: s.to_string(),
            }),
        }
    }
}

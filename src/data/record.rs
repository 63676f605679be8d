//! 销售记录与数据完整性校验
//!
//! SalesRecord 是一行销售数据；不变量（金额非负且有限、产品名非空）在进入
//! 流水线前校验，违反即 DataError，整次运行不启动。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 一行销售数据：期间（日期）、产品、收入、成本、客户数（可选列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub period: NaiveDate,
    pub product: String,
    pub revenue: f64,
    pub cost: f64,
    /// 原始数据集的 Customers 列；缺失时相关指标不产出
    pub customers: Option<u64>,
}

/// 数据完整性错误：无数据或某行违反不变量，运行无从谈起
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No sales records to analyze")]
    Empty,

    #[error("Record {row}: product name is empty")]
    EmptyProduct { row: usize },

    #[error("Record {row}: {field} is negative ({value})")]
    NegativeAmount {
        row: usize,
        field: &'static str,
        value: f64,
    },

    #[error("Record {row}: {field} is not a finite number")]
    NonFiniteAmount { row: usize, field: &'static str },

    #[error("CSV read failed: {0}")]
    Csv(String),

    #[error("Record {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("Record {row}: invalid number in column {field}: '{value}'")]
    InvalidNumber {
        row: usize,
        field: &'static str,
        value: String,
    },
}

impl SalesRecord {
    /// 校验单行不变量；row 仅用于错误信息（1 起始的数据行号）
    pub fn validate(&self, row: usize) -> Result<(), DataError> {
        if self.product.trim().is_empty() {
            return Err(DataError::EmptyProduct { row });
        }
        for (field, value) in [("revenue", self.revenue), ("cost", self.cost)] {
            if !value.is_finite() {
                return Err(DataError::NonFiniteAmount { row, field });
            }
            if value < 0.0 {
                return Err(DataError::NegativeAmount { row, field, value });
            }
        }
        Ok(())
    }

    /// 利润 = 收入 - 成本（原始数据集：Profit = Revenue - Expenses）
    pub fn profit(&self) -> f64 {
        self.revenue - self.cost
    }
}

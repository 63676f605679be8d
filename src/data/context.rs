//! 数据上下文构建器
//!
//! 对校验后的销售记录做一次确定性聚合：总量、按产品排名（收入降序、产品名升序破平）、
//! 按期间升序的趋势序列（同一期间多行求和）。构建一次后不可变，所有智能体只读共享，
//! 相同输入必然产出相同的下游 Prompt。

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{DataError, SalesRecord};

/// 单个产品跨期间的累计表现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStat {
    pub product: String,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub customers: u64,
}

/// 单个期间跨产品的累计表现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStat {
    pub period: NaiveDate,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

/// 不可变的数据集数字摘要，每次流水线运行构建一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetContext {
    pub total_revenue: f64,
    pub total_cost: f64,
    pub profit: f64,
    /// 利润率（百分比）；收入为 0 时为 0
    pub profit_margin: f64,
    /// Customers 列的均值；任何一行缺失则不产出
    pub avg_customers: Option<f64>,
    /// 收入降序，收入相同按产品名升序
    pub product_ranking: Vec<ProductStat>,
    /// 期间升序；同一期间的多行（含同产品重复行）求和
    pub trend: Vec<PeriodStat>,
    /// 收入最高的期间（并列取最早）
    pub best_period: NaiveDate,
    /// 收入最高的产品（即排名首位）
    pub best_product: String,
    pub record_count: usize,
}

impl DatasetContext {
    /// 从校验过的记录序列构建；空序列或违反不变量的行返回 DataError
    pub fn build(records: &[SalesRecord]) -> Result<Self, DataError> {
        if records.is_empty() {
            return Err(DataError::Empty);
        }

        let mut total_revenue = 0.0;
        let mut total_cost = 0.0;
        let mut customers_sum: u64 = 0;
        let mut customers_complete = true;

        // BTreeMap 保证遍历顺序确定，聚合求和顺序固定
        let mut by_product: BTreeMap<String, ProductStat> = BTreeMap::new();
        let mut by_period: BTreeMap<NaiveDate, PeriodStat> = BTreeMap::new();

        for (i, record) in records.iter().enumerate() {
            record.validate(i + 1)?;

            total_revenue += record.revenue;
            total_cost += record.cost;
            match record.customers {
                Some(c) => customers_sum += c,
                None => customers_complete = false,
            }

            let product = by_product
                .entry(record.product.clone())
                .or_insert_with(|| ProductStat {
                    product: record.product.clone(),
                    revenue: 0.0,
                    cost: 0.0,
                    profit: 0.0,
                    customers: 0,
                });
            product.revenue += record.revenue;
            product.cost += record.cost;
            product.profit += record.profit();
            product.customers += record.customers.unwrap_or(0);

            let period = by_period.entry(record.period).or_insert_with(|| PeriodStat {
                period: record.period,
                revenue: 0.0,
                cost: 0.0,
                profit: 0.0,
            });
            period.revenue += record.revenue;
            period.cost += record.cost;
            period.profit += record.profit();
        }

        let mut product_ranking: Vec<ProductStat> = by_product.into_values().collect();
        product_ranking.sort_by(|a, b| {
            b.revenue
                .total_cmp(&a.revenue)
                .then_with(|| a.product.cmp(&b.product))
        });

        // BTreeMap 已按期间升序
        let trend: Vec<PeriodStat> = by_period.into_values().collect();

        // 严格大于才替换：并列时取最早的期间
        let mut best_period = trend[0].period;
        let mut best_revenue = trend[0].revenue;
        for p in &trend[1..] {
            if p.revenue > best_revenue {
                best_revenue = p.revenue;
                best_period = p.period;
            }
        }

        let best_product = product_ranking[0].product.clone();
        let profit = total_revenue - total_cost;
        let profit_margin = if total_revenue > 0.0 {
            profit / total_revenue * 100.0
        } else {
            0.0
        };
        let avg_customers = if customers_complete {
            Some(customers_sum as f64 / records.len() as f64)
        } else {
            None
        };

        Ok(Self {
            total_revenue,
            total_cost,
            profit,
            profit_margin,
            avg_customers,
            product_ranking,
            trend,
            best_period,
            best_product,
            record_count: records.len(),
        })
    }
}

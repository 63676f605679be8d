//! 数据层：销售记录、CSV 装载、确定性数据上下文

pub mod context;
pub mod loader;
pub mod record;

pub use context::{DatasetContext, PeriodStat, ProductStat};
pub use loader::load_sales_csv;
pub use record::{DataError, SalesRecord};

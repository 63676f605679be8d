//! 销售数据 CSV 装载（外部协作者边界）
//!
//! 列：Date,Product,Revenue,Expenses,Customers（Customers 可缺省）。
//! 逐行解析 + 不变量校验，错误带数据行号；畸形文件在进入编排核心前被拒绝。

use std::path::Path;

use chrono::NaiveDate;

use crate::data::{DataError, SalesRecord};

fn parse_amount(raw: &str, field: &'static str, row: usize) -> Result<f64, DataError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DataError::InvalidNumber {
            row,
            field,
            value: raw.to_string(),
        })
}

fn parse_row(record: &csv::StringRecord, row: usize) -> Result<SalesRecord, DataError> {
    let date_raw = record.get(0).unwrap_or("").trim();
    let period = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d").map_err(|_| {
        DataError::InvalidDate {
            row,
            value: date_raw.to_string(),
        }
    })?;

    let product = record.get(1).unwrap_or("").trim().to_string();
    let revenue = parse_amount(record.get(2).unwrap_or(""), "Revenue", row)?;
    let cost = parse_amount(record.get(3).unwrap_or(""), "Expenses", row)?;

    let customers = match record.get(4).map(str::trim) {
        Some("") | None => None,
        Some(raw) => Some(raw.parse::<u64>().map_err(|_| DataError::InvalidNumber {
            row,
            field: "Customers",
            value: raw.to_string(),
        })?),
    };

    let rec = SalesRecord {
        period,
        product,
        revenue,
        cost,
        customers,
    };
    rec.validate(row)?;
    Ok(rec)
}

/// 从 CSV 文件装载并校验全部记录
pub fn load_sales_csv(path: &Path) -> Result<Vec<SalesRecord>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::Csv(e.to_string()))?;

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record = result.map_err(|e| DataError::Csv(e.to_string()))?;
        records.push(parse_row(&record, row)?);
    }

    if records.is_empty() {
        return Err(DataError::Empty);
    }

    tracing::info!(count = records.len(), "Sales data loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_valid_file() {
        let f = write_csv(
            "Date,Product,Revenue,Expenses,Customers\n\
             2024-01-01,Widget,100,40,12\n\
             2024-02-01,Widget,150,60,15\n",
        );
        let records = load_sales_csv(f.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product, "Widget");
        assert_eq!(records[1].customers, Some(15));
    }

    #[test]
    fn test_missing_customers_column() {
        let f = write_csv("Date,Product,Revenue,Expenses\n2024-01-01,Widget,100,40\n");
        let records = load_sales_csv(f.path()).unwrap();
        assert_eq!(records[0].customers, None);
    }

    #[test]
    fn test_bad_date_reports_row() {
        let f = write_csv(
            "Date,Product,Revenue,Expenses\n\
             2024-01-01,Widget,100,40\n\
             not-a-date,Widget,1,1\n",
        );
        let err = load_sales_csv(f.path()).unwrap_err();
        assert!(matches!(err, DataError::InvalidDate { row: 2, .. }));
    }

    #[test]
    fn test_negative_revenue_rejected() {
        let f = write_csv("Date,Product,Revenue,Expenses\n2024-01-01,Widget,-5,1\n");
        let err = load_sales_csv(f.path()).unwrap_err();
        assert!(matches!(err, DataError::NegativeAmount { row: 1, .. }));
    }

    #[test]
    fn test_empty_file_rejected() {
        let f = write_csv("Date,Product,Revenue,Expenses\n");
        assert!(matches!(load_sales_csv(f.path()).unwrap_err(), DataError::Empty));
    }
}

//! 數值格式化規則：戶數、金額 (元/萬元/億元)、百分比。
//!
//! Every formatter is total: absent or unusable input renders a textual zero.

use crate::domain::model::MetricValue;
use crate::grid::CellValue;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NUMERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+\.?\d*").expect("valid numeral regex"));

const HUNDRED_MILLION: f64 = 100_000_000.0;
const TEN_THOUSAND: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Count,
    Currency,
    Percent,
}

impl FormatKind {
    pub fn format(&self, value: Option<&MetricValue>) -> String {
        match self {
            FormatKind::Count => format_count(value),
            FormatKind::Currency => format_currency(value),
            FormatKind::Percent => format_percent(value),
        }
    }

    /// Rendering used when the metric is absent.
    pub fn default_text(&self) -> &'static str {
        match self {
            FormatKind::Count | FormatKind::Currency => "0",
            FormatKind::Percent => "0%",
        }
    }
}

/// Integer with `,` every three digits.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// 依二進位實際值取一位小數 (`83.45` 實為 83.4500…03，進位為 83.5)
fn round_one_decimal(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// 戶數：四捨五入到整數 (銀行家捨入) 並加千分位
pub fn format_count(value: Option<&MetricValue>) -> String {
    match value {
        None => "0".to_string(),
        Some(MetricValue::Value(CellValue::Number(n))) => {
            group_thousands(n.round_ties_even() as i64)
        }
        Some(MetricValue::Value(CellValue::Empty)) => "0".to_string(),
        Some(MetricValue::Value(other)) => other.to_string(),
        Some(MetricValue::Text(text)) => text.clone(),
    }
}

/// 金額分級：>= 1 億以億元 (一位小數)，>= 1 萬以萬元，其餘以元
pub fn format_currency(value: Option<&MetricValue>) -> String {
    match value {
        None => "0".to_string(),
        Some(MetricValue::Value(CellValue::Number(n))) => currency_tier(*n),
        Some(MetricValue::Value(CellValue::Empty)) => "0".to_string(),
        Some(MetricValue::Value(other)) => other.to_string(),
        Some(MetricValue::Text(text)) => text.clone(),
    }
}

pub fn currency_tier(value: f64) -> String {
    if value >= HUNDRED_MILLION {
        format!("{:.1}億元", round_one_decimal(value / HUNDRED_MILLION))
    } else if value >= TEN_THOUSAND {
        let wan = (value / TEN_THOUSAND).round_ties_even() as i64;
        format!("{}萬元", group_thousands(wan))
    } else {
        format!("{}元", group_thousands(value.round_ties_even() as i64))
    }
}

/// 從顯示文字取出第一個數字，取一位小數，整數時省略 `.0`
pub fn percent_from_text(text: Option<&str>) -> String {
    let text = match text {
        Some(text) if !text.is_empty() => text,
        _ => return "0%".to_string(),
    };

    let parsed = NUMERAL
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok());

    match parsed {
        Some(number) => {
            let rounded = round_one_decimal(number);
            if rounded == rounded.trunc() {
                format!("{}%", rounded as i64)
            } else {
                format!("{}%", rounded)
            }
        }
        None => "0%".to_string(),
    }
}

pub fn format_percent(value: Option<&MetricValue>) -> String {
    match value {
        None => "0%".to_string(),
        Some(MetricValue::Text(text)) => percent_from_text(Some(text)),
        Some(MetricValue::Value(CellValue::Empty)) => "0%".to_string(),
        Some(MetricValue::Value(other)) => percent_from_text(Some(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: f64) -> MetricValue {
        MetricValue::Value(CellValue::Number(n))
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-1234567), "-1,234,567");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(Some(&number(0.0))), "0");
        assert_eq!(format_count(Some(&number(1234567.0))), "1,234,567");
        assert_eq!(format_count(Some(&number(1564000.4))), "1,564,000");
        assert_eq!(format_count(Some(&number(2.5))), "2");
        assert_eq!(format_count(None), "0");
        assert_eq!(format_count(Some(&MetricValue::Text("N/A".to_string()))), "N/A");
    }

    #[test]
    fn test_format_currency_tiers() {
        assert_eq!(format_currency(Some(&number(50_000_000.0))), "5,000萬元");
        assert_eq!(format_currency(Some(&number(250_000_000.0))), "2.5億元");
        assert_eq!(format_currency(Some(&number(300_000_000.0))), "3.0億元");
        assert_eq!(format_currency(Some(&number(5000.0))), "5,000元");
        assert_eq!(format_currency(Some(&number(123_456.0))), "12萬元");
        assert_eq!(format_currency(Some(&number(9_999_999.0))), "1,000萬元");
        assert_eq!(format_currency(Some(&number(10_000.0))), "1萬元");
        assert_eq!(format_currency(Some(&number(163_000_000.0))), "1.6億元");
        assert_eq!(format_currency(None), "0");
    }

    #[test]
    fn test_percent_from_text() {
        assert_eq!(percent_from_text(Some("83.0%")), "83%");
        assert_eq!(percent_from_text(Some("83.4%")), "83.4%");
        assert_eq!(percent_from_text(Some("140.56%")), "140.6%");
        assert_eq!(percent_from_text(Some("-12.3%")), "-12.3%");
        assert_eq!(percent_from_text(Some("")), "0%");
        assert_eq!(percent_from_text(None), "0%");
        assert_eq!(percent_from_text(Some("no number here")), "0%");
    }

    #[test]
    fn test_one_decimal_rounds_stored_value() {
        assert_eq!(percent_from_text(Some("83.45%")), "83.5%");
        assert_eq!(percent_from_text(Some("1.05%")), "1.1%");
        assert_eq!(percent_from_text(Some("12.35%")), "12.3%");
        assert_eq!(format_currency(Some(&number(105_000_000.0))), "1.1億元");
    }

    #[test]
    fn test_format_kind_defaults() {
        assert_eq!(FormatKind::Percent.format(None), "0%");
        assert_eq!(FormatKind::Count.format(None), "0");
        assert_eq!(FormatKind::Percent.default_text(), "0%");
        assert_eq!(
            FormatKind::Percent.format(Some(&MetricValue::Text("83.4%".to_string()))),
            "83.4%"
        );
    }
}

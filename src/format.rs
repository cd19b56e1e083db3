//! Display formatting in the storefront's locale (es-CL).

use chrono::NaiveDate;

use crate::domain::OrderStatus;

/// `$12.500`, `$1.234.567,5`; non-finite or missing prices read "Not available".
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(value) if value.is_finite() => format!("${}", group_es_cl(value)),
        _ => "Not available".to_string(),
    }
}

/// Thousands separated by `.`, up to three decimals after a `,`.
fn group_es_cl(value: f64) -> String {
    let thousandths = (value.abs() * 1000.0).round() as u128;
    let whole = thousandths / 1000;
    let fraction = thousandths % 1000;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if value < 0.0 && thousandths > 0 {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction > 0 {
        let decimals = format!("{fraction:03}");
        out.push(',');
        out.push_str(decimals.trim_end_matches('0'));
    }
    out
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d-%m-%Y").to_string()).unwrap_or_else(|| "No date".to_string())
}

pub fn status_label(status: Option<OrderStatus>) -> &'static str {
    match status {
        Some(OrderStatus::Pending) => "Pending",
        Some(OrderStatus::Confirmed) => "Confirmed",
        Some(OrderStatus::InProgress) => "In preparation",
        Some(OrderStatus::Shipped) => "On the way",
        Some(OrderStatus::Delivered) => "Delivered",
        None => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_use_chilean_grouping() {
        assert_eq!(format_price(Some(0.0)), "$0");
        assert_eq!(format_price(Some(990.0)), "$990");
        assert_eq!(format_price(Some(12500.0)), "$12.500");
        assert_eq!(format_price(Some(1_234_567.5)), "$1.234.567,5");
        assert_eq!(format_price(Some(10.125)), "$10,125");
        assert_eq!(format_price(Some(-4500.0)), "$-4.500");
    }

    #[test]
    fn missing_prices_are_not_available() {
        assert_eq!(format_price(None), "Not available");
        assert_eq!(format_price(Some(f64::NAN)), "Not available");
    }

    #[test]
    fn dates_are_day_month_year() {
        assert_eq!(format_date(NaiveDate::from_ymd_opt(2025, 8, 8)), "08-08-2025");
        assert_eq!(format_date(None), "No date");
    }

    #[test]
    fn status_labels() {
        assert_eq!(status_label(Some(OrderStatus::InProgress)), "In preparation");
        assert_eq!(status_label(None), "Unknown");
    }
}

//! Salary figure extraction from free text.

use std::sync::LazyLock;

use regex::Regex;

/// Lowest figure accepted as a salary.
pub const MIN_PLAUSIBLE_SALARY: f64 = 50_000.0;
/// Highest figure accepted as a salary.
pub const MAX_PLAUSIBLE_SALARY: f64 = 1_000_000.0;

/// Pulls an offer amount out of a message.
///
/// Implementations return `None` when the text holds no usable figure; the
/// caller then keeps the previous offer.
pub trait OfferExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Option<f64>;
}

/// Plain numbers, `1,234,567` groups, decimals, and an optional `k` suffix.
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+)(\.\d+)?(\s?k\b)?").expect("amount regex")
});

/// Regex-based extractor.
///
/// A number followed by `k` or below 1,000 is read as thousands. The first
/// value inside the plausible salary range wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexOfferExtractor;

impl OfferExtractor for RegexOfferExtractor {
    fn extract(&self, text: &str) -> Option<f64> {
        AMOUNT_RE.captures_iter(text).find_map(|caps| {
            let whole = caps.get(1)?.as_str().replace(',', "");
            let fraction = caps.get(2).map_or("", |m| m.as_str());
            let mut value: f64 = format!("{whole}{fraction}").parse().ok()?;
            if caps.get(3).is_some() || value < 1000.0 {
                value *= 1000.0;
            }
            (MIN_PLAUSIBLE_SALARY..=MAX_PLAUSIBLE_SALARY)
                .contains(&value)
                .then_some(value)
        })
    }
}

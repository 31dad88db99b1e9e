//! Free-form negotiation context passed alongside the HR message.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OfferError, Result};

use super::strategy::Strategy;

/// Optional facts about the offer under discussion.
///
/// Every field may be absent; an empty context is valid input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NegotiationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_offer: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_rate: Option<f64>,
    /// Keys without a dedicated field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl NegotiationContext {
    /// Build a context from `key=value` pairs (CLI form).
    ///
    /// `benefits` is a comma separated list; unknown keys land in `extra`.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ctx = Self::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                OfferError::ValidationFailed(format!("context entry {pair:?} is not key=value"))
            })?;
            ctx.set(key.trim(), value.trim())?;
        }
        Ok(ctx)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "current_offer" => self.current_offer = Some(parse_amount(key, value)?),
            "target" => {
                let target = parse_amount(key, value)?;
                if target <= 0.0 {
                    return Err(OfferError::ValidationFailed(format!(
                        "context target must be positive, got {value:?}"
                    )));
                }
                self.target = Some(target);
            }
            "market_rate" => self.market_rate = Some(parse_amount(key, value)?),
            "company" => self.company = Some(value.to_string()),
            "benefits" => {
                self.benefits = value
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn parse_amount(key: &str, value: &str) -> Result<f64> {
    let cleaned: String = value.chars().filter(|c| *c != ',' && *c != '_').collect();
    let (digits, scale) = match cleaned.strip_suffix(['k', 'K']) {
        Some(stripped) => (stripped, 1000.0),
        None => (cleaned.as_str(), 1.0),
    };
    digits
        .parse::<f64>()
        .map(|amount| amount * scale)
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .ok_or_else(|| OfferError::ValidationFailed(format!("context {key}: invalid amount {value:?}")))
}

/// Everything one strategy task needs, owned so it can move into the task.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyContext {
    pub strategy: Strategy,
    pub base_salary: f64,
    /// Target already scaled by the strategy multiplier.
    pub target_salary: f64,
    pub context: NegotiationContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_populate_known_fields() {
        let ctx = NegotiationContext::from_pairs([
            "current_offer=200k",
            "target=250,000",
            "benefits=equity, remote ,",
            "company=Acme",
            "team=platform",
        ])
        .unwrap();

        assert_eq!(ctx.current_offer, Some(200_000.0));
        assert_eq!(ctx.target, Some(250_000.0));
        assert_eq!(ctx.benefits, vec!["equity", "remote"]);
        assert_eq!(ctx.company.as_deref(), Some("Acme"));
        assert_eq!(ctx.extra.get("team").map(String::as_str), Some("platform"));
    }

    #[test]
    fn malformed_pair_rejected() {
        assert!(NegotiationContext::from_pairs(["current_offer"]).is_err());
        assert!(NegotiationContext::from_pairs(["target=lots"]).is_err());
    }

    #[test]
    fn non_positive_target_rejected() {
        for pair in ["target=0", "target=0k", "target=-5k"] {
            let err = NegotiationContext::from_pairs([pair]).unwrap_err();
            assert!(matches!(err, OfferError::ValidationFailed(_)), "{pair}: {err}");
        }
        // Zero is still a valid starting offer.
        let ctx = NegotiationContext::from_pairs(["current_offer=0"]).unwrap();
        assert_eq!(ctx.current_offer, Some(0.0));
    }

    #[test]
    fn empty_context_is_empty() {
        let ctx = NegotiationContext::from_pairs(Vec::<String>::new()).unwrap();
        assert!(ctx.is_empty());
    }
}

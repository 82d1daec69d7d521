use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A tracked asset quoted against a fiat currency, e.g. `BTC-USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    pub base: String,
    pub quote: String,
}

impl Asset {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Price-feed identifier (`BASE-QUOTE`).
    pub fn id(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }

    /// Short label used in rendered messages.
    pub fn label(&self) -> &str {
        &self.base
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid asset id {0:?}, expected BASE-QUOTE")]
pub struct InvalidAsset(pub String);

impl FromStr for Asset {
    type Err = InvalidAsset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| InvalidAsset(s.to_string()))?;

        if base.is_empty() || quote.is_empty() {
            return Err(InvalidAsset(s.to_string()));
        }

        Ok(Self::new(base.to_uppercase(), quote.to_uppercase()))
    }
}

/// Latest price of one asset next to the rolling median it is compared with.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetQuote {
    pub asset: Asset,
    pub price: f64,
    /// `None` until the asset's buffer holds at least one sample.
    pub median: Option<f64>,
}

impl AssetQuote {
    /// Percentage deviation of `price` from the median: `(price/median - 1) * 100`.
    ///
    /// `None` without a median or when the median is zero.
    pub fn deviation_pct(&self) -> Option<f64> {
        let median = self.median?;
        if median == 0.0 {
            return None;
        }
        Some((self.price / median - 1.0) * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feed_ids() {
        let a: Asset = "btc-usd".parse().unwrap();
        assert_eq!(a, Asset::new("BTC", "USD"));
        assert_eq!(a.id(), "BTC-USD");
        assert_eq!(a.label(), "BTC");

        assert!("BTCUSD".parse::<Asset>().is_err());
        assert!("-USD".parse::<Asset>().is_err());
    }

    #[test]
    fn invalid_asset_is_a_std_error() {
        let err = "BTCUSD".parse::<Asset>().unwrap_err();
        assert_eq!(err, InvalidAsset("BTCUSD".into()));

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert_eq!(
            boxed.to_string(),
            "invalid asset id \"BTCUSD\", expected BASE-QUOTE"
        );
    }

    #[test]
    fn deviation_against_median() {
        let q = AssetQuote {
            asset: Asset::new("BTC", "USD"),
            price: 25.0,
            median: Some(20.0),
        };
        assert_eq!(format!("{:.2}", q.deviation_pct().unwrap()), "25.00");

        let no_median = AssetQuote { median: None, ..q.clone() };
        assert_eq!(no_median.deviation_pct(), None);

        let zero = AssetQuote { median: Some(0.0), ..q };
        assert_eq!(zero.deviation_pct(), None);
    }
}

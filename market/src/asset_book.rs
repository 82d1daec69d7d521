use crate::sample_buffer::PriceSampleBuffer;
use crate::types::{Asset, AssetQuote};

/// One rolling sample buffer per tracked asset, in configuration order.
///
/// The set of assets is fixed at construction; each buffer keeps its own lock.
pub struct AssetBook {
    entries: Vec<(Asset, PriceSampleBuffer)>,
}

impl AssetBook {
    pub fn new(assets: Vec<Asset>, capacity: usize) -> Self {
        let mut entries: Vec<(Asset, PriceSampleBuffer)> = Vec::with_capacity(assets.len());
        for asset in assets {
            if entries.iter().any(|(a, _)| *a == asset) {
                continue;
            }
            entries.push((asset, PriceSampleBuffer::new(capacity)));
        }
        Self { entries }
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.entries.iter().map(|(a, _)| a)
    }

    pub fn buffer(&self, asset: &Asset) -> Option<&PriceSampleBuffer> {
        self.entries
            .iter()
            .find(|(a, _)| a == asset)
            .map(|(_, buf)| buf)
    }

    /// Appends one sample per asset. Prices for untracked assets are ignored.
    pub fn record(&self, prices: &[(Asset, f64)]) {
        for (asset, price) in prices {
            match self.buffer(asset) {
                Some(buf) => buf.add(*price),
                None => tracing::warn!(asset = %asset, "price for untracked asset ignored"),
            }
        }
    }

    /// Pairs each fetched price with its asset's current median.
    pub fn quotes(&self, prices: &[(Asset, f64)]) -> Vec<AssetQuote> {
        prices
            .iter()
            .map(|(asset, price)| AssetQuote {
                asset: asset.clone(),
                price: *price,
                median: self.buffer(asset).and_then(|b| b.median()),
            })
            .collect()
    }

    /// Latest sample of each asset against its median. Assets without any
    /// sample are left out.
    pub fn latest_quotes(&self) -> Vec<AssetQuote> {
        self.entries
            .iter()
            .filter_map(|(asset, buf)| {
                buf.latest().map(|price| AssetQuote {
                    asset: asset.clone(),
                    price,
                    median: buf.median(),
                })
            })
            .collect()
    }

    /// Current median of every asset, `None` where no sample exists yet.
    pub fn medians(&self) -> Vec<(Asset, Option<f64>)> {
        self.entries
            .iter()
            .map(|(a, buf)| (a.clone(), buf.median()))
            .collect()
    }
}

pub mod coinbase;
pub mod errors;

use async_trait::async_trait;

pub use errors::SourceError;

use crate::types::Asset;

/// External price feed. One call per asset per poll cycle.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, asset: &Asset) -> Result<f64, SourceError>;
}

/// Fetches every asset in order; fails on the first error or zero price so a
/// cycle is either complete or skipped as a whole.
pub async fn fetch_all<'a, S, I>(source: &S, assets: I) -> Result<Vec<(Asset, f64)>, SourceError>
where
    S: PriceSource + ?Sized,
    I: IntoIterator<Item = &'a Asset>,
{
    let mut out = Vec::new();
    for asset in assets {
        let price = source.fetch(asset).await?;
        if price == 0.0 {
            return Err(SourceError::ZeroPrice(asset.id()));
        }
        out.push((asset.clone(), price));
    }
    Ok(out)
}

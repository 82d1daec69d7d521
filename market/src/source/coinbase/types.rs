use serde::Deserialize;

/// `GET /prices/{asset}/buy` body.
#[derive(Debug, Deserialize)]
pub struct PriceEnvelope {
    pub data: SpotPrice,
}

#[derive(Debug, Deserialize)]
pub struct SpotPrice {
    pub base: String,
    pub currency: String,
    /// Decimal string, e.g. `"64210.55"`.
    pub amount: String,
}

pub mod asset_book;
pub mod sample_buffer;
pub mod source;
pub mod types;

pub use asset_book::AssetBook;
pub use sample_buffer::PriceSampleBuffer;
pub use source::{PriceSource, SourceError, fetch_all};
pub use types::{Asset, AssetQuote};

//! Price provider implementations.

mod coingecko;
mod fallback;
mod traits;

pub use coingecko::{CoinGeckoConfig, CoinGeckoProvider};
pub use fallback::{baseline_assets, baseline_price};
pub use traits::PriceProvider;

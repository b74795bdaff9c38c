// Market data domain
pub mod price_bar;
pub mod quote;
pub mod resample;

pub use price_bar::PriceBar;
pub use quote::{PredictionAudit, QuoteSnapshot};
pub use resample::Timeframe;

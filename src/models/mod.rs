pub mod candle;
mod granularity;
mod latest_price;
mod quote;
mod range;

pub use candle::{daily_bucket_key, intraday_bucket_key, Candle};
pub use granularity::Granularity;
pub use latest_price::LatestPrice;
pub use quote::{ProviderCandle, Quote};
pub use range::{Aggregation, ChartData, RangePlan, RangeToken};

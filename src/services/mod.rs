pub mod aggregator;
pub mod provider;
pub mod reconciler;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod trading_hours;

pub use aggregator::Aggregator;
pub use provider::{HttpProvider, MarketDataProvider};
pub use reconciler::{IngestReport, IngestionReconciler, SymbolFailure};
pub use resolver::RangeResolver;
pub use scheduler::{TaskRegistry, TaskStatus};
pub use store::{SortOrder, TimeSeriesStore};
pub use trading_hours::{get_refresh_interval, is_market_open};

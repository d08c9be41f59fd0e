pub mod backoff;
pub mod error;
pub mod remote;
pub mod traits;

pub use error::FetchError;
pub use traits::IndicatorSource;

pub mod scan_response;
pub mod tradingview_client;

pub use scan_response::{ScanRequest, ScanResponse, ScanRow};
pub use tradingview_client::TradingViewClient;

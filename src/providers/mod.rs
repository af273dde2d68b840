pub mod alpha_vantage;
pub mod logo_dev;
pub mod throttle;
pub mod util;
pub mod yahoo_finance;

pub use alpha_vantage::AlphaVantageProvider;
pub use logo_dev::{Logo, LogoProvider};
pub use throttle::ThrottledProvider;
pub use yahoo_finance::YahooFinanceProvider;

mod auth;
pub mod binance;
pub mod gateway;
pub mod responses;

pub use binance::BinanceClient;
pub use gateway::{Gateway, GatewayError};

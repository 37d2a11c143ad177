//! Slow-agent delivery transports.

pub mod chain;
pub mod http;
pub mod in_process;

pub use chain::{DeliveryFailure, DeliveryReport, TransportChain};
pub use http::HttpTransport;
pub use in_process::InProcessTransport;

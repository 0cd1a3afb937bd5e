pub mod bins;
pub mod health;

pub use bins::{bin_routes, BinHandlerState};
pub use health::health_routes;

pub mod clock;
pub mod config;
pub mod duration;
pub mod rates;
#[cfg(feature = "server")]
pub mod server;
pub mod users;

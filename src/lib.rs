pub mod store;
pub mod wire;
pub mod clock;
pub mod traits;
pub mod net;
pub mod report;
pub mod receiver;
pub mod config;

pub mod capture;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod harness;
pub mod js;
pub mod locator;
pub mod output;
pub mod remote;
pub mod session;
pub mod timeouts;
pub mod utils;

pub use config::{Config, DispatchMode};
pub use error::RigError;
pub use harness::Harness;
pub use session::WorkerId;

pub type Result<T> = std::result::Result<T, RigError>;

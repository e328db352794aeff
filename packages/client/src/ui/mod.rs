//! Terminal front end of the purchase view.

pub mod formatter;
pub mod runner;
pub mod session;

pub use runner::{ClientOptions, run_client};

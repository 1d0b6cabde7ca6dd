pub mod aggregate;
pub mod config;
pub mod keys;
pub mod source;

pub use config::Config;
pub use keys::{Entry, KeyTable};

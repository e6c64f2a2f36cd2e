pub mod config;
mod entry;
mod error;
mod report;

pub use entry::*;
pub use error::*;
pub use report::*;

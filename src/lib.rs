pub mod core;

// Re-export key items for easy importing in this crate
pub use core::types;

// Re-export key items for easy importing in other crates
pub use core::app::run_main;
pub use core::campaign;
pub use core::novelty;
pub use core::output;
pub use core::series;
pub use core::showmap;
pub use core::worker;

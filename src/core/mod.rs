pub mod app;
pub mod campaign;
pub mod cli;
pub mod cmds;
pub mod fuzzer_stats;
pub mod logging;
pub mod novelty;
pub mod output;
pub mod process;
pub mod series;
pub mod showmap;
pub mod types;
pub mod worker;

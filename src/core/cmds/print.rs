use crate::types::AppResult;

pub mod config;
pub mod targets;

pub enum PrintCommand {
    Config(String),
    Targets(String),
}

pub async fn execute_print(command: PrintCommand) -> AppResult<()> {
    match command {
        PrintCommand::Config(format) => config::execute(format).await,
        PrintCommand::Targets(format) => targets::execute(format).await,
    }
}

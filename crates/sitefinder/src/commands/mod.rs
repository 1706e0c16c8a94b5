//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod favorites;
pub mod key;
pub mod nearby;
pub mod route;
pub mod track;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a catalog- or service-bound command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    match cmd {
        Command::Nearby(args) => nearby::handle(args, global, &cfg),
        Command::Radius => nearby::radius(global, &cfg),
        Command::Route(args) => route::handle(args, global, &cfg).await,
        Command::Favorites(args) => favorites::handle(args, global, &cfg).await,
        Command::Key(args) => key::handle(&args, global),
        Command::Track(args) => track::handle(args, global, &cfg).await,
        Command::Config(_) | Command::Completions(_) => {
            unreachable!("handled before dispatch")
        }
    }
}

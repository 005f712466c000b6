//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new stagegraph repository
//! - `add`: Create a stage, optionally with prerequisites
//! - `list` / `show`: Inspect stages
//! - `dep`: Add, remove or list dependencies
//! - `status`: Move a stage through pending / in_progress / completed
//! - `delete`: Delete a stage and its edges
//! - `chains`: Chain and level annotations for an item
//! - `delay`: Delays, critical stages and total delay
//! - `ready` / `blocked`: What can start, and what is waiting
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! stagegraph add --item kitchen-1 --name Measurement
//! stagegraph add --item kitchen-1 --name Design --deps stg-a3f8
//! stagegraph status stg-a3f8 in_progress
//! stagegraph chains --item kitchen-1
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{
    AddArgs, BlockedArgs, ChainsArgs, DelayArgs, DeleteArgs, DepAction, DepArgs, InitArgs,
    ListArgs, ReadyArgs, ShowArgs, StatusArgs,
};
pub use types::StageStatusArg;
pub use validators::{
    parse_timestamp, validate_item_id, validate_name, validate_prefix, validate_stage_id,
};

/// Stagegraph - workflow stage dependencies and critical paths
///
/// Stages are stored in `.stagegraph/stages.jsonl` for easy version control integration.
#[derive(Parser, Debug)]
#[command(name = "stagegraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new stagegraph repository
    ///
    /// Creates the `.stagegraph/` directory with configuration and an empty stage file.
    Init(InitArgs),

    /// Create a new stage
    Add(AddArgs),

    /// List stages, optionally for one item
    List(ListArgs),

    /// Show a stage with its dependencies, dependents, level and chain
    Show(ShowArgs),

    /// Manage dependencies between stages
    ///
    /// Edges that would close a cycle within an item are rejected.
    Dep(DepArgs),

    /// Change a stage's status
    ///
    /// Moving to in_progress or completed requires every same-item
    /// prerequisite to be completed.
    Status(StatusArgs),

    /// Delete a stage permanently, together with its dependency edges
    Delete(DeleteArgs),

    /// Show chains and levels for an item
    Chains(ChainsArgs),

    /// Show delayed stages, the critical set and total delay
    Delay(DelayArgs),

    /// Show pending stages whose prerequisites are all completed
    Ready(ReadyArgs),

    /// Show unfinished stages waiting on prerequisites
    Blocked(BlockedArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(args, output_mode).await,
            Some(Commands::Add(args)) => {
                let mut app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_add(&mut app, args, output_mode).await
            }
            Some(Commands::List(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_list(&app, args, output_mode).await
            }
            Some(Commands::Show(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_show(&app, args, output_mode).await
            }
            Some(Commands::Dep(args)) => {
                let mut app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_dep(&mut app, args, output_mode).await
            }
            Some(Commands::Status(args)) => {
                let mut app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_status(&mut app, args, output_mode).await
            }
            Some(Commands::Delete(args)) => {
                let mut app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_delete(&mut app, args, output_mode).await
            }
            Some(Commands::Chains(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_chains(&app, args, output_mode).await
            }
            Some(Commands::Delay(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_delay(&app, args, output_mode).await
            }
            Some(Commands::Ready(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_ready(&app, args, output_mode).await
            }
            Some(Commands::Blocked(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_blocked(&app, args, output_mode).await
            }
            None => {
                println!("Stagegraph stage dependency tracker");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}

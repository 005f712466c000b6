//! CLI argument structs for all commands.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use super::types::StageStatusArg;
use super::validators::{
    parse_timestamp, validate_item_id, validate_name, validate_prefix, validate_stage_id,
};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Stage ID prefix (e.g., "shop" for "shop-a3f8")
    ///
    /// Must be 2-20 alphanumeric characters.
    #[arg(short, long, value_parser = validate_prefix)]
    pub prefix: Option<String>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `add` command
#[derive(Parser, Debug, Clone)]
pub struct AddArgs {
    /// Line item the stage belongs to
    #[arg(short, long, value_parser = validate_item_id)]
    pub item: String,

    /// Stage name (maximum 200 characters)
    #[arg(short, long, value_parser = validate_name)]
    pub name: String,

    /// Display order within the item
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub order: i32,

    /// Stage type tag (e.g., measurement, production)
    #[arg(short = 't', long = "type")]
    pub stage_type: Option<String>,

    /// Planned start (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_timestamp)]
    pub start: Option<DateTime<Utc>>,

    /// Planned end (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_timestamp)]
    pub end: Option<DateTime<Utc>>,

    /// Prerequisite stage IDs (comma-separated)
    #[arg(long, value_delimiter = ',', value_parser = validate_stage_id)]
    pub deps: Vec<String>,
}

/// Arguments for the `list` command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Only stages of this item
    #[arg(short, long, value_parser = validate_item_id)]
    pub item: Option<String>,

    /// Only stages with this status
    #[arg(short, long, value_enum)]
    pub status: Option<StageStatusArg>,
}

/// Arguments for the `show` command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Stage ID to display
    #[arg(value_parser = validate_stage_id)]
    pub stage_id: String,
}

/// Arguments for the `status` command
#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    /// Stage to update
    #[arg(value_parser = validate_stage_id)]
    pub stage_id: String,

    /// New status
    #[arg(value_enum)]
    pub status: StageStatusArg,
}

/// Arguments for the `delete` command
#[derive(Parser, Debug, Clone)]
pub struct DeleteArgs {
    /// Stage to delete, together with all its dependency edges
    #[arg(value_parser = validate_stage_id)]
    pub stage_id: String,
}

/// Arguments for the `dep` command
#[derive(Parser, Debug, Clone)]
pub struct DepArgs {
    /// Dependency subcommand
    #[command(subcommand)]
    pub action: DepAction,
}

/// Dependency management actions
#[derive(Subcommand, Debug, Clone)]
pub enum DepAction {
    /// Add a dependency
    Add {
        /// Stage that waits
        #[arg(value_parser = validate_stage_id)]
        stage: String,

        /// Stage that must finish first
        #[arg(value_parser = validate_stage_id)]
        depends_on: String,
    },

    /// Remove a dependency
    Remove {
        /// Stage that waits
        #[arg(value_parser = validate_stage_id)]
        stage: String,

        /// Stage that must finish first
        #[arg(value_parser = validate_stage_id)]
        depends_on: String,
    },

    /// List prerequisites and dependents of a stage
    List {
        /// Stage to inspect
        #[arg(value_parser = validate_stage_id)]
        stage: String,
    },
}

/// Arguments for the `chains` command
#[derive(Parser, Debug, Clone)]
pub struct ChainsArgs {
    /// Item to analyze
    #[arg(short, long, value_parser = validate_item_id)]
    pub item: String,
}

/// Arguments for the `delay` command
#[derive(Parser, Debug, Clone)]
pub struct DelayArgs {
    /// Only this item; whole project otherwise
    #[arg(short, long, value_parser = validate_item_id)]
    pub item: Option<String>,

    /// Reference time (RFC 3339 or YYYY-MM-DD); defaults to the current time
    #[arg(long, value_parser = parse_timestamp)]
    pub now: Option<DateTime<Utc>>,
}

/// Arguments for the `ready` command
#[derive(Parser, Debug, Clone)]
pub struct ReadyArgs {
    /// Item to inspect
    #[arg(short, long, value_parser = validate_item_id)]
    pub item: String,
}

/// Arguments for the `blocked` command
#[derive(Parser, Debug, Clone)]
pub struct BlockedArgs {
    /// Only stages of this item
    #[arg(short, long, value_parser = validate_item_id)]
    pub item: Option<String>,
}

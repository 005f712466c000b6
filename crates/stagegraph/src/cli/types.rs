//! CLI value enums and domain type conversions.

use clap::ValueEnum;

use crate::domain::StageStatus;

/// Stage status for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatusArg {
    /// Not started
    Pending,
    /// Currently being worked on
    #[value(name = "in_progress", alias = "in-progress")]
    InProgress,
    /// Finished
    Completed,
}

impl std::fmt::Display for StageStatusArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl From<StageStatusArg> for StageStatus {
    fn from(arg: StageStatusArg) -> Self {
        match arg {
            StageStatusArg::Pending => StageStatus::Pending,
            StageStatusArg::InProgress => StageStatus::InProgress,
            StageStatusArg::Completed => StageStatus::Completed,
        }
    }
}

//! Domain types for workflow stages.
//!
//! This module contains the core records the engine operates on: stages attached
//! to project line items, and the directed "depends on" edges between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for stage names
pub const MAX_NAME_LENGTH: usize = 200;

/// Unique identifier for a stage
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(pub String);

impl StageId {
    /// Create a new stage ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of the line item (furniture position) a stage belongs to.
///
/// Items partition the dependency graph: only edges whose endpoints share an
/// item take part in gating, leveling and cycle checks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new item ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not started yet
    #[default]
    Pending,

    /// Work on the stage has started
    InProgress,

    /// Stage is finished
    Completed,
}

impl StageStatus {
    fn rank(self) -> u8 {
        match self {
            StageStatus::Pending => 0,
            StageStatus::InProgress => 1,
            StageStatus::Completed => 2,
        }
    }

    /// Whether moving from this status to `target` requires completed
    /// prerequisites.
    ///
    /// Only forward moves are gated. Reopening a completed stage to
    /// `in_progress` or `pending` is not.
    pub fn is_gated_move(self, target: StageStatus) -> bool {
        target.rank() > self.rank()
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "pending"),
            StageStatus::InProgress => write!(f, "in_progress"),
            StageStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One workflow step attached to a project line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Unique identifier for the stage
    pub id: StageId,

    /// Line item this stage belongs to
    pub item_id: ItemId,

    /// Display label
    pub name: String,

    /// Current status
    #[serde(default)]
    pub status: StageStatus,

    /// Planned start (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start_date: Option<DateTime<Utc>>,

    /// Planned end (optional); drives delay detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_end_date: Option<DateTime<Utc>>,

    /// Display ordering within the item; no graph semantics
    #[serde(default)]
    pub order: i32,

    /// Categorical tag (measurement, production, ...), rendering only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_type_id: Option<String>,
}

impl Stage {
    /// Create a pending stage with no schedule.
    pub fn new(id: impl Into<StageId>, item_id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_id: item_id.into(),
            name: name.into(),
            status: StageStatus::Pending,
            planned_start_date: None,
            planned_end_date: None,
            order: 0,
            stage_type_id: None,
        }
    }

    /// Validate the stage fields.
    ///
    /// Names must be non-blank and at most [`MAX_NAME_LENGTH`] characters, the
    /// item must be set, and a planned start may not come after the planned end.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().trim().is_empty() {
            return Err("Stage ID cannot be empty".to_string());
        }
        if self.item_id.as_str().trim().is_empty() {
            return Err("Item ID cannot be empty".to_string());
        }
        validate_name(&self.name)?;
        if let (Some(start), Some(end)) = (self.planned_start_date, self.planned_end_date) {
            if start > end {
                return Err(format!(
                    "Planned start {} is after planned end {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                ));
            }
        }
        Ok(())
    }
}

/// Shared name validation used by stages and stage updates.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Stage name cannot be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "Stage name cannot exceed {} characters",
            MAX_NAME_LENGTH
        ));
    }
    Ok(())
}

/// Directed dependency edge: `stage_id` waits for `depends_on_stage_id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// The dependent stage (the one that waits)
    pub stage_id: StageId,

    /// The prerequisite stage (the one that must finish first)
    pub depends_on_stage_id: StageId,
}

impl Dependency {
    /// Create a new dependency edge
    pub fn new(stage_id: impl Into<StageId>, depends_on_stage_id: impl Into<StageId>) -> Self {
        Self {
            stage_id: stage_id.into(),
            depends_on_stage_id: depends_on_stage_id.into(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.stage_id, self.depends_on_stage_id)
    }
}

/// Data for creating a new stage
#[derive(Debug, Clone)]
pub struct NewStage {
    /// Line item the stage belongs to
    pub item_id: ItemId,

    /// Display label
    pub name: String,

    /// Display ordering within the item
    pub order: i32,

    /// Categorical tag (optional)
    pub stage_type_id: Option<String>,

    /// Planned start (optional)
    pub planned_start_date: Option<DateTime<Utc>>,

    /// Planned end (optional)
    pub planned_end_date: Option<DateTime<Utc>>,

    /// Prerequisites to attach on creation
    pub depends_on: Vec<StageId>,
}

impl NewStage {
    /// Create stage data with only the required fields set.
    pub fn new(item_id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            order: 0,
            stage_type_id: None,
            planned_start_date: None,
            planned_end_date: None,
            depends_on: Vec::new(),
        }
    }

    /// Build the stage record for a freshly generated ID.
    pub fn into_stage(self, id: StageId) -> Stage {
        Stage {
            id,
            item_id: self.item_id,
            name: self.name,
            status: StageStatus::Pending,
            planned_start_date: self.planned_start_date,
            planned_end_date: self.planned_end_date,
            order: self.order,
            stage_type_id: self.stage_type_id,
        }
    }
}

/// Data for updating the free-form fields of an existing stage.
///
/// Status is deliberately absent: status changes go through the transition gate.
#[derive(Debug, Clone, Default)]
pub struct StageUpdate {
    /// New name (if updating)
    pub name: Option<String>,

    /// New display order (if updating)
    pub order: Option<i32>,

    /// New stage type (if updating, `Some(None)` to clear)
    pub stage_type_id: Option<Option<String>>,

    /// New planned start (if updating, `Some(None)` to clear)
    pub planned_start_date: Option<Option<DateTime<Utc>>>,

    /// New planned end (if updating, `Some(None)` to clear)
    pub planned_end_date: Option<Option<DateTime<Utc>>>,
}

/// Persisted form of a stage: the stage fields plus its outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// The stage itself
    #[serde(flatten)]
    pub stage: Stage,

    /// IDs of the stages this one depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<StageId>,
}

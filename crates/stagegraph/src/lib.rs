//! Stagegraph - stage dependencies and critical paths for order workflows.
//!
//! Each line item of a project moves through an ordered set of stages
//! (measurement, design, approval, production, delivery, ...). Stages of the
//! same item can depend on each other; this crate keeps those dependencies
//! acyclic, groups stages into chains, computes levels, refuses status changes
//! that would skip unfinished prerequisites, and reports schedule slippage
//! along with everything downstream of it.
//!
//! The engine is synchronous and works on an explicit [`graph::StageGraph`]
//! value. The [`storage`] layer wraps it for async callers and persists it as
//! JSON Lines; the [`cli`] module is the bundled command-line front end.
//!
//! # Example
//!
//! ```
//! use stagegraph::domain::{Stage, StageId, StageStatus};
//! use stagegraph::graph::StageGraph;
//!
//! let mut graph = StageGraph::new();
//! graph.insert_stage(Stage::new("stg-a", "kitchen-1", "Measurement")).unwrap();
//! graph.insert_stage(Stage::new("stg-b", "kitchen-1", "Design")).unwrap();
//! graph.add_dependency(&StageId::new("stg-b"), &StageId::new("stg-a")).unwrap();
//!
//! // Design cannot start before measurement is done.
//! assert!(graph.set_status(&StageId::new("stg-b"), StageStatus::InProgress).is_err());
//! ```

#![forbid(unsafe_code)]

// Engine
pub mod analysis;
pub mod domain;
pub mod error;
pub mod gate;
pub mod graph;

// Persistence
pub mod id_generation;
pub mod storage;

// CLI support
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod output;

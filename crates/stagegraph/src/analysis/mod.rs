//! Read-only views derived from a [`StageGraph`](crate::graph::StageGraph).
//!
//! - [`chains`]: connected components, display colors and topological levels
//! - [`delay`]: schedule slippage, critical set and total delay

pub mod chains;
pub mod delay;

pub use chains::{compute_levels, Chain, ChainAnalysis, Palette, StageAnnotation, DEFAULT_PALETTE};
pub use delay::{delay_of, DelayReport, StageDelay};

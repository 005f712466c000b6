//! Output formatting for CLI commands.
//!
//! Every printer takes an [`OutputMode`]: human-readable text for terminals,
//! or pretty-printed JSON for scripts. Text writers are generic over
//! [`Write`] so they can be tested against a buffer.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers (semantic colors, icons, chain colors)

pub mod color;

use crate::analysis::{ChainAnalysis, DelayReport, StageAnnotation};
use crate::domain::{Stage, StageId};
use crate::error::Blocker;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, success, warning};

use color::{bold, chain_colored, colored_status_icon, colorize_id, colorize_status, dimmed};

// ============================================================================
// Output Configuration
// ============================================================================

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with explicit values.
    pub fn new(use_ascii: bool, use_colors: bool) -> Self {
        Self {
            use_ascii,
            use_colors,
        }
    }

    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `STAGEGRAPH_ASCII`: Set to "1" or "true" for ASCII-only icons (default: false)
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `STAGEGRAPH_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        let use_ascii = match env::var("STAGEGRAPH_ASCII") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Ok(v) => {
                tracing::warn!(
                    env_var = "STAGEGRAPH_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            Err(_) => false,
        };

        // https://no-color.org/
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("STAGEGRAPH_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Everything `show` prints about one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageDetails {
    /// The stage itself
    #[serde(flatten)]
    pub stage: Stage,
    /// Direct prerequisites, any item
    pub dependencies: Vec<Stage>,
    /// Stages directly waiting on this one, any item
    pub dependents: Vec<Stage>,
    /// Chain and level within the stage's item
    pub annotation: Option<StageAnnotation>,
}

// ============================================================================
// Public Dispatch Functions
// ============================================================================

/// Print a single stage in the specified format
pub fn print_stage(stage: &Stage, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_stage_line(&mut handle, stage, &config),
        OutputMode::Json => write_json(&mut handle, stage),
    }
}

/// Print a list of stages in the specified format
pub fn print_stages(stages: &[Stage], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_stages_text(&mut handle, stages, &config),
        OutputMode::Json => write_json(&mut handle, &stages),
    }
}

/// Print a stage with its neighbours and annotation (for `show` and `dep list`)
pub fn print_stage_details(details: &StageDetails, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_stage_details_text(&mut handle, details, &config),
        OutputMode::Json => write_json(&mut handle, details),
    }
}

/// Print the chains of an item; `stages` supplies names and statuses
pub fn print_chains(analysis: &ChainAnalysis, stages: &[Stage], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_chains_text(&mut handle, analysis, stages, &config),
        OutputMode::Json => write_json(&mut handle, analysis),
    }
}

/// Print a delay report
pub fn print_delay_report(report: &DelayReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_delay_text(&mut handle, report, &config),
        OutputMode::Json => write_json(&mut handle, report),
    }
}

/// Print blocked stages with their blockers
pub fn print_blocked(blocked: &[(Stage, Vec<Blocker>)], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_blocked_text(&mut handle, blocked, &config),
        OutputMode::Json => {
            #[derive(Serialize)]
            struct BlockedStage<'a> {
                #[serde(flatten)]
                stage: &'a Stage,
                blocked_by: &'a [Blocker],
            }
            let rows: Vec<BlockedStage<'_>> = blocked
                .iter()
                .map(|(stage, blockers)| BlockedStage {
                    stage,
                    blocked_by: blockers,
                })
                .collect();
            write_json(&mut handle, &rows)
        }
    }
}

/// Print a simple message
pub fn print_message(msg: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", msg)
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{}", json)
}

// ============================================================================
// Text Formatting
// ============================================================================

fn write_stage_line<W: Write>(w: &mut W, stage: &Stage, config: &OutputConfig) -> io::Result<()> {
    writeln!(
        w,
        "{} {}  {}  {}",
        colored_status_icon(stage.status, config),
        colorize_id(stage.id.as_str(), config),
        dimmed(&format!("[{} #{}]", stage.item_id, stage.order), config),
        stage.name
    )
}

fn write_stages_text<W: Write>(w: &mut W, stages: &[Stage], config: &OutputConfig) -> io::Result<()> {
    if stages.is_empty() {
        writeln!(w, "No stages found.")?;
        return Ok(());
    }

    writeln!(w, "Found {} stage(s):", stages.len())?;
    writeln!(w)?;
    for stage in stages {
        write_stage_line(w, stage, config)?;
    }
    Ok(())
}

fn write_stage_details_text<W: Write>(
    w: &mut W,
    details: &StageDetails,
    config: &OutputConfig,
) -> io::Result<()> {
    let stage = &details.stage;

    writeln!(
        w,
        "{} {}: {}",
        colored_status_icon(stage.status, config),
        colorize_id(stage.id.as_str(), config),
        stage.name
    )?;
    writeln!(
        w,
        "{} {}    {} {}    {} {}",
        dimmed("Item:", config),
        stage.item_id,
        dimmed("Status:", config),
        colorize_status(stage.status, config),
        dimmed("Order:", config),
        stage.order
    )?;

    if let Some(ref stage_type) = stage.stage_type_id {
        writeln!(w, "{} {}", dimmed("Type:", config), stage_type)?;
    }
    if stage.planned_start_date.is_some() || stage.planned_end_date.is_some() {
        let fmt = |d: Option<chrono::DateTime<chrono::Utc>>| {
            d.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string())
        };
        writeln!(
            w,
            "{} {}    {} {}",
            dimmed("Planned start:", config),
            fmt(stage.planned_start_date),
            dimmed("Planned end:", config),
            fmt(stage.planned_end_date)
        )?;
    }

    if let Some(ref annotation) = details.annotation {
        let chain = match (annotation.chain_id, annotation.color.as_deref()) {
            (Some(id), Some(color)) => chain_colored(&format!("chain {id}"), color, config),
            _ => "none".to_string(),
        };
        writeln!(
            w,
            "{} {}    {} {}",
            dimmed("Level:", config),
            annotation.level,
            dimmed("Chain:", config),
            chain
        )?;
    }

    write_stage_section(w, "Depends on", &details.dependencies, config)?;
    write_stage_section(w, "Dependents", &details.dependents, config)?;
    Ok(())
}

fn write_stage_section<W: Write>(
    w: &mut W,
    title: &str,
    stages: &[Stage],
    config: &OutputConfig,
) -> io::Result<()> {
    if stages.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    writeln!(w, "{} ({}):", bold(title, config), stages.len())?;
    for stage in stages {
        write!(w, "  ")?;
        write_stage_line(w, stage, config)?;
    }
    Ok(())
}

fn write_chains_text<W: Write>(
    w: &mut W,
    analysis: &ChainAnalysis,
    stages: &[Stage],
    config: &OutputConfig,
) -> io::Result<()> {
    if analysis.annotations.is_empty() {
        writeln!(w, "No stages for item {}.", analysis.item_id)?;
        return Ok(());
    }

    let find = |id: &StageId| stages.iter().find(|s| &s.id == id);

    writeln!(
        w,
        "Item {}: {} chain(s)",
        analysis.item_id,
        analysis.chains.len()
    )?;

    for chain in &analysis.chains {
        writeln!(w)?;
        let marker = if config.use_ascii { "*" } else { "●" };
        writeln!(
            w,
            "{} {}",
            chain_colored(marker, &chain.color, config),
            bold(&format!("Chain {} ({})", chain.id, chain.color), config)
        )?;
        for member in &chain.members {
            let level = analysis.level(member).unwrap_or_default();
            match find(member) {
                Some(stage) => {
                    write!(w, "  {} ", dimmed(&format!("L{level}"), config))?;
                    write_stage_line(w, stage, config)?;
                }
                None => writeln!(w, "  L{level} {}", member)?,
            }
        }
    }

    let unchained: Vec<&StageAnnotation> = analysis
        .annotations
        .iter()
        .filter(|a| a.chain_id.is_none())
        .collect();
    if !unchained.is_empty() {
        writeln!(w)?;
        writeln!(w, "{} ({}):", bold("Unchained", config), unchained.len())?;
        for annotation in unchained {
            if let Some(stage) = find(&annotation.stage_id) {
                write!(w, "  ")?;
                write_stage_line(w, stage, config)?;
            }
        }
    }
    Ok(())
}

fn write_delay_text<W: Write>(
    w: &mut W,
    report: &DelayReport,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{} {}",
        dimmed("As of:", config),
        report.now.format("%Y-%m-%d %H:%M UTC")
    )?;

    if report.delayed.is_empty() {
        writeln!(w, "{}", success("All stages on schedule.", config))?;
        return Ok(());
    }

    writeln!(
        w,
        "{} {}",
        bold("Total delay:", config),
        warning(&format!("{} day(s)", report.total_delay_days), config)
    )?;

    writeln!(w)?;
    writeln!(w, "{} ({}):", bold("Delayed", config), report.delayed.len())?;
    for delay in &report.delayed {
        writeln!(
            w,
            "  {}  {}  {}  {}",
            colorize_id(delay.stage_id.as_str(), config),
            dimmed(&format!("[{}]", delay.item_id), config),
            delay.name,
            warning(&format!("+{} day(s)", delay.days), config)
        )?;
    }

    writeln!(w)?;
    writeln!(w, "{} ({}):", bold("Critical", config), report.critical.len())?;
    for id in &report.critical {
        writeln!(w, "  {}", error(id.as_str(), config))?;
    }
    Ok(())
}

fn write_blocked_text<W: Write>(
    w: &mut W,
    blocked: &[(Stage, Vec<Blocker>)],
    config: &OutputConfig,
) -> io::Result<()> {
    if blocked.is_empty() {
        writeln!(w, "No blocked stages.")?;
        return Ok(());
    }

    writeln!(w, "Blocked stages ({}):", blocked.len())?;
    for (stage, blockers) in blocked {
        writeln!(w)?;
        write_stage_line(w, stage, config)?;
        for blocker in blockers {
            writeln!(
                w,
                "  {} {}",
                dimmed("waiting on", config),
                error(&blocker.to_string(), config)
            )?;
        }
    }
    Ok(())
}

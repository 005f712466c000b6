//! Command execution logic.

use anyhow::Result;
use chrono::Utc;

use super::args::{
    AddArgs, BlockedArgs, ChainsArgs, DelayArgs, DeleteArgs, DepAction, DepArgs, InitArgs,
    ListArgs, ReadyArgs, ShowArgs, StatusArgs,
};
use crate::analysis::{ChainAnalysis, DelayReport};
use crate::app::App;
use crate::domain::{ItemId, NewStage, Stage, StageId, StageStatus};
use crate::gate;
use crate::graph::StageGraph;
use crate::output::{self, OutputMode, StageDetails};

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir, args.prefix.as_deref()).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&result)?,
        OutputMode::Text if !args.quiet => {
            println!("Initialized stagegraph in {}", result.stagegraph_dir.display());
            println!("  Config: {}", result.config_file.display());
            println!("  Stages: {}", result.stages_file.display());
            println!("  Stage prefix: {}", result.prefix);
        }
        OutputMode::Text => {}
    }

    Ok(())
}

/// Execute the add command
pub async fn execute_add(app: &mut App, args: &AddArgs, output_mode: OutputMode) -> Result<()> {
    let new_stage = NewStage {
        item_id: ItemId::new(&args.item),
        name: args.name.clone(),
        order: args.order,
        stage_type_id: args.stage_type.clone(),
        planned_start_date: args.start,
        planned_end_date: args.end,
        depends_on: args.deps.iter().map(StageId::new).collect(),
    };

    let stage = app.storage_mut().create(new_stage).await?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => output::print_json(&stage)?,
        OutputMode::Text => {
            println!("Created stage {}: {}", stage.id, stage.name);
        }
    }
    Ok(())
}

/// Execute the list command
pub async fn execute_list(app: &App, args: &ListArgs, output_mode: OutputMode) -> Result<()> {
    let item = args.item.as_deref().map(ItemId::new);
    let mut stages = app.storage().list(item.as_ref()).await?;

    if let Some(status) = args.status {
        let status = StageStatus::from(status);
        stages.retain(|s| s.status == status);
    }

    output::print_stages(&stages, output_mode)?;
    Ok(())
}

/// Execute the show command
pub async fn execute_show(app: &App, args: &ShowArgs, output_mode: OutputMode) -> Result<()> {
    let graph = app.storage().snapshot().await?;
    let details = stage_details(&graph, app, &StageId::new(&args.stage_id))?;
    output::print_stage_details(&details, output_mode)?;
    Ok(())
}

/// Execute the status command
pub async fn execute_status(
    app: &mut App,
    args: &StatusArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let id = StageId::new(&args.stage_id);
    let change = app.storage_mut().set_status(&id, args.status.into()).await?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "stage_id": id,
            "previous": change.previous,
            "current": change.current,
        }))?,
        OutputMode::Text => {
            println!("{}: {} -> {}", id, change.previous, change.current);
        }
    }
    Ok(())
}

/// Execute the delete command
pub async fn execute_delete(
    app: &mut App,
    args: &DeleteArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let id = StageId::new(&args.stage_id);
    let removed = app.storage_mut().delete(&id).await?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "action": "delete",
            "stage_id": removed.id,
            "status": "success",
        }))?,
        OutputMode::Text => println!("Deleted stage {}: {}", removed.id, removed.name),
    }
    Ok(())
}

/// Execute the dep command
pub async fn execute_dep(app: &mut App, args: &DepArgs, output_mode: OutputMode) -> Result<()> {
    match &args.action {
        DepAction::Add { stage, depends_on } => {
            let from = StageId::new(stage);
            let to = StageId::new(depends_on);

            app.storage_mut().add_dependency(&from, &to).await?;
            app.save().await?;

            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "action": "add",
                    "stage_id": from,
                    "depends_on_stage_id": to,
                    "status": "success",
                }))?,
                OutputMode::Text => println!("Added dependency: {} --> {}", from, to),
            }
        }
        DepAction::Remove { stage, depends_on } => {
            let from = StageId::new(stage);
            let to = StageId::new(depends_on);

            app.storage_mut().remove_dependency(&from, &to).await?;
            app.save().await?;

            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "action": "remove",
                    "stage_id": from,
                    "depends_on_stage_id": to,
                    "status": "success",
                }))?,
                OutputMode::Text => println!("Removed dependency: {} --> {}", from, to),
            }
        }
        DepAction::List { stage } => {
            let graph = app.storage().snapshot().await?;
            let details = stage_details(&graph, app, &StageId::new(stage))?;
            output::print_stage_details(&details, output_mode)?;
        }
    }
    Ok(())
}

/// Execute the chains command
pub async fn execute_chains(app: &App, args: &ChainsArgs, output_mode: OutputMode) -> Result<()> {
    let item = ItemId::new(&args.item);
    let graph = app.storage().snapshot().await?;

    let analysis = ChainAnalysis::for_item(&graph, &item, app.palette())?;
    let stages: Vec<Stage> = graph.stages_for_item(&item).into_iter().cloned().collect();

    output::print_chains(&analysis, &stages, output_mode)?;
    Ok(())
}

/// Execute the delay command
pub async fn execute_delay(app: &App, args: &DelayArgs, output_mode: OutputMode) -> Result<()> {
    let now = args.now.unwrap_or_else(Utc::now);
    let graph = app.storage().snapshot().await?;

    let report = match &args.item {
        Some(item) => DelayReport::for_item(&graph, &ItemId::new(item), now)?,
        None => DelayReport::for_project(&graph, now)?,
    };

    output::print_delay_report(&report, output_mode)?;
    Ok(())
}

/// Execute the ready command
pub async fn execute_ready(app: &App, args: &ReadyArgs, output_mode: OutputMode) -> Result<()> {
    let graph = app.storage().snapshot().await?;
    let ready: Vec<Stage> = gate::ready_stages(&graph, &ItemId::new(&args.item))?
        .into_iter()
        .cloned()
        .collect();

    output::print_stages(&ready, output_mode)?;
    Ok(())
}

/// Execute the blocked command
pub async fn execute_blocked(
    app: &App,
    args: &BlockedArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let graph = app.storage().snapshot().await?;
    let item = args.item.as_deref().map(ItemId::new);

    let blocked: Vec<_> = gate::blocked_stages(&graph)?
        .into_iter()
        .filter(|(stage, _)| item.as_ref().is_none_or(|item| &stage.item_id == item))
        .map(|(stage, blockers)| (stage.clone(), blockers))
        .collect();

    output::print_blocked(&blocked, output_mode)?;
    Ok(())
}

/// Collect a stage, its neighbours and its chain annotation.
fn stage_details(graph: &StageGraph, app: &App, id: &StageId) -> Result<StageDetails> {
    let stage = graph.require_stage(id)?.clone();

    let lookup = |ids: std::collections::BTreeSet<StageId>| -> Vec<Stage> {
        ids.iter()
            .filter_map(|id| graph.stage(id).cloned())
            .collect()
    };
    let dependencies = lookup(graph.dependencies_of(id)?);
    let dependents = lookup(graph.dependents_of(id)?);

    let annotation = ChainAnalysis::for_item(graph, &stage.item_id, app.palette())?
        .annotation(id)
        .cloned();

    Ok(StageDetails {
        stage,
        dependencies,
        dependents,
        annotation,
    })
}

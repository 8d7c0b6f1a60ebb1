// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigSection, PlanFile};
use crate::dag::BuildPlan;
use crate::engine::{Driver, LogStatusSink, RunOptions, RunReport};
use crate::errors::{Result, WavebuildError};
use crate::exec::{DockerExecutor, DockerPublisher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading and validation
/// - CLI overrides and the `--only` selection
/// - docker executor / publisher
/// - the wave driver
pub async fn run(args: CliArgs) -> Result<RunReport> {
    let plan_file = load_and_validate(&args.config)?;
    let options = resolve_options(&args, plan_file.config())?;
    let plan = build_plan(&plan_file, &args)?;

    if args.dry_run {
        print_dry_run(&plan, &options);
        return Ok(RunReport::default());
    }

    let cfg = plan_file.config();
    let executor = DockerExecutor::new(cfg.registry.clone())
        .with_no_cache(args.no_cache || cfg.no_cache)
        .with_push(options.publish_enabled);
    let publisher = DockerPublisher::new(cfg.registry.clone());

    let driver = Driver::new(
        plan,
        options,
        Arc::new(executor),
        Arc::new(publisher),
        Arc::new(LogStatusSink),
    );
    let report = driver.run().await?.into_result()?;

    info!(
        published = report.published.len(),
        completed = report.completed,
        "all done"
    );
    Ok(report)
}

/// Merge CLI overrides into the `[config]` section.
pub fn resolve_options(args: &CliArgs, cfg: &ConfigSection) -> Result<RunOptions> {
    let max_parallelism = args.parallel.unwrap_or(cfg.max_parallelism);
    if max_parallelism == 0 {
        return Err(WavebuildError::ConfigError(
            "--parallel must be >= 1".to_string(),
        ));
    }

    Ok(RunOptions {
        max_parallelism,
        publish_enabled: cfg.publish && !args.no_push,
    })
}

fn build_plan(plan_file: &PlanFile, args: &CliArgs) -> Result<BuildPlan> {
    let plan = BuildPlan::from_plan(plan_file);
    match &args.only {
        Some(selection) => {
            debug!(selection = ?selection, "restricting plan");
            plan.select(selection)
        }
        None => Ok(plan),
    }
}

/// Dry-run output: options, then every wave with its groups and variants.
fn print_dry_run(plan: &BuildPlan, options: &RunOptions) {
    println!("wavebuild dry-run");
    println!("  max_parallelism = {}", options.max_parallelism);
    println!("  publish = {}", options.publish_enabled);
    println!();

    println!("tasks ({}):", plan.task_count());
    for (i, wave) in plan.waves().iter().enumerate() {
        println!("wave {}:", i + 1);
        for name in wave {
            let Some(node) = plan.group(name) else {
                continue;
            };
            println!("  - {name} [{}]", node.variants.join(", "));
            if let Some(from) = &node.from {
                println!("      from: {from}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

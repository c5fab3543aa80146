//! Push command: publish the docs tree to Notion.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::cli::commands::print_warnings;
use crate::cli::PushArgs;
use crate::config::NotionSettings;
use crate::error::{Error, Result};
use crate::loaders::{build_publish_plan, DocsProject};
use crate::notion::{NotionClient, RateLimiter, RetryPolicy, SerializeOptions};
use crate::sync::{
    write_warning_log, IdentityMap, SyncEngine, SyncOptions, SyncReport, SyncStats,
};

#[derive(Serialize)]
struct PushOutput<'a> {
    success: bool,
    parent: &'a str,
    docs_path: String,
    identity_map: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_file: Option<String>,
    stats: SyncStats,
    report: &'a SyncReport,
}

/// Execute the push command.
///
/// # Errors
///
/// Returns an error if loading or configuration fails, the run aborts, any
/// document failed, or `--strict` is set and warnings were raised.
pub fn execute(args: &PushArgs, json: bool, quiet: bool) -> Result<()> {
    let project = DocsProject::load(&args.source.path, args.source.mkdocs.as_deref())?;
    let settings = NotionSettings::resolve(args.parent.as_deref())?;
    let parent_id = settings.require_parent()?.to_string();

    let structure_warnings = project.validate_structure();
    let plan = build_publish_plan(&project);
    let sources: Vec<&str> = project.directory.paths().collect();
    let mut ids = IdentityMap::for_docs_root(&project.docs_path, args.fresh)?;
    info!(
        docs = %project.docs_path.display(),
        documents = plan.len(),
        files = sources.len(),
        mapped = ids.len(),
        "Loaded docs tree"
    );

    let options = SyncOptions {
        strict: args.source.strict,
        deletion_policy: args.on_delete,
        serialize: SerializeOptions {
            asset_base_url: settings.asset_base_url.clone(),
            docs_root: Some(project.docs_path.clone()),
        },
    };
    let client = NotionClient::new(&settings)?;
    let limiter = RateLimiter::per_second(settings.rate_limit);
    let retry = RetryPolicy {
        max_attempts: settings.max_attempts,
        ..RetryPolicy::default()
    };

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;
    let engine = SyncEngine::new(&client, &limiter, &retry, &options);
    let mut report = rt.block_on(engine.run(&parent_id, &plan, &sources, &mut ids))?;

    let mut warnings = structure_warnings;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;

    let log_file = write_log(args.log_dir.as_ref(), &project, &report);

    if json {
        let output = PushOutput {
            success: report.failed.is_empty(),
            parent: &parent_id,
            docs_path: project.docs_path.display().to_string(),
            identity_map: ids.path().display().to_string(),
            log_file: log_file.as_ref().map(|p| p.display().to_string()),
            stats: report.stats(),
            report: &report,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        print_summary(&report, &parent_id, log_file.as_ref());
    }

    report.outcome(options.strict)
}

fn write_log(
    dir: Option<&PathBuf>,
    project: &DocsProject,
    report: &SyncReport,
) -> Option<PathBuf> {
    let dir = dir?;
    if report.warnings.is_empty() {
        return None;
    }
    match write_warning_log(dir, &project.root_name(), &report.warnings) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Could not write warning log");
            None
        }
    }
}

fn print_summary(report: &SyncReport, parent_id: &str, log_file: Option<&PathBuf>) {
    let stats = report.stats();
    println!("{} {}", "Published to".bold(), parent_id.cyan());
    println!();
    println!("  Created:   {}", stats.created.to_string().green());
    println!("  Updated:   {}", stats.updated.to_string().green());
    println!("  Unchanged: {}", stats.unchanged.to_string().dimmed());
    if stats.deleted > 0 {
        println!("  Removed:   {}", stats.deleted.to_string().yellow());
    }
    if stats.failed > 0 {
        println!("  Failed:    {}", stats.failed.to_string().red());
        for failure in &report.failed {
            println!(
                "    {} {} {}",
                failure.path.bold(),
                format!("({})", failure.operation).dimmed(),
                failure.error
            );
        }
    }

    if !report.warnings.is_empty() {
        println!();
        println!("{}", format!("{} warnings", stats.warnings).yellow());
        match log_file {
            Some(path) => println!("  Written to {}", path.display()),
            None => print_warnings(&report.warnings),
        }
    }
}

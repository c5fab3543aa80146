//! Dry-run command: plan a push without calling Notion.

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::print_warnings;
use crate::cli::DryRunArgs;
use crate::config::resolve_asset_base_url;
use crate::error::{Error, Result};
use crate::loaders::{build_publish_plan, DocsProject};
use crate::notion::SerializeOptions;
use crate::sync::{plan_changes, DryRunReport, IdentityMap, PlannedAction, SyncOptions};

#[derive(Serialize)]
struct Summary {
    create: usize,
    update: usize,
    unchanged: usize,
    remove: usize,
    skip: usize,
    warnings: usize,
}

impl Summary {
    fn of(report: &DryRunReport) -> Self {
        Self {
            create: report.count(PlannedAction::Create),
            update: report.count(PlannedAction::Update),
            unchanged: report.count(PlannedAction::Unchanged),
            remove: report.count(PlannedAction::Archive) + report.count(PlannedAction::Mark),
            skip: report.count(PlannedAction::Skip),
            warnings: report.warnings.len(),
        }
    }
}

/// Execute the dry-run command.
///
/// # Errors
///
/// Returns an error if the docs tree or identity map cannot be loaded, or
/// `--strict` is set and warnings were raised.
pub fn execute(args: &DryRunArgs, json: bool, quiet: bool) -> Result<()> {
    let project = DocsProject::load(&args.source.path, args.source.mkdocs.as_deref())?;
    let ids = IdentityMap::for_docs_root(&project.docs_path, args.fresh)?;
    let options = SyncOptions {
        strict: args.source.strict,
        deletion_policy: args.on_delete,
        serialize: SerializeOptions {
            asset_base_url: resolve_asset_base_url()?,
            docs_root: Some(project.docs_path.clone()),
        },
    };

    let plan = build_publish_plan(&project);
    let sources: Vec<&str> = project.directory.paths().collect();
    let mut report = plan_changes(&plan, &sources, &ids, &options);
    let mut warnings = project.validate_structure();
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    let summary = Summary::of(&report);

    if json {
        let output = serde_json::json!({
            "docs_path": project.docs_path.display().to_string(),
            "summary": summary,
            "changes": report.changes,
            "warnings": report.warnings,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        print_plan(&report, &summary);
    }

    if options.strict && !report.warnings.is_empty() {
        return Err(Error::StrictWarnings {
            count: report.warnings.len(),
        });
    }
    Ok(())
}

fn print_plan(report: &DryRunReport, summary: &Summary) {
    if report.changes.is_empty() {
        println!("No documents found.");
        return;
    }

    for change in &report.changes {
        let action = format!("{:<9}", change.action.as_str());
        let action = match change.action {
            PlannedAction::Create => action.green(),
            PlannedAction::Update => action.cyan(),
            PlannedAction::Unchanged | PlannedAction::Keep => action.dimmed(),
            PlannedAction::Archive | PlannedAction::Mark => action.yellow(),
            PlannedAction::Skip => action.red(),
        };
        let indent = if change.parent_path.is_some() { "    " } else { "  " };
        let title = format!("→ {}", change.title).dimmed();
        println!("{indent}{action} {} {title}", change.path);
    }

    println!();
    println!(
        "{} to create, {} to update, {} unchanged, {} to remove",
        summary.create, summary.update, summary.unchanged, summary.remove
    );
    if summary.skip > 0 {
        println!("{}", format!("{} unreadable documents skipped", summary.skip).red());
    }
    if !report.warnings.is_empty() {
        println!("{}", format!("{} warnings", summary.warnings).yellow());
        print_warnings(&report.warnings);
    }
}

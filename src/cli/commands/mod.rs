//! Command implementations.

use colored::Colorize;

use crate::markdown::SourceWarning;

pub mod completions;
pub mod dry_run;
pub mod push;
pub mod validate;
pub mod version;

/// Print warnings to stderr, one per line.
fn print_warnings(warnings: &[SourceWarning]) {
    for warning in warnings {
        eprintln!("  {} {warning}", "warning:".yellow());
    }
}

//! Implementation of the `mediatask check` command.

use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::Result;
use crate::template::TemplateEngine;

/// Load and validate a pipeline config.
///
/// Validation errors exit with code 2. Unknown pipes are printed as warnings.
pub fn cmd_check(args: CheckArgs) -> Result<()> {
    let config = Config::load(&args.config)?;

    let warnings = config.template_warnings(&TemplateEngine::new());
    for warning in &warnings {
        eprintln!("Warning: {}", warning);
    }

    let workflow_tasks: usize = config.workflows.values().map(Vec::len).sum();
    println!(
        "{}: OK ({} task(s), {} workflow(s) with {} task(s), {} export target(s), {} warning(s))",
        args.config.display(),
        config.tasks.len(),
        config.workflows.len(),
        workflow_tasks,
        config.exports.len(),
        warnings.len()
    );
    Ok(())
}

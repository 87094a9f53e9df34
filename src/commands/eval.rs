//! Implementation of the `mediatask eval` command.

use super::{parse_document, read_data, read_inline_or_file};
use crate::cli::EvalArgs;
use crate::condition::{evaluate_condition, parse_condition};
use crate::error::{MediaTaskError, Result};

/// Evaluate a condition and print `true` or `false`.
///
/// A malformed condition is reported on stderr and evaluates to `false`.
/// With `--exit-status`, a false result exits with code 5.
pub fn cmd_eval(args: EvalArgs) -> Result<()> {
    let text = read_inline_or_file(&args.condition)?;
    let value = parse_document(&text).map_err(|e| {
        MediaTaskError::UserError(format!("failed to parse condition as JSON or YAML: {}", e))
    })?;
    let data = read_data(args.data.as_deref())?;

    let condition = parse_condition(&value);
    if let Some(node) = &condition
        && let Err(e) = node.validate()
    {
        eprintln!("Warning: {}", e);
    }

    let result = evaluate_condition(condition.as_ref(), &data);
    println!("{}", result);

    if args.exit_status && !result {
        return Err(MediaTaskError::ConditionFalse);
    }
    Ok(())
}

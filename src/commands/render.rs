//! Implementation of the `mediatask render` command.

use super::{read_data, read_inline_or_file};
use crate::cli::RenderArgs;
use crate::error::Result;
use crate::template::TemplateEngine;

/// Render a template and print the result.
///
/// Unknown pipes are logged as warnings while rendering; they do not change
/// the exit code.
pub fn cmd_render(args: RenderArgs) -> Result<()> {
    let template = read_inline_or_file(&args.template)?;
    let data = read_data(args.data.as_deref())?;

    println!("{}", TemplateEngine::new().render(&template, &data));
    Ok(())
}

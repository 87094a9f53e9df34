//! Implementation of the `mediatask pipes` command.

use crate::error::Result;
use crate::template::PipeRegistry;

/// Print every built-in pipe with a one-line description.
pub fn cmd_pipes() -> Result<()> {
    let registry = PipeRegistry::builtin();
    for name in registry.names() {
        println!("{:<16} {}", name, describe(name));
    }
    Ok(())
}

fn describe(name: &str) -> &'static str {
    match name {
        "split-by-spaces" => "text -> list of whitespace-separated words",
        "snakecase" => "list -> items joined with '_'",
        "kebabcase" => "list -> items joined with '-'",
        "join-by-spaces" => "list -> items joined with ' '",
        "camelcase" => "list -> firstSecondThird",
        "titlecase" => "list -> First Second Third",
        "lowercase" => "text or each list item -> lowercase",
        "uppercase" => "text or each list item -> uppercase",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_pipe_is_described() {
        for name in PipeRegistry::builtin().names() {
            assert!(!describe(name).is_empty(), "no description for {}", name);
        }
    }
}

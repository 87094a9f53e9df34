//! External actions: model invocation and post-processing.
//!
//! The runner never spawns processes itself; it calls an [`ActionRunner`].
//! [`CommandActionRunner`] runs the commands configured under `models` and
//! `post_processors` with a timeout and captures their output.

use crate::config::{CommandSpec, Config};
use crate::error::{MediaTaskError, Result};
use crate::template::TemplateEngine;
use crate::value::set_path;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Everything an action needs to run.
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    /// Configured model or post-processor name.
    pub name: &'a str,
    /// Task inputs, already rendered against the context.
    pub inputs: &'a BTreeMap<String, String>,
    /// Current working context.
    pub context: &'a Value,
}

/// Performs side-effecting actions on behalf of the pipeline.
///
/// Returned values are stored at the task's `target`, when it has one.
pub trait ActionRunner {
    fn invoke_model(&self, request: &ActionRequest<'_>) -> Result<Value>;
    fn post_process(&self, request: &ActionRequest<'_>) -> Result<Value>;
}

impl<T: ActionRunner + ?Sized> ActionRunner for &T {
    fn invoke_model(&self, request: &ActionRequest<'_>) -> Result<Value> {
        (**self).invoke_model(request)
    }

    fn post_process(&self, request: &ActionRequest<'_>) -> Result<Value> {
        (**self).post_process(request)
    }
}

/// Runs configured commands as child processes.
///
/// The command template is rendered with the task inputs available under
/// `inputs`, split with shell-words rules, and executed without a shell.
/// Stdout is parsed as JSON when possible, otherwise kept as trimmed text.
///
/// Output goes to anonymous temp files rather than pipes, so processes the
/// command leaves behind after a timeout cannot keep the runner waiting.
#[derive(Debug, Clone)]
pub struct CommandActionRunner<'a> {
    config: &'a Config,
    engine: TemplateEngine,
}

impl<'a> CommandActionRunner<'a> {
    pub fn new(config: &'a Config, engine: TemplateEngine) -> Self {
        Self { config, engine }
    }

    fn run(&self, kind: &str, spec: &CommandSpec, request: &ActionRequest<'_>) -> Result<Value> {
        let name = request.name;

        let mut scope = request.context.clone();
        let inputs = serde_json::to_value(request.inputs).unwrap_or(Value::Null);
        if !set_path(&mut scope, "inputs", inputs) {
            tracing::warn!(%kind, %name, "context is not an object; inputs are not available");
        }
        let command_str = self.engine.render(&spec.command, &scope);

        let args = shell_words::split(&command_str).map_err(|e| {
            MediaTaskError::ActionFailed(format!(
                "failed to parse {} '{}' command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                kind, name, command_str, e
            ))
        })?;
        let Some((program, args)) = args.split_first() else {
            return Err(MediaTaskError::ActionFailed(format!(
                "{} '{}' command is empty after rendering: '{}'",
                kind, name, spec.command
            )));
        };

        tracing::debug!(%kind, %name, command = %command_str, "running command");

        let capture_failed = |e: std::io::Error| {
            MediaTaskError::ActionFailed(format!(
                "failed to capture {} '{}' output: {}",
                kind, name, e
            ))
        };
        let mut stdout = tempfile::tempfile().map_err(capture_failed)?;
        let mut stderr = tempfile::tempfile().map_err(capture_failed)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&spec.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone().map_err(capture_failed)?))
            .stderr(Stdio::from(stderr.try_clone().map_err(capture_failed)?));

        let start_time = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            MediaTaskError::ActionFailed(format!(
                "failed to execute {} '{}' command '{}': {}\n\
                 Fix: ensure the command is installed and in PATH.",
                kind, name, program, e
            ))
        })?;

        let timeout = Duration::from_secs(spec.timeout_seconds);
        let (exit_code, timed_out) = wait_with_timeout(&mut child, timeout)?;
        let stdout = read_captured(&mut stdout).map_err(capture_failed)?;
        let stderr = read_captured(&mut stderr).map_err(capture_failed)?;

        tracing::debug!(
            %kind,
            %name,
            ?exit_code,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "command finished"
        );

        if timed_out {
            return Err(MediaTaskError::ActionFailed(format!(
                "{} '{}' timed out after {}s",
                kind, name, spec.timeout_seconds
            )));
        }
        if exit_code != Some(0) {
            let status = exit_code
                .map(|c| format!("exit code {}", c))
                .unwrap_or_else(|| "a signal".to_string());
            let detail = stderr.trim();
            return Err(MediaTaskError::ActionFailed(if detail.is_empty() {
                format!("{} '{}' exited with {}", kind, name, status)
            } else {
                format!("{} '{}' exited with {}: {}", kind, name, status, detail)
            }));
        }

        Ok(parse_output(&stdout))
    }
}

impl ActionRunner for CommandActionRunner<'_> {
    fn invoke_model(&self, request: &ActionRequest<'_>) -> Result<Value> {
        let spec = self.config.models.get(request.name).ok_or_else(|| {
            MediaTaskError::ActionFailed(format!("unknown model '{}'", request.name))
        })?;
        self.run("model", spec, request)
    }

    fn post_process(&self, request: &ActionRequest<'_>) -> Result<Value> {
        let spec = self.config.post_processors.get(request.name).ok_or_else(|| {
            MediaTaskError::ActionFailed(format!("unknown post-processor '{}'", request.name))
        })?;
        self.run("post-processor", spec, request)
    }
}

/// Stdout as JSON when it parses, else trimmed text. Empty output is `null`.
fn parse_output(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

/// Everything written to a capture file so far.
fn read_captured(file: &mut File) -> std::io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Wait for a child process with timeout.
///
/// Returns (exit_code, timed_out).
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(50);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok((status.code(), false));
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process(child);
                    return Ok((None, true));
                }
                thread::sleep(poll_interval);
            }
            Err(e) => {
                return Err(MediaTaskError::ActionFailed(format!(
                    "failed to check process status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill a process and wait for it to terminate.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with(command: &str, timeout_seconds: u64) -> Config {
        let mut config = Config::default();
        let spec = CommandSpec {
            command: command.to_string(),
            timeout_seconds,
            ..CommandSpec::default()
        };
        config.models.insert("m".to_string(), spec.clone());
        config.post_processors.insert("p".to_string(), spec);
        config
    }

    fn request<'a>(
        name: &'a str,
        inputs: &'a BTreeMap<String, String>,
        context: &'a Value,
    ) -> ActionRequest<'a> {
        ActionRequest {
            name,
            inputs,
            context,
        }
    }

    #[test]
    fn test_command_output_as_text() {
        let config = config_with("echo {{title}} {{inputs.suffix}}", 10);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::from([("suffix".to_string(), "done".to_string())]);
        let context = json!({"title": "hello"});

        let value = runner
            .invoke_model(&request("m", &inputs, &context))
            .unwrap();
        assert_eq!(value, json!("hello done"));
    }

    #[test]
    fn test_command_output_as_json() {
        let config = config_with(r#"echo '{"width": 1024, "tags": ["a"]}'"#, 10);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let value = runner
            .post_process(&request("p", &inputs, &json!({})))
            .unwrap();
        assert_eq!(value, json!({"width": 1024, "tags": ["a"]}));
    }

    #[test]
    fn test_command_empty_output_is_null() {
        let config = config_with("true", 10);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let value = runner
            .invoke_model(&request("m", &inputs, &json!({})))
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_command_environment_is_passed() {
        let mut config = config_with("sh -c 'echo $MEDIA_MODE'", 10);
        config
            .models
            .get_mut("m")
            .unwrap()
            .environment
            .insert("MEDIA_MODE".to_string(), "fast".to_string());
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let value = runner
            .invoke_model(&request("m", &inputs, &json!({})))
            .unwrap();
        assert_eq!(value, json!("fast"));
    }

    #[test]
    fn test_command_nonzero_exit() {
        let config = config_with("sh -c 'echo broken >&2; exit 3'", 10);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let err = runner
            .invoke_model(&request("m", &inputs, &json!({})))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("model 'm' exited with exit code 3"));
        assert!(msg.contains("broken"));
    }

    #[test]
    fn test_command_timeout() {
        let config = config_with("sleep 10", 1);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let err = runner
            .post_process(&request("p", &inputs, &json!({})))
            .unwrap_err();
        assert!(err.to_string().contains("timed out after 1s"));
    }

    #[test]
    fn test_command_timeout_ignores_leftover_children() {
        // `sh` forks `sleep`, which outlives the killed shell.
        let config = config_with("sh -c 'sleep 6; echo late'", 1);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let start = Instant::now();
        let err = runner
            .invoke_model(&request("m", &inputs, &json!({})))
            .unwrap_err();
        assert!(err.to_string().contains("timed out after 1s"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_command_captures_large_output() {
        let config = config_with("sh -c 'seq 1 20000'", 10);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let value = runner
            .post_process(&request("p", &inputs, &json!({})))
            .unwrap();
        let text = value.as_str().unwrap();
        assert!(text.starts_with("1\n2\n"));
        assert!(text.ends_with("20000"));
    }

    #[test]
    fn test_command_not_found() {
        let config = config_with("definitely-not-a-real-binary-xyz", 10);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let err = runner
            .invoke_model(&request("m", &inputs, &json!({})))
            .unwrap_err();
        assert!(err.to_string().contains("ensure the command is installed"));
    }

    #[test]
    fn test_command_renders_empty() {
        let config = config_with("{{missing}}", 10);
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let err = runner
            .invoke_model(&request("m", &inputs, &json!({})))
            .unwrap_err();
        assert!(err.to_string().contains("empty after rendering"));
    }

    #[test]
    fn test_unknown_model() {
        let config = Config::default();
        let runner = CommandActionRunner::new(&config, TemplateEngine::new());
        let inputs = BTreeMap::new();

        let err = runner
            .invoke_model(&request("ghost", &inputs, &json!({})))
            .unwrap_err();
        assert!(err.to_string().contains("unknown model 'ghost'"));
    }

    #[test]
    fn test_parse_output() {
        assert_eq!(parse_output("  42\n"), json!(42));
        assert_eq!(parse_output("a caption\n"), json!("a caption"));
        assert_eq!(parse_output("\n"), Value::Null);
    }
}

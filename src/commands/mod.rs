mod pipeline;
mod settings;

use async_trait::async_trait;
use clap::Parser;
use indexmap::IndexMap;

use crate::api::GoCdApi;
use crate::error::{GoCdError, Result};
use crate::pipeline::AlertResult;
use crate::settings::{Settings, SettingsSource};

/// What a command wants printed and the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: Option<String>,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: Some(output.into()),
            exit_code,
        }
    }

    pub fn silent(exit_code: i32) -> Self {
        Self {
            output: None,
            exit_code,
        }
    }
}

impl From<AlertResult> for CommandOutput {
    fn from(result: AlertResult) -> Self {
        Self::new(result.to_string(), result.exit_code())
    }
}

/// Everything a command may need while running.
pub struct CommandContext<'a> {
    api: Option<&'a dyn GoCdApi>,
    settings: &'a SettingsSource,
    now_ms: i64,
}

impl<'a> CommandContext<'a> {
    pub fn new(api: Option<&'a dyn GoCdApi>, settings: &'a SettingsSource, now_ms: i64) -> Self {
        Self {
            api,
            settings,
            now_ms,
        }
    }

    /// The server API, failing when no server is configured.
    pub fn api(&self) -> Result<&'a dyn GoCdApi> {
        self.api.ok_or_else(|| {
            GoCdError::Config(
                "no GoCD server configured, set GOCD_SERVER or `server` in the [gocd] section"
                    .to_string(),
            )
        })
    }

    pub fn settings(&self, section: &str) -> Result<Settings> {
        self.settings.section(section)
    }

    /// Epoch milliseconds the invocation started at.
    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput>;
}

type Constructor = fn(&str, &[String]) -> Result<Box<dyn Command>>;

pub struct CommandEntry {
    pub summary: &'static str,
    build: Constructor,
}

/// Maps `"<command> <subcommand>"` names to their constructors.
#[derive(Default)]
pub struct Registry {
    entries: IndexMap<&'static str, CommandEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands shipped with the CLI.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        pipeline::register(&mut registry);
        settings::register(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &'static str, summary: &'static str, build: Constructor) {
        self.entries.insert(name, CommandEntry { summary, build });
    }

    /// Builds the command `command subcommand`, parsing `args` with its own parser.
    ///
    /// # Errors
    ///
    /// `UnknownCommand` when nothing is registered under that name, otherwise
    /// whatever the command's constructor rejects.
    pub fn build(&self, command: &str, subcommand: &str, args: &[String]) -> Result<Box<dyn Command>> {
        let name = format!("{command} {subcommand}");
        let entry = self
            .entries
            .get(name.as_str())
            .ok_or_else(|| GoCdError::UnknownCommand(name.clone()))?;

        (entry.build)(&name, args)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().map(|(name, entry)| (*name, entry.summary))
    }
}

pub(crate) fn boxed<C: Command + 'static>(command: C) -> Box<dyn Command> {
    Box::new(command)
}

/// Parses a command's own arguments, naming it in usage and error output.
pub(crate) fn parse_args<T: Parser>(name: &str, args: &[String]) -> Result<T> {
    let bin_name = format!("gocd {name}");
    Ok(T::try_parse_from(
        std::iter::once(bin_name).chain(args.iter().cloned()),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_builtin_registry_lists_commands_in_order() {
        let registry = Registry::builtin();
        let names: Vec<_> = registry.iter().map(|(name, _)| name).collect();

        assert_eq!(names.first(), Some(&"pipeline trigger"));
        for expected in [
            "pipeline check",
            "pipeline monitor",
            "pipeline check-all",
            "pipeline retrigger-failed",
            "settings encrypt",
            "settings decrypt",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_unknown_command_is_reported() {
        let result = Registry::builtin().build("pipeline", "explode", &[]);

        match result {
            Err(GoCdError::UnknownCommand(name)) => assert_eq!(name, "pipeline explode"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_invalid_arguments_are_usage_errors() {
        let result = Registry::builtin().build("pipeline", "check", &args(&["--bogus"]));

        assert!(matches!(result, Err(GoCdError::Usage(_))));
    }

    #[test]
    fn test_build_known_command() {
        assert!(Registry::builtin()
            .build("pipeline", "check", &args(&["Deploy", "--ran-after", "14:00"]))
            .is_ok());
    }

    #[test]
    fn test_context_without_server_fails_on_api_access() {
        let source = SettingsSource::default();
        let ctx = CommandContext::new(None, &source, 0);

        assert!(matches!(ctx.api(), Err(GoCdError::Config(_))));
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{debug, info};

use crate::api::{GoCdApi, GoCdClient};
use crate::auth::Credentials;
use crate::commands::{CommandContext, Registry};
use crate::config::ConfigFile;
use crate::error::GoCdError;
use crate::output;
use crate::settings::SettingsSource;

const SECTION: &str = "gocd";

#[derive(Parser, Debug)]
#[command(name = "gocd")]
#[command(author, version, about = "Drive and monitor GoCD pipelines", long_about = None)]
pub struct Cli {
    /// Settings file, defaults to ~/.gocd/gocd-cli.toml or /etc/go/gocd-cli.toml
    #[arg(short, long, env = "GOCD_CONFIG")]
    config: Option<PathBuf>,

    /// GoCD server URL, e.g. http://localhost:8153
    #[arg(short, long)]
    server: Option<String>,

    #[arg(short, long)]
    user: Option<String>,

    #[arg(short, long)]
    password: Option<String>,

    /// Command group, e.g. `pipeline`
    command: Option<String>,

    /// Command within the group, e.g. `check`
    subcommand: Option<String>,

    /// Arguments for the command, see `gocd <command> <subcommand> --help`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    fn settings_source(&self) -> Result<SettingsSource> {
        let file = ConfigFile::load(self.config.as_deref())?;
        let mut source = SettingsSource::new(file);

        for (key, value) in [
            ("server", &self.server),
            ("user", &self.user),
            ("password", &self.password),
        ] {
            if let Some(value) = value {
                source = source.with_override(SECTION, key, value.as_str());
            }
        }

        Ok(source)
    }

    /// Client for the configured server, `None` when no server is set.
    fn client(source: &SettingsSource) -> Result<Option<GoCdClient>> {
        let settings = source.section(SECTION)?;
        let Some(server) = settings.get("server") else {
            debug!("No GoCD server configured");
            return Ok(None);
        };

        let credentials = Credentials::from_parts(settings.get("user"), settings.get("password"));
        info!("Using GoCD server {server}");

        Ok(Some(GoCdClient::new(&server, credentials)?))
    }

    /// Runs the requested command and returns the process exit code.
    pub async fn execute(&self) -> Result<i32> {
        let registry = Registry::builtin();

        let (Some(command), Some(subcommand)) = (self.command.as_deref(), self.subcommand.as_deref())
        else {
            output::print_commands(&registry);
            return Ok(if self.command.is_some() { 2 } else { 0 });
        };

        let runnable = match registry.build(command, subcommand, &self.args) {
            Err(GoCdError::Usage(e)) => e.exit(),
            other => other?,
        };

        let source = self.settings_source()?;
        let client = Self::client(&source)?;
        let api = client.as_ref().map(|client| client as &dyn GoCdApi);
        let ctx = CommandContext::new(api, &source, Utc::now().timestamp_millis());

        let result = runnable
            .run(&ctx)
            .await
            .with_context(|| format!("`{command} {subcommand}` failed"))?;

        if let Some(text) = &result.output {
            println!("{text}");
        }

        Ok(result.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_arguments_are_passed_through() {
        let cli = Cli::try_parse_from([
            "gocd",
            "--server",
            "http://go:8153",
            "pipeline",
            "check",
            "Deploy",
            "--ran-after",
            "14:00",
        ])
        .unwrap();

        assert_eq!(cli.command.as_deref(), Some("pipeline"));
        assert_eq!(cli.subcommand.as_deref(), Some("check"));
        assert_eq!(cli.args, vec!["Deploy", "--ran-after", "14:00"]);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["gocd", "--config", "/nonexistent/gocd-cli.toml"]).unwrap();

        assert!(cli.settings_source().is_err());
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from(["gocd", "--config", "/dev/null", "--user", "ba"]).unwrap();
        let settings = cli.settings_source().unwrap().section(SECTION).unwrap();

        assert_eq!(settings.get("user").as_deref(), Some("ba"));
    }

    #[test]
    fn test_client_built_from_settings() {
        let source = SettingsSource::default()
            .with_override(SECTION, "server", "http://go:8153")
            .with_override(SECTION, "user", "ba");

        assert!(Cli::client(&source).unwrap().is_some());
    }
}

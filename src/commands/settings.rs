use async_trait::async_trait;
use clap::Parser;

use super::{boxed, parse_args, Command, CommandContext, CommandOutput, Registry};
use crate::encryption::{cipher_by_name, Cipher, DEFAULT_CIPHER};
use crate::error::{GoCdError, Result};
use crate::settings::Settings;

const SECTION: &str = "gocd";

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        "settings encrypt",
        "Encrypts a value for use in the settings file",
        |name: &str, args: &[String]| {
            Ok(boxed(Encrypt::try_from(parse_args::<CipherArgs>(name, args)?)?))
        },
    );
    registry.register(
        "settings decrypt",
        "Decrypts a value from the settings file",
        |name: &str, args: &[String]| {
            Ok(boxed(Decrypt::try_from(parse_args::<CipherArgs>(name, args)?)?))
        },
    );
}

#[derive(Parser, Debug)]
pub struct CipherArgs {
    /// Value to transform
    #[arg(long, visible_aliases = ["plaintext", "ciphertext"])]
    value: Option<String>,
    /// Transform the current value of this setting instead
    #[arg(long)]
    key: Option<String>,
}

/// Either a literal value or the name of a setting holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Value(String),
    Key(String),
}

impl TryFrom<CipherArgs> for Input {
    type Error = GoCdError;

    fn try_from(args: CipherArgs) -> Result<Self> {
        match (args.value, args.key) {
            (Some(value), None) => Ok(Self::Value(value)),
            (None, Some(key)) => Ok(Self::Key(key)),
            _ => Err(GoCdError::AssertionViolation(
                "Needs exactly one of a value or \"key\"".to_string(),
            )),
        }
    }
}

impl Input {
    fn read(&self, settings: &Settings) -> Result<String> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Key(key) => settings
                .get(key)
                .ok_or_else(|| GoCdError::Config(format!("No setting named \"{key}\""))),
        }
    }

    /// Setting name the result should be stored under.
    fn key(&self) -> Option<&str> {
        match self {
            Self::Value(_) => None,
            Self::Key(key) => Some(key.trim_end_matches("_encrypted")),
        }
    }
}

/// Runs `transform` with the configured cipher, or the default one.
fn with_cipher(settings: &Settings, transform: impl FnOnce(&dyn Cipher) -> String) -> Result<(String, String)> {
    match settings.cipher() {
        Some(cipher) => Ok((cipher.name().to_string(), transform(cipher))),
        None => {
            let cipher = cipher_by_name(DEFAULT_CIPHER)?;
            Ok((cipher.name().to_string(), transform(cipher.as_ref())))
        }
    }
}

fn render(module: &str, label: &str, value: &str) -> CommandOutput {
    CommandOutput::new(format!("encryption_module = {module}\n{label} = {value}"), 0)
}

#[derive(Debug)]
pub struct Encrypt {
    input: Input,
}

impl TryFrom<CipherArgs> for Encrypt {
    type Error = GoCdError;

    fn try_from(args: CipherArgs) -> Result<Self> {
        Ok(Self {
            input: Input::try_from(args)?,
        })
    }
}

#[async_trait]
impl Command for Encrypt {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let settings = ctx.settings(SECTION)?;
        let plaintext = self.input.read(&settings)?;
        let (module, ciphertext) = with_cipher(&settings, |cipher| cipher.encrypt(&plaintext))?;
        let label = self
            .input
            .key()
            .map_or_else(|| "Ciphertext".to_string(), |key| format!("{key}_encrypted"));

        Ok(render(&module, &label, &ciphertext))
    }
}

#[derive(Debug)]
pub struct Decrypt {
    input: Input,
}

impl TryFrom<CipherArgs> for Decrypt {
    type Error = GoCdError;

    fn try_from(args: CipherArgs) -> Result<Self> {
        Ok(Self {
            input: Input::try_from(args)?,
        })
    }
}

#[async_trait]
impl Command for Decrypt {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let settings = ctx.settings(SECTION)?;
        let ciphertext = match &self.input {
            // `get` would hand back the already decrypted value
            Input::Key(key) => settings
                .get(&format!("{}_encrypted", key.trim_end_matches("_encrypted")))
                .ok_or_else(|| GoCdError::Config(format!("No setting named \"{key}\"")))?,
            Input::Value(_) => self.input.read(&settings)?,
        };
        let (module, plaintext) = with_cipher(&settings, |cipher| cipher.decrypt(&ciphertext))?;
        let label = self.input.key().unwrap_or("Plaintext");

        Ok(render(&module, label, &plaintext))
    }
}

use std::fmt::Display;

use console::{style, StyledObject};

pub fn title(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn heading(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().underlined()
}

pub fn command_name(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

/// Run still in progress
pub fn pending(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn passed(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn failed(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub const HELP_TEXT: &str = "Commands: /help, /clear (start a new session), /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    Quit,
    Unknown(String),
}

/// Parses a line as a slash command; `None` means the line is a question.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    let command = trimmed.split_whitespace().next()?;
    if !command.starts_with('/') {
        return None;
    }

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/clear" => SlashCommand::Clear,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

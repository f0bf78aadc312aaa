// Command parsing. Accepts "/status", "/status@SomeBot" and bare "status".

use crate::settings::MAX_HISTORY_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Arbitrage,
    AccountStatus,
    History { limit: Option<usize> },
    StartLoop,
    StopLoop,
    Unknown(String),
}

impl Command {
    /// `None` for blank input.
    pub fn parse(input: &str) -> Option<Command> {
        let mut words = input.split_whitespace();
        let head = words.next()?;
        let name = head.trim_start_matches('/');
        // Telegram appends the bot name in group chats
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        let arg = words.next();

        let cmd = match name.as_str() {
            "help" | "h" | "start" => Command::Help,
            "status" => Command::Status,
            "arbitrage" | "arb" => Command::Arbitrage,
            "account_status" | "account" => Command::AccountStatus,
            "history" => match arg.map(str::parse::<usize>) {
                None => Command::History { limit: None },
                Some(Ok(n)) if n > 0 => Command::History { limit: Some(n.min(MAX_HISTORY_LEN)) },
                Some(_) => Command::Unknown(input.trim().to_string()),
            },
            "start_loop" => Command::StartLoop,
            "stop_loop" => Command::StopLoop,
            _ => Command::Unknown(head.to_string()),
        };
        Some(cmd)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Status => "status",
            Command::Arbitrage => "arbitrage",
            Command::AccountStatus => "account_status",
            Command::History { .. } => "history",
            Command::StartLoop => "start_loop",
            Command::StopLoop => "stop_loop",
            Command::Unknown(_) => "unknown",
        }
    }
}

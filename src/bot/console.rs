use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::commands::Command;
use super::context::BotContext;
use super::format;

/// Interactive command loop on stdin/stdout. Returns on EOF or `quit`.
pub async fn run_console(ctx: Arc<BotContext>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();

    out.write_all(format!("{}\n", format::strip_tags(&format::help_text())).as_bytes()).await?;
    out.write_all(b"  quit, q                  - exit\n").await?;

    loop {
        out.write_all(b"\nARBX> ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else { break };
        let input = line.trim();
        match input.to_lowercase().as_str() {
            "quit" | "q" | "exit" => {
                out.write_all(b"Goodbye!\n").await?;
                break;
            }
            _ => {}
        }

        let Some(command) = Command::parse(input) else { continue };
        let reply = ctx.handle(command).await;
        out.write_all(format!("{}\n", format::strip_tags(&reply)).as_bytes()).await?;
    }

    ctx.shutdown().await;
    Ok(())
}

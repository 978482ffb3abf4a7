pub mod commands;
pub mod database;
pub mod handler;
pub mod leaderboard;
pub mod tracker;

use commands::*;
use poise::command;

/// 🎧 Voice channel activity leaderboard
#[command(
    slash_command,
    subcommands("leaderboard", "pages", "rank", "reset", "set_time")
)]
pub async fn voice(_ctx: crate::Context<'_>) -> Result<(), crate::Error> {
    Ok(())
}

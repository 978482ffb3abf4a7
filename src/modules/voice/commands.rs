use super::leaderboard::{build_embed, build_pages, parse_color, LeaderboardOptions, DEFAULT_PAGE_SIZE};
use crate::{utils::format_duration, Context, Error};
use poise::serenity_prelude::{
    ButtonStyle, CreateActionRow, CreateButton, CreateInteractionResponse,
    CreateInteractionResponseMessage, User,
};
use poise::{command, CreateReply};
use std::time::Duration;

fn guild_name(ctx: &Context<'_>) -> String {
    ctx.guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string())
}

fn options_from(
    title: Option<String>,
    color: Option<String>,
    thumbnail: Option<String>,
) -> Result<LeaderboardOptions, String> {
    let color = match color {
        Some(raw) => Some(parse_color(&raw).ok_or_else(|| {
            format!("❌ `{}` is not a hex color. Try something like `#5865f2`.", raw)
        })?),
        None => None,
    };

    Ok(LeaderboardOptions {
        title,
        color,
        thumbnail,
        ..Default::default()
    })
}

/// Show the members who spent the most time in voice
#[command(slash_command, guild_only)]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "How many members to show (default 10)"]
    #[min = 1]
    #[max = 50]
    top: Option<u8>,
    #[description = "Custom title"] title: Option<String>,
    #[description = "Embed color as hex, e.g. #5865f2"] color: Option<String>,
    #[description = "Thumbnail image URL"] thumbnail: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let mut options = match options_from(title, color, thumbnail) {
        Ok(options) => options,
        Err(msg) => {
            ctx.say(msg).await?;
            return Ok(());
        }
    };
    if let Some(top) = top {
        options.top = top as usize;
    }

    let entries = ctx.data().tracker.leaderboard(guild_id.get()).await;
    let embed = build_embed(&guild_name(&ctx), &entries, &options);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Browse the full voice leaderboard page by page
#[command(slash_command, guild_only)]
pub async fn pages(
    ctx: Context<'_>,
    #[description = "Members per page (default 10)"]
    #[min = 1]
    #[max = 25]
    per_page: Option<u8>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let page_size = per_page.map_or(DEFAULT_PAGE_SIZE, usize::from);

    let entries = ctx.data().tracker.leaderboard(guild_id.get()).await;
    let options = LeaderboardOptions::default();
    let pages = build_pages(&guild_name(&ctx), &entries, page_size, &options);

    if pages.len() == 1 {
        ctx.send(CreateReply::default().embed(pages[0].clone()))
            .await?;
        return Ok(());
    }

    let buttons = |page: usize| {
        vec![CreateActionRow::Buttons(vec![
            CreateButton::new("prev_page")
                .emoji('◀')
                .style(ButtonStyle::Secondary)
                .disabled(page == 0),
            CreateButton::new("next_page")
                .emoji('▶')
                .style(ButtonStyle::Secondary)
                .disabled(page + 1 >= pages.len()),
        ])]
    };

    let mut current_page = 0;
    let reply = ctx
        .send(
            CreateReply::default()
                .embed(pages[current_page].clone())
                .components(buttons(current_page)),
        )
        .await?;
    let message = reply.message().await?.into_owned();

    while let Some(interaction) = message
        .await_component_interaction(ctx)
        .author_id(ctx.author().id)
        .timeout(Duration::from_secs(120))
        .await
    {
        match interaction.data.custom_id.as_str() {
            "prev_page" => current_page = current_page.saturating_sub(1),
            "next_page" => current_page = (current_page + 1).min(pages.len() - 1),
            _ => continue,
        }

        interaction
            .create_response(
                &ctx.serenity_context().http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .embed(pages[current_page].clone())
                        .components(buttons(current_page)),
                ),
            )
            .await?;
    }

    reply
        .edit(
            ctx,
            CreateReply::default()
                .embed(pages[current_page].clone())
                .components(Vec::new()),
        )
        .await?;
    Ok(())
}

/// Check how long someone has spent in voice
#[command(slash_command, guild_only)]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "Member to look up (defaults to you)"] user: Option<User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let user_id = user.as_ref().unwrap_or_else(|| ctx.author()).id;

    match ctx.data().tracker.user_data(guild_id.get(), user_id.get()).await {
        Some(data) => {
            ctx.say(format!(
                "🎧 <@{}> is **#{}** with **{}** in voice.",
                user_id,
                data.position,
                format_duration(data.total.time, true)
            ))
            .await?;
        }
        None => {
            ctx.say(format!("🔇 <@{}> hasn't spent any time in voice yet.", user_id))
                .await?;
        }
    }

    Ok(())
}

/// Wipe every voice timer and total for this server
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn reset(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let summary = ctx.data().tracker.reset(guild_id.get()).await?;

    ctx.say(format!(
        "🧹 Voice data reset! Removed {} totals and {} open sessions.",
        summary.totals, summary.timers
    ))
    .await?;
    Ok(())
}

/// Overwrite a member's total voice time
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set_time(
    ctx: Context<'_>,
    #[description = "Member to update"] user: User,
    #[description = "New total in minutes"] minutes: u64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let time = Duration::from_secs(minutes.saturating_mul(60));

    let updated = ctx
        .data()
        .tracker
        .set_time(guild_id.get(), user.id.get(), time)
        .await?;

    if updated {
        ctx.say(format!(
            "✅ Set <@{}>'s voice time to **{}**.",
            user.id,
            format_duration(time, true)
        ))
        .await?;
    } else {
        ctx.say(format!(
            "❌ <@{}> has no voice time recorded yet, nothing to change.",
            user.id
        ))
        .await?;
    }

    Ok(())
}

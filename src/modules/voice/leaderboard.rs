use super::database::VoiceTotal;
use crate::{default_struct, utils::format_duration};
use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter};

pub const DEFAULT_PAGE_SIZE: usize = 10;

default_struct! {
#[derive(Debug, Clone)]
pub struct LeaderboardOptions {
    pub title: Option<String>,
    /// Random when unset.
    pub color: Option<Colour>,
    pub top: usize = 10,
    pub thumbnail: Option<String>,
}
}

/// Accepts `#rrggbb`, `rrggbb` or `0xrrggbb`.
pub fn parse_color(input: &str) -> Option<Colour> {
    let hex = input.trim();
    let hex = hex
        .strip_prefix('#')
        .or_else(|| hex.strip_prefix("0x"))
        .unwrap_or(hex);

    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().map(Colour::new)
}

fn random_color() -> Colour {
    Colour::new(fastrand::u32(..=0xFF_FF_FF))
}

pub fn describe(entries: &[VoiceTotal], first_rank: usize) -> String {
    if entries.is_empty() {
        return "Nobody has spent time in voice yet.".to_string();
    }

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            format!(
                "`{}` <@{}> ({})",
                first_rank + idx,
                entry.user_id,
                format_duration(entry.time, false)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn base_embed(guild_name: &str, options: &LeaderboardOptions) -> CreateEmbed {
    let title = options
        .title
        .clone()
        .unwrap_or_else(|| format!("Leaderboard in **{}**", guild_name));

    let mut embed = CreateEmbed::new()
        .title(title)
        .colour(options.color.unwrap_or_else(random_color));

    if let Some(thumbnail) = &options.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

pub fn top_entries(entries: &[VoiceTotal], top: usize) -> &[VoiceTotal] {
    &entries[..top.min(entries.len())]
}

pub fn build_embed(guild_name: &str, entries: &[VoiceTotal], options: &LeaderboardOptions) -> CreateEmbed {
    let top = top_entries(entries, options.top);
    base_embed(guild_name, options).description(describe(top, 1))
}

pub fn chunk_pages<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// One embed per page; ranks continue across pages. Always yields at least
/// one page so an empty board still renders.
pub fn build_pages(
    guild_name: &str,
    entries: &[VoiceTotal],
    page_size: usize,
    options: &LeaderboardOptions,
) -> Vec<CreateEmbed> {
    let page_size = page_size.max(1);
    let mut pages = chunk_pages(entries, page_size);
    if pages.is_empty() {
        pages.push(Vec::new());
    }

    let count = pages.len();
    pages
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            base_embed(guild_name, options)
                .description(describe(page, idx * page_size + 1))
                .footer(CreateEmbedFooter::new(format!("Page {}/{}", idx + 1, count)))
        })
        .collect()
}

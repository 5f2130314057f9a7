use super::{reply, Data, Error, SlashCommand};
use crate::core::commands::{CommandDefinition, CommandOption, OptionKind};
use crate::core::stats::UserStats;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;

pub fn definition() -> CommandDefinition {
    CommandDefinition::new(
        "stats",
        "View your statistics or another user's statistics",
    )
    .option(CommandOption::new(
        OptionKind::User,
        "user",
        "The user to view stats for (optional)",
    ))
}

pub struct Stats;

#[async_trait]
impl SlashCommand for Stats {
    async fn run(
        &self,
        ctx: &serenity::Context,
        interaction: &serenity::CommandInteraction,
        data: &Data,
    ) -> Result<(), Error> {
        let Some(guild_id) = interaction.guild_id else {
            return reply(
                ctx,
                interaction,
                "This command can only be used in a server!",
                true,
            )
            .await;
        };

        let target = interaction
            .data
            .options()
            .into_iter()
            .find_map(|option| match option.value {
                serenity::ResolvedValue::User(user, _) if option.name == "user" => {
                    Some(user.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| interaction.user.clone());

        let stats = data
            .stats
            .user_stats(target.id.get(), guild_id.get())
            .await?;
        let is_self = target.id == interaction.user.id;

        let mut embed = serenity::CreateEmbed::new()
            .title(format!("📊 Statistics for {}", target.tag()))
            .color(0xFF9900)
            .thumbnail(target.face())
            .timestamp(serenity::Timestamp::now());
        if is_self {
            embed = embed.description("Your personal statistics");
        }
        for (name, value) in format_stats(&stats) {
            embed = embed.field(name, value, true);
        }

        interaction
            .create_response(
                &ctx.http,
                serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new().embed(embed),
                ),
            )
            .await?;
        Ok(())
    }
}

pub fn format_stats(stats: &UserStats) -> Vec<(&'static str, String)> {
    let last_active = stats
        .last_active
        .map(|at| format!("<t:{}:R>", at.timestamp()))
        .unwrap_or_else(|| "Never".to_string());

    vec![
        ("Commands Used", stats.commands_used.to_string()),
        ("Messages Sent", stats.messages_sent.to_string()),
        ("Last Active", last_active),
    ]
}

use super::{format_uptime, reply, Data, Error, SlashCommand};
use crate::core::commands::CommandDefinition;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::time::Instant;

pub fn definition() -> CommandDefinition {
    CommandDefinition::new("ping", "Check ping")
}

pub struct Ping;

#[async_trait]
impl SlashCommand for Ping {
    async fn run(
        &self,
        ctx: &serenity::Context,
        interaction: &serenity::CommandInteraction,
        data: &Data,
    ) -> Result<(), Error> {
        let sent_at = Instant::now();
        reply(ctx, interaction, "Pong!", false).await?;
        let round_trip = sent_at.elapsed().as_millis();

        let content = format!(
            "Pong!\n🏓 : `{}ms`\n⏱️ : `{}`",
            round_trip,
            format_uptime(data.started_at.elapsed())
        );
        interaction
            .edit_response(
                &ctx.http,
                serenity::EditInteractionResponse::new().content(content),
            )
            .await?;
        Ok(())
    }
}

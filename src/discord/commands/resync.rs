use super::{reply, Data, Error, SlashCommand};
use crate::core::commands::CommandDefinition;
use crate::discord::command_sync::{reload_and_sync, ReloadOutcome};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;

pub fn definition() -> CommandDefinition {
    CommandDefinition::new(
        "resync",
        "Reload command definitions and sync them with Discord",
    )
    .default_member_permissions(serenity::Permissions::MANAGE_GUILD.bits())
}

/// Reloads every command source and runs a sync cycle on demand.
pub struct Resync;

#[async_trait]
impl SlashCommand for Resync {
    async fn run(
        &self,
        ctx: &serenity::Context,
        interaction: &serenity::CommandInteraction,
        data: &Data,
    ) -> Result<(), Error> {
        let allowed = interaction
            .member
            .as_ref()
            .and_then(|member| member.permissions)
            .is_some_and(|permissions| permissions.manage_guild());
        if !allowed {
            return reply(
                ctx,
                interaction,
                "❌ You need the Manage Server permission to resync commands.",
                true,
            )
            .await;
        }

        // A cycle can take a few seconds when the platform is slow.
        interaction.defer_ephemeral(&ctx.http).await?;
        tracing::info!(user_id = interaction.user.id.get(), "Manual command resync requested");
        if data.synchronizer.is_running() {
            tracing::info!("Waiting for the running command sync to finish");
        }

        let content = match reload_and_sync(data).await {
            Ok(outcome) => format_outcome(&outcome),
            Err(err) => {
                tracing::error!("Manual command resync failed: {}", err);
                format!("❌ Command sync failed: {err}")
            }
        };

        interaction
            .edit_response(
                &ctx.http,
                serenity::EditInteractionResponse::new().content(content),
            )
            .await?;
        Ok(())
    }
}

pub fn format_outcome(outcome: &ReloadOutcome) -> String {
    let report = &outcome.report;
    let mut lines = Vec::new();

    if report.remote_calls == 0 {
        lines.push(format!(
            "✅ No command changes detected ({} unchanged).",
            report.unchanged.len()
        ));
    } else {
        lines.push(format!(
            "✅ Sync complete: {} updated, {} removed, {} unchanged.",
            report.upserted.len(),
            report.deleted.len(),
            report.unchanged.len()
        ));
    }

    if !report.unconfirmed.is_empty() {
        lines.push(format!(
            "⚠️ Not confirmed by Discord: {}",
            report.unconfirmed.join(", ")
        ));
    }
    for failed in &report.failed_deletions {
        lines.push(format!(
            "⚠️ Could not remove `{}`: {}",
            failed.name, failed.reason
        ));
    }
    for error in &outcome.load_errors {
        lines.push(format!("⚠️ Skipped: {error}"));
    }

    lines.join("\n")
}

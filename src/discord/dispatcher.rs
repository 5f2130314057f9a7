// Routes slash command interactions to their registered handlers.

use crate::core::commands::CommandRegistry;
use crate::discord::commands::Data;
use poise::serenity_prelude as serenity;

const FAILURE_REPLY: &str = "There was an error while executing this command!";

/// Clones the handler out so no registry lock is held while it runs.
pub fn resolve<H: Clone>(registry: &CommandRegistry<H>, name: &str) -> Option<H> {
    registry.lookup(name).map(|command| command.handler.clone())
}

/// Runs the handler for `interaction`. Returns `false` for unknown commands.
///
/// Handler failures are logged and answered with an ephemeral error message;
/// they never propagate to the event loop.
pub async fn on_command_invoked(
    ctx: &serenity::Context,
    interaction: &serenity::CommandInteraction,
    data: &Data,
) -> bool {
    let name = interaction.data.name.as_str();
    let handler = resolve(&*data.registry.read().await, name);
    let Some(handler) = handler else {
        tracing::warn!(command = name, "No handler registered for command");
        return false;
    };

    if let Some(guild_id) = interaction.guild_id {
        if let Err(e) = data
            .stats
            .record_command(interaction.user.id.get(), guild_id.get())
            .await
        {
            tracing::error!("Failed to record command use: {}", e);
        }
    }

    tracing::debug!(
        command = name,
        user_id = interaction.user.id.get(),
        "Dispatching command"
    );
    if let Err(err) = handler.run(ctx, interaction, data).await {
        tracing::error!(command = name, "Command failed: {}", err);
        send_failure(ctx, interaction).await;
    }
    true
}

/// Tells the user something went wrong, whether or not the handler already
/// acknowledged the interaction.
async fn send_failure(ctx: &serenity::Context, interaction: &serenity::CommandInteraction) {
    let initial = serenity::CreateInteractionResponse::Message(
        serenity::CreateInteractionResponseMessage::new()
            .content(FAILURE_REPLY)
            .ephemeral(true),
    );
    if interaction.create_response(&ctx.http, initial).await.is_ok() {
        return;
    }

    let followup = serenity::CreateInteractionResponseFollowup::new()
        .content(FAILURE_REPLY)
        .ephemeral(true);
    if let Err(e) = interaction.create_followup(&ctx.http, followup).await {
        tracing::warn!("Failed to send error reply: {}", e);
    }
}

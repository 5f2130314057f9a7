use super::{format_uptime, reply, Data, Error, SlashCommand};
use crate::core::commands::{CommandDefinition, CommandOption, OptionKind};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;

const EMBED_COLOR: u32 = 0x0099FF;

pub fn definition() -> CommandDefinition {
    CommandDefinition::new("info", "Get information about the bot or server")
        .option(CommandOption::new(
            OptionKind::SubCommand,
            "bot",
            "Get information about the bot",
        ))
        .option(CommandOption::new(
            OptionKind::SubCommand,
            "server",
            "Get information about the server",
        ))
}

pub struct Info;

#[async_trait]
impl SlashCommand for Info {
    async fn run(
        &self,
        ctx: &serenity::Context,
        interaction: &serenity::CommandInteraction,
        data: &Data,
    ) -> Result<(), Error> {
        let subcommand = interaction.data.options.first().map(|o| o.name.as_str());

        let embed = match subcommand {
            Some("server") => {
                let Some(guild_id) = interaction.guild_id else {
                    return reply(
                        ctx,
                        interaction,
                        "This command can only be used in a server!",
                        true,
                    )
                    .await;
                };
                match server_embed(ctx, guild_id).await {
                    Some(embed) => embed,
                    None => {
                        return reply(ctx, interaction, "Server details are not available yet.", true)
                            .await
                    }
                }
            }
            _ => bot_embed(ctx, data),
        };

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

/// Date markup the client renders in the reader's locale.
fn discord_date(at: serenity::Timestamp) -> String {
    format!("<t:{}:D>", at.unix_timestamp())
}

/// Snapshot of the bot's own state, taken from the cache.
struct BotSummary {
    tag: String,
    created: String,
    servers: usize,
    commands: usize,
    uptime: String,
}

impl BotSummary {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Bot Name", self.tag.clone()),
            ("Created", self.created.clone()),
            ("Servers", self.servers.to_string()),
            ("Commands", self.commands.to_string()),
            ("Uptime", self.uptime.clone()),
        ]
    }
}

fn bot_embed(ctx: &serenity::Context, data: &Data) -> serenity::CreateEmbed {
    let (tag, created, avatar) = {
        let user = ctx.cache.current_user();
        (
            user.tag(),
            discord_date(user.id.created_at()),
            user.avatar_url(),
        )
    };

    // try_read keeps the handler from blocking behind a reload in progress.
    let commands = data
        .registry
        .try_read()
        .map(|registry| registry.len())
        .unwrap_or_default();

    let summary = BotSummary {
        tag,
        created,
        servers: ctx.cache.guild_count(),
        commands,
        uptime: format_uptime(data.started_at.elapsed()),
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("🤖 Bot Information")
        .color(EMBED_COLOR)
        .timestamp(serenity::Timestamp::now());
    for (name, value) in summary.fields() {
        embed = embed.field(name, value, true);
    }
    if let Some(avatar) = avatar {
        embed = embed.thumbnail(avatar);
    }
    embed
}

async fn server_embed(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Option<serenity::CreateEmbed> {
    // The cache guard is not Send, so copy what we need before any await.
    let (name, owner_id, members, channels, roles, tier, icon) = {
        let guild = ctx.cache.guild(guild_id)?;
        (
            guild.name.clone(),
            guild.owner_id,
            guild.member_count,
            guild.channels.len(),
            guild.roles.len(),
            u8::from(guild.premium_tier),
            guild.icon_url(),
        )
    };

    let owner = match owner_id.to_user(ctx).await {
        Ok(user) => user.tag(),
        Err(e) => {
            tracing::debug!(guild_id = guild_id.get(), "Could not fetch guild owner: {}", e);
            format!("<@{}>", owner_id.get())
        }
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📊 {name} Information"))
        .color(EMBED_COLOR)
        .field("Owner", owner, true)
        .field("Created", discord_date(guild_id.created_at()), true)
        .field("Members", members.to_string(), true)
        .field("Channels", channels.to_string(), true)
        .field("Roles", roles.to_string(), true)
        .field("Boost Level", tier.to_string(), true)
        .timestamp(serenity::Timestamp::now());
    if let Some(icon) = icon {
        embed = embed.thumbnail(icon);
    }
    Some(embed)
}

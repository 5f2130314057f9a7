// Static-reply commands declared in the custom command directory.

use super::{reply, CommandHandler, Data, Error, SlashCommand};
use crate::core::commands::{CommandSource, DeclaredCommand, LoadError};
use crate::infra::commands::read_command_dir;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;

pub struct CustomCommands {
    dir: PathBuf,
}

impl CustomCommands {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl CommandSource<CommandHandler> for CustomCommands {
    fn discover(&self) -> Vec<Result<DeclaredCommand<CommandHandler>, LoadError>> {
        read_command_dir(&self.dir)
            .into_iter()
            .map(|file| {
                file.map(|file| DeclaredCommand {
                    origin: file.origin,
                    definition: file.definition,
                    handler: Arc::new(StaticReply {
                        content: file.reply,
                        ephemeral: file.ephemeral,
                    }) as CommandHandler,
                })
            })
            .collect()
    }
}

pub struct StaticReply {
    content: String,
    ephemeral: bool,
}

#[async_trait]
impl SlashCommand for StaticReply {
    async fn run(
        &self,
        ctx: &serenity::Context,
        interaction: &serenity::CommandInteraction,
        _data: &Data,
    ) -> Result<(), Error> {
        reply(ctx, interaction, self.content.as_str(), self.ephemeral).await
    }
}

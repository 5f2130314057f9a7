// Bot presence.
//
// The status is static: set once when the gateway session is ready and never
// changed afterwards.

use poise::serenity_prelude as serenity;

/// The activity shown under the bot's name.
pub fn status_activity() -> serenity::ActivityData {
    serenity::ActivityData::watching("your commands 👀")
}

/// Called once the bot is ready so the presence is announced in one place.
pub fn on_ready(ctx: &serenity::Context) {
    ctx.set_presence(Some(status_activity()), serenity::OnlineStatus::Online);
}

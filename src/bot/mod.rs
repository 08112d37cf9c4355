//! # Bot Module
//!
//! Discord front end for Open Jukebox.
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`]:
//! - `message`: parses prefix commands and replies in the same channel
//! - `voice_state_update`: releases the session when the bot is kicked out of
//!   voice and tracks moves between voice channels
//! - `guild_delete`: drops the session when the bot is removed from a guild
//! - `ready`: logs the connection
//!
//! Asynchronous status lines from the sessions ("Now playing", "Queue is
//! empty.") are delivered by [`forward_announcements`].

use serenity::{
    all::{
        ChannelId, Context, EventHandler, Guild, GuildId, Message, Ready, UnavailableGuild,
        UserId, VoiceState,
    },
    async_trait,
    http::Http,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod debounce;
pub mod handlers;

use crate::{
    audio::{Announcement, SessionRegistry},
    config::Config,
    sources::TrackResolver,
    ui::messages,
};
use commands::Command;
use debounce::CommandDebounce;
use handlers::Invocation;

/// Main Discord event handler.
pub struct JukeboxBot {
    config: Arc<Config>,
    registry: Arc<SessionRegistry>,
    resolver: Arc<dyn TrackResolver>,
    debounce: CommandDebounce,
}

impl JukeboxBot {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SessionRegistry>,
        resolver: Arc<dyn TrackResolver>,
    ) -> Self {
        let debounce = CommandDebounce::new(config.command_cooldown);
        Self {
            config,
            registry,
            resolver,
            debounce,
        }
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
        info!("⌨️ Prefijo de comandos: '{}'", self.config.bot_prefix);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(command) = Command::parse(&self.config.bot_prefix, &msg.content) else {
            return;
        };

        let Some(guild_id) = msg.guild_id else {
            reply(&ctx, msg.channel_id, messages::GUILD_ONLY).await;
            return;
        };

        if !self.debounce.allow(msg.author.id) {
            debug!("⏳ Comando de {} ignorado por cooldown", msg.author.id);
            return;
        }

        let invocation = Invocation {
            guild_id,
            text_channel: msg.channel_id,
            voice_channel: user_voice_channel(&ctx, guild_id, msg.author.id),
            prefix: self.config.bot_prefix.clone(),
        };

        let response =
            handlers::execute(&self.registry, self.resolver.as_ref(), &invocation, command).await;
        reply(&ctx, msg.channel_id, &response).await;
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };
        let Some(session) = self.registry.get(guild_id) else {
            return;
        };

        match new.channel_id {
            // Movido a otro canal por un moderador
            Some(channel) => {
                if let Err(e) = session.channel_moved(channel).await {
                    warn!("⚠️ Error al actualizar canal de guild {}: {}", guild_id, e);
                }
            }
            // Detectar si el bot fue desconectado
            None if old.is_some() => {
                info!("🔌 Bot desconectado en guild {}", guild_id);
                if let Err(e) = session.leave().await {
                    warn!("⚠️ Error al limpiar sesión de guild {}: {}", guild_id, e);
                }
            }
            None => {}
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        // `unavailable` indica una caída de Discord, no una expulsión
        if incomplete.unavailable {
            return;
        }

        if self.registry.remove(incomplete.id).await {
            info!("🚪 Bot expulsado de guild {}, sesión eliminada", incomplete.id);
        }
    }
}

/// Canal de voz en el que está el usuario, según la caché
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

async fn reply(ctx: &Context, channel_id: ChannelId, text: &str) {
    if let Err(e) = channel_id.say(&ctx.http, text).await {
        error!("Error al enviar mensaje al canal {}: {:?}", channel_id, e);
    }
}

/// Publica los anuncios de las sesiones hasta que se cierre el canal
pub async fn forward_announcements(http: Arc<Http>, mut announcements: mpsc::UnboundedReceiver<Announcement>) {
    while let Some(Announcement { channel, text }) = announcements.recv().await {
        if let Err(e) = channel.say(&http, &text).await {
            error!("Error al enviar anuncio al canal {}: {:?}", channel, e);
        }
    }
    debug!("📪 Canal de anuncios cerrado");
}

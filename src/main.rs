use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod sources;
mod ui;

use crate::audio::{voice::SongbirdConnector, SessionRegistry};
use crate::bot::JukeboxBot;
use crate::config::Config;
use crate::sources::{SmartResolver, SpotifyClient, TrackResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    info!("🎵 Iniciando Open Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    // Cliente para la API de Spotify
    let api_http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(concat!("open-jukebox/", env!("CARGO_PKG_VERSION")))
        .build()?;

    // Cliente para los streams de audio (sin timeout total)
    let audio_http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let songbird = Songbird::serenity();
    let (announcements, announcement_inbox) = mpsc::unbounded_channel();

    let connector = Arc::new(SongbirdConnector::new(songbird.clone(), audio_http));
    let registry = Arc::new(SessionRegistry::new(
        connector,
        config.session_options(),
        announcements,
    ));

    let spotify = SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        api_http,
        config.youtube_fallback,
    );
    let resolver: Arc<dyn TrackResolver> = Arc::new(SmartResolver::new(Box::new(spotify)));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = JukeboxBot::new(config.clone(), registry, resolver);

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    tokio::spawn(bot::forward_announcements(
        client.http.clone(),
        announcement_inbox,
    ));

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⚠️ Señal de shutdown recibida, cerrando...");
                shard_manager.shutdown_all().await;
            }
            Err(e) => warn!("No se pudo registrar Ctrl+C: {:?}", e),
        }
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    // yt-dlp resuelve las búsquedas de respaldo en YouTube
    let yt_dlp = async_process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await?;

    if yt_dlp.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}

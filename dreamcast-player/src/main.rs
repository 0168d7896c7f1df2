//! DreamCast Player - command-line entry point
//!
//! Plays one narration file or URL with an optional ambience soundscape,
//! printing player events as JSON lines until the story ends, the preview
//! ceiling is hit, or the process is interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dreamcast_common::events::PlayerEvent;
use dreamcast_common::{AmbienceType, Story};
use dreamcast_player::audio::AudioOutput;
use dreamcast_player::playback::NoopWakeLock;
use dreamcast_player::{
    AudioContext, Clock, NarrationInput, Player, PlayerConfig, PreviewPolicy, SystemClock,
};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for dreamcast-player
#[derive(Parser, Debug)]
#[command(name = "dreamcast-player")]
#[command(about = "Bedtime story narration player with procedural ambience")]
#[command(version)]
struct Args {
    /// Narration audio: file path, file:// URL or http(s) URL
    #[arg(required_unless_present = "list_devices")]
    input: Option<String>,

    /// Background soundscape (rain, fire, waves, forest, silent)
    #[arg(short, long, default_value = "silent")]
    ambience: AmbienceType,

    /// Ambience slider value (0.0-1.0)
    #[arg(long)]
    ambience_volume: Option<f32>,

    /// Voice slider value (0.0-1.5)
    #[arg(long)]
    voice_volume: Option<f32>,

    /// Full-length playback (no preview ceiling)
    #[arg(long, env = "DREAMCAST_PREMIUM")]
    premium: bool,

    /// Pause after this many minutes
    #[arg(long)]
    sleep_minutes: Option<u32>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device name (overrides config)
    #[arg(short, long, env = "DREAMCAST_DEVICE")]
    device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = PlayerConfig::load(args.config.as_deref()).context("Failed to load config")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dreamcast_player={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }
    let Some(input) = args.input.clone() else {
        anyhow::bail!("No narration input given");
    };

    info!("Starting DreamCast player");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let ctx = open_context(&config, args.device.clone(), Arc::clone(&clock));

    let preview = if args.premium {
        PreviewPolicy::entitled()
    } else {
        PreviewPolicy::preview(config.playback.preview_limit_secs)
    };

    let mut player = Player::new(&config, ctx, clock, preview, Arc::new(NoopWakeLock));
    let mut events = player.subscribe();

    if let Some(volume) = args.voice_volume {
        player.controller_mut().set_voice_volume(volume);
    }
    if let Some(volume) = args.ambience_volume {
        player.controller_mut().set_ambience_volume(volume);
    }

    let title = input
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("Story")
        .to_string();
    let story = Story::new(title).with_ambience(args.ambience);

    if let Err(e) = player
        .open(story, Some(NarrationInput::Url(input)), true)
        .await
    {
        drain_events(&mut events)?;
        player.close();
        return Err(e).context("Failed to open story");
    }

    if let Some(minutes) = args.sleep_minutes {
        player.set_sleep_timer(minutes);
    }

    let mut ticker = tokio::time::interval(config.playback.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => player.tick(),
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event)?;
                    if matches!(
                        event,
                        PlayerEvent::StoryEnded { .. } | PlayerEvent::PaywallRequired { .. }
                    ) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event output lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => break,
        }
    }

    player.close();
    drain_events(&mut events)?;
    info!("Player shutdown complete");
    Ok(())
}

/// Negotiate the output device and build a context at its rate
///
/// Without a usable device the context still runs, headless.
fn open_context(
    config: &PlayerConfig,
    device: Option<String>,
    clock: Arc<dyn Clock>,
) -> AudioContext {
    let device = device.or_else(|| config.output.device.clone());

    let format = match AudioOutput::negotiate(device.as_deref(), config.output.sample_rate) {
        Ok(format) => Some(format),
        Err(e) => {
            warn!("{}; running without audio output", e);
            None
        }
    };

    let sample_rate = format
        .as_ref()
        .map_or(config.output.sample_rate, |f| f.sample_rate);
    let mut ctx = AudioContext::new(sample_rate, clock, config.output.fft_size);

    if let Some(format) = &format {
        if let Err(e) = ctx.attach_output(format, config.output.buffer_size) {
            warn!("{}; running without audio output", e);
        }
    }
    ctx
}

fn print_event(event: &PlayerEvent) -> Result<()> {
    println!("{}", serde_json::to_string(event).context("Failed to encode event")?);
    Ok(())
}

fn drain_events(events: &mut tokio::sync::broadcast::Receiver<PlayerEvent>) -> Result<()> {
    while let Ok(event) = events.try_recv() {
        print_event(&event)?;
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

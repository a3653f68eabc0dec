use anyhow::Result;
use tracing::info;
use voice_session::transport::API_KEY_ENV;
use voice_session::Config;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/voice-session")?;

    info!("{} v0.1.0", cfg.service.name);
    info!(
        "Capture: {} Hz mono, {} samples per frame",
        cfg.audio.capture_sample_rate, cfg.audio.frame_samples
    );
    info!("Playback: {} Hz mono", cfg.audio.playback_sample_rate);
    info!("Live model: {} (voice: {})", cfg.live.model, cfg.live.voice);

    if std::env::var(API_KEY_ENV).is_ok() {
        info!("{} is set; live transport available", API_KEY_ENV);
    } else {
        info!("{} is not set; live transport unavailable", API_KEY_ENV);
    }

    info!("Session control is driven by the embedding UI through SessionController");

    Ok(())
}

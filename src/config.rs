use anyhow::Result;
use serde::Deserialize;

use crate::transport::LiveConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub live: LiveConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate; must match what the wire format declares (16kHz)
    pub capture_sample_rate: u32,
    /// Output sample rate of synthesized audio (24kHz)
    pub playback_sample_rate: u32,
    /// Samples per captured frame
    pub frame_samples: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

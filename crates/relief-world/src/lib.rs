//! Terrain sizing, configuration, and layered noise sampling.
#![forbid(unsafe_code)]

pub mod config;
pub mod noise;
pub mod seed;

pub use config::{
    ConfigError, ErosionParams, NoiseParams, TerrainBand, TerrainConfig, TextureParams,
    load_config_from_path,
};
pub use noise::NoiseField;
pub use seed::hash_seed;

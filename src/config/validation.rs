use anyhow::Result;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use garde::Validate;

use super::{AppConfig, AuthCacheConfig, AuthCacheSettings};
use crate::error::AuthCacheError;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "authcache", about = "Generational authentication cache")]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, env = "AUTHCACHE_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// Environment name
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Seconds between statistics log lines
    #[arg(long, default_value_t = 60)]
    pub stats_interval: u64,
}

/// Layered configuration, lowest priority first:
///
/// 1. Embedded defaults
/// 2. `config/default.toml`
/// 3. `config/{environment}.toml`
/// 4. An explicit `--config` file
/// 5. `AUTHCACHE_` environment variables (`__` separates sections)
/// 6. CLI flags
pub fn load_config_with(cli: &Cli) -> Result<AppConfig> {
    let env_name = cli.environment.clone().unwrap_or_else(|| {
        std::env::var("ENVIRONMENT").unwrap_or_else(|_| "production".to_string())
    });

    let mut figment = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file("config/default.toml"))
        .merge(Toml::file(format!("config/{}.toml", env_name)));

    if let Some(path) = &cli.config {
        figment = figment.merge(Toml::file(path));
    }

    let mut config: AppConfig = figment
        .merge(Env::prefixed("AUTHCACHE_").split("__"))
        .extract()?;

    if cli.debug {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;

    Ok(config)
}

/// Extract and validate the authentication cache properties on their own.
///
/// Unlike [`load_config_with`] no defaults are layered underneath, so a
/// missing property is a configuration error.
pub fn extract_auth_cache_config(figment: &Figment) -> Result<AuthCacheConfig, AuthCacheError> {
    let settings: AuthCacheSettings = figment.extract()?;
    settings.validate()?;
    Ok(AuthCacheConfig::from(&settings))
}

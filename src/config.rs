//! Config handling

use std::path::PathBuf;

use tracing::log::LevelFilter;

use crate::cli::CliOptions;
use crate::constants::API_KEY_PLACEHOLDER;

/// Process-wide configuration, built once in `main` and passed down.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Gemini API key as supplied, possibly the placeholder.
    pub gemini_api_key: Option<String>,
    /// Directory holding the faces/glasses/results subdirectories.
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Builds the configuration from parsed CLI options.
    pub fn from_cli(cli: &CliOptions) -> Self {
        Self {
            gemini_api_key: cli.gemini_api_key.clone(),
            data_dir: cli.data_dir.clone(),
        }
    }

    /// Returns the API key if it's usable. An absent, empty or placeholder
    /// key means simulation mode, not a failure.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != API_KEY_PLACEHOLDER)
    }
}

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> AppConfig {
        AppConfig {
            gemini_api_key: key.map(str::to_string),
            data_dir: PathBuf::from("./data"),
        }
    }

    #[test]
    fn placeholder_key_is_not_usable() {
        assert!(config_with_key(Some(API_KEY_PLACEHOLDER))
            .usable_api_key()
            .is_none());
    }

    #[test]
    fn absent_and_empty_keys_are_not_usable() {
        assert!(config_with_key(None).usable_api_key().is_none());
        assert!(config_with_key(Some("")).usable_api_key().is_none());
        assert!(config_with_key(Some("   ")).usable_api_key().is_none());
    }

    #[test]
    fn real_key_is_usable() {
        assert_eq!(
            config_with_key(Some("sk-test")).usable_api_key(),
            Some("sk-test")
        );
    }
}

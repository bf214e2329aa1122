//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "GLASSIFY_DEBUG")]
    /// Enable debug logging. Env: GLASSIFY_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "8000", env = "GLASSIFY_PORT")]
    /// http listener, defaults to `8000`.
    /// Env: GLASSIFY_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "GLASSIFY_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: GLASSIFY_LISTEN_ADDRESS
    pub listen_address: String,
    #[clap(long, short, default_value = "./data", env = "GLASSIFY_DATA_DIR")]
    /// Directory holding the faces/glasses/results subdirectories.
    /// Env: GLASSIFY_DATA_DIR
    pub data_dir: PathBuf,

    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    /// Gemini API key. Absent or placeholder means simulation mode.
    /// Env: GEMINI_API_KEY
    pub gemini_api_key: Option<String>,
}

use std::fs;
use std::io::ErrorKind;
use std::time::Duration;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use crate::advisor::GeminiOptions;
use crate::bridge::Args;
use crate::ingest::serial::{SerialOptions, AUTO_PORT};

pub const DEFAULT_CONFIG_FILE: &str = "agrosense.toml";

/// Environment variables consulted for the model API key, in order
pub const API_KEY_ENV: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SerialConfig {
    // device path, eg: /dev/ttyACM0, COM3, or "auto"
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    // a read returns empty-handed after this long
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    // wait after opening, the board resets on connect
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    // pause between synthetic readings
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,

    // write synthetic readings while the board is quiet
    #[serde(default = "default_synthesize_when_idle")]
    pub synthesize_when_idle: bool,
}

fn default_port() -> String {
    AUTO_PORT.to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_pace_ms() -> u64 {
    500
}

fn default_synthesize_when_idle() -> bool {
    true
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            settle_ms: default_settle_ms(),
            pace_ms: default_pace_ms(),
            synthesize_when_idle: default_synthesize_when_idle(),
        }
    }
}

impl SerialConfig {
    pub fn options(&self) -> SerialOptions {
        SerialOptions {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// recommendation model configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    // falls back to the API_KEY / GEMINI_API_KEY environment variables
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_output_tokens() -> u32 {
    500
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_response_bytes() -> u64 {
    1024 * 1024
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl AdvisorConfig {
    pub fn options(&self) -> GeminiOptions {
        GeminiOptions {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            max_response_bytes: self.max_response_bytes,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Config {
    /// Fill the API key from the environment when the file has none
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.advisor.has_api_key() {
            return;
        }
        self.advisor.api_key = API_KEY_ENV
            .iter()
            .filter_map(|name| lookup(name))
            .find(|key| !key.is_empty());
    }

    /// Command line values win over the file
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(port) = &args.port {
            self.serial.port = port.clone();
        }
        if let Some(baud_rate) = args.baud_rate {
            self.serial.baud_rate = baud_rate;
        }
        if let Some(listen) = &args.listen {
            self.http.listen_addr = listen.clone();
        }
    }
}

/// Load the configuration file.
///
/// An explicitly given file must exist; the default file is optional.
pub fn load(path: Option<&str>) -> anyhow::Result<Config> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (DEFAULT_CONFIG_FILE, false),
    };

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound && !required => return Ok(Config::default()),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path)),
    };
    parse(&content).with_context(|| format!("failed to parse {}", path))
}

pub fn parse(content: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(content)?;
    Ok(config)
}

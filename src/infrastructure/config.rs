use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub framing: FramingSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SerialSettings {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Open the port at startup instead of waiting for a request.
    #[serde(default)]
    pub connect_on_start: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FramingSettings {
    /// Longest accepted inbound line in bytes; 0 disables the cap.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertSettings {
    #[serde(default = "default_alert_capacity")]
    pub capacity: usize,
}

impl FramingSettings {
    pub fn line_cap(&self) -> Option<usize> {
        (self.max_line_bytes > 0).then_some(self.max_line_bytes)
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            connect_on_start: false,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for FramingSettings {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            capacity: default_alert_capacity(),
        }
    }
}

fn default_port() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_line_bytes() -> usize {
    64 * 1024
}

fn default_alert_capacity() -> usize {
    5
}

/// Layer `config/bridge.*` (optional) under `BRIDGE__SECTION__KEY` variables.
pub fn load_bridge_config() -> anyhow::Result<BridgeConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/bridge").required(false))
        .add_source(
            config::Environment::with_prefix("BRIDGE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

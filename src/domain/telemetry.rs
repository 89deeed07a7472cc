// Telemetry domain models
use serde::{Deserialize, Serialize};

/// Full-scale value of the tracker's 10-bit light sensors.
pub const LDR_MAX: i64 = 1023;
/// Panel servos travel between 0 and this many degrees.
pub const ANGLE_MAX: f64 = 180.0;
/// Nominal panel voltage; the controller never reports one.
pub const NOMINAL_VOLTAGE: f64 = 12.4;
/// Panel output at full light, in watts.
pub const MAX_POWER_WATTS: f64 = 40.0;
/// Efficiency reported at full light, in percent.
pub const MAX_EFFICIENCY_PCT: f64 = 95.0;

/// One accepted telemetry record from the controller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryFrame {
    pub ldr_tl: i64,
    pub ldr_tr: i64,
    pub ldr_bl: i64,
    pub ldr_br: i64,
    pub temp: f64,
    #[serde(rename = "hPos")]
    pub h_pos: f64,
    #[serde(rename = "vPos")]
    pub v_pos: f64,
    pub manual: bool,
    pub active: bool,
}

impl TelemetryFrame {
    pub fn readings(&self) -> [i64; 4] {
        [self.ldr_tl, self.ldr_tr, self.ldr_bl, self.ldr_br]
    }
}

/// Explicit fault report sent by the controller instead of telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorFrame {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    #[serde(alias = "auto")]
    Automatic,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorData {
    pub ldr_top_left: i64,
    pub ldr_top_right: i64,
    pub ldr_bottom_left: i64,
    pub ldr_bottom_right: i64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelPosition {
    pub azimuth: f64,
    pub elevation: f64,
}

/// Metrics computed locally from the light readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerMetrics {
    pub average_light: f64,
    pub power: f64,
    pub voltage: f64,
    pub current: f64,
    pub efficiency: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub mode: TrackingMode,
    pub is_active: bool,
}

/// Latest known view of the tracker, replaced wholesale on every frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainState {
    pub sensor_data: SensorData,
    pub panel_position: PanelPosition,
    pub power_metrics: PowerMetrics,
    pub system_status: SystemStatus,
}

impl Default for DomainState {
    fn default() -> Self {
        Self {
            sensor_data: SensorData {
                ldr_top_left: 0,
                ldr_top_right: 0,
                ldr_bottom_left: 0,
                ldr_bottom_right: 0,
                temperature: 0.0,
            },
            panel_position: PanelPosition {
                azimuth: 90.0,
                elevation: 90.0,
            },
            power_metrics: PowerMetrics {
                average_light: 0.0,
                power: 0.0,
                voltage: 0.0,
                current: 0.0,
                efficiency: 0,
            },
            system_status: SystemStatus {
                mode: TrackingMode::Automatic,
                is_active: false,
            },
        }
    }
}

impl DomainState {
    pub fn is_manual(&self) -> bool {
        self.system_status.mode == TrackingMode::Manual
    }
}

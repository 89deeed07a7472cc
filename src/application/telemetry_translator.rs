// Maps accepted frames onto the domain state and derives power metrics
use crate::domain::telemetry::{
    DomainState, LDR_MAX, MAX_EFFICIENCY_PCT, MAX_POWER_WATTS, NOMINAL_VOLTAGE, PanelPosition,
    PowerMetrics, SensorData, SystemStatus, TelemetryFrame, TrackingMode,
};

/// Build a complete replacement state from one frame.
pub fn translate(frame: &TelemetryFrame) -> DomainState {
    DomainState {
        sensor_data: SensorData {
            ldr_top_left: frame.ldr_tl,
            ldr_top_right: frame.ldr_tr,
            ldr_bottom_left: frame.ldr_bl,
            ldr_bottom_right: frame.ldr_br,
            temperature: frame.temp,
        },
        panel_position: PanelPosition {
            azimuth: frame.h_pos,
            elevation: frame.v_pos,
        },
        power_metrics: derive_metrics(&frame.readings()),
        system_status: SystemStatus {
            mode: if frame.manual {
                TrackingMode::Manual
            } else {
                TrackingMode::Automatic
            },
            is_active: frame.active,
        },
    }
}

/// Power model: output scales linearly with the mean light fraction.
pub fn derive_metrics(readings: &[i64; 4]) -> PowerMetrics {
    let average_light = readings.iter().sum::<i64>() as f64 / readings.len() as f64;
    let light_fraction = average_light / LDR_MAX as f64;

    let power = round_to_tenth(light_fraction * MAX_POWER_WATTS);
    // Current is derived from the already rounded power.
    let current = round_to_tenth(power / NOMINAL_VOLTAGE);
    let efficiency = (light_fraction * MAX_EFFICIENCY_PCT).round() as i64;

    PowerMetrics {
        average_light,
        power,
        voltage: NOMINAL_VOLTAGE,
        current,
        efficiency,
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(readings: [i64; 4], manual: bool) -> TelemetryFrame {
        TelemetryFrame {
            ldr_tl: readings[0],
            ldr_tr: readings[1],
            ldr_bl: readings[2],
            ldr_br: readings[3],
            temp: 25.0,
            h_pos: 90.0,
            v_pos: 45.0,
            manual,
            active: true,
        }
    }

    #[test]
    fn test_reference_frame_metrics() {
        let state = translate(&frame([500; 4], false));
        let metrics = &state.power_metrics;

        assert_eq!(metrics.average_light, 500.0);
        assert_eq!(metrics.power, 19.6);
        assert_eq!(metrics.voltage, 12.4);
        assert_eq!(metrics.current, 1.6);
        assert_eq!(metrics.efficiency, 46);
    }

    #[test]
    fn test_fields_copied_verbatim() {
        let state = translate(&frame([10, 20, 30, 40], true));

        assert_eq!(state.sensor_data.ldr_top_left, 10);
        assert_eq!(state.sensor_data.ldr_bottom_right, 40);
        assert_eq!(state.sensor_data.temperature, 25.0);
        assert_eq!(state.panel_position.azimuth, 90.0);
        assert_eq!(state.panel_position.elevation, 45.0);
        assert_eq!(state.system_status.mode, TrackingMode::Manual);
        assert!(state.system_status.is_active);
        assert_eq!(state.power_metrics.average_light, 25.0);
    }

    #[test]
    fn test_dark_and_full_light() {
        let dark = derive_metrics(&[0; 4]);
        assert_eq!(dark.power, 0.0);
        assert_eq!(dark.current, 0.0);
        assert_eq!(dark.efficiency, 0);

        let full = derive_metrics(&[1023; 4]);
        assert_eq!(full.power, 40.0);
        assert_eq!(full.current, 3.2);
        assert_eq!(full.efficiency, 95);
    }
}

// Envelope check and schema-checked decoding of inbound lines
use crate::domain::telemetry::{ANGLE_MAX, ErrorFrame, LDR_MAX, TelemetryFrame};
use serde_json::Value;

/// Result of handing one candidate line to the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Not a `{...}` envelope. Expected line noise, dropped silently.
    Ignored,
    Telemetry(TelemetryFrame),
    DeviceError(ErrorFrame),
    Invalid(FrameError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("malformed JSON: {0}")]
    Syntax(String),

    #[error("envelope is not a JSON object")]
    NotAnObject,

    #[error("telemetry schema mismatch: {0}")]
    Schema(String),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Classify a candidate line. Never panics on arbitrary input.
pub fn parse(line: &str) -> ParseOutcome {
    let trimmed = line.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return ParseOutcome::Ignored;
    }

    match decode(trimmed) {
        Ok(outcome) => outcome,
        Err(e) => ParseOutcome::Invalid(e),
    }
}

fn decode(envelope: &str) -> Result<ParseOutcome, FrameError> {
    let value: Value =
        serde_json::from_str(envelope).map_err(|e| FrameError::Syntax(e.to_string()))?;
    let Value::Object(fields) = &value else {
        return Err(FrameError::NotAnObject);
    };

    if let Some(error) = fields.get("error").filter(|v| is_truthy(v)) {
        let message = match error {
            Value::String(message) => message.clone(),
            other => other.to_string(),
        };
        return Ok(ParseOutcome::DeviceError(ErrorFrame { message }));
    }

    let frame: TelemetryFrame =
        serde_json::from_value(value).map_err(|e| FrameError::Schema(e.to_string()))?;
    validate(&frame)?;
    Ok(ParseOutcome::Telemetry(frame))
}

/// `null`, `false`, `0` and `""` do not mark a fault report; any other value does.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn validate(frame: &TelemetryFrame) -> Result<(), FrameError> {
    let readings = [
        ("ldr_tl", frame.ldr_tl),
        ("ldr_tr", frame.ldr_tr),
        ("ldr_bl", frame.ldr_bl),
        ("ldr_br", frame.ldr_br),
    ];
    for (field, value) in readings {
        if !(0..=LDR_MAX).contains(&value) {
            return Err(FrameError::OutOfRange {
                field,
                value: value as f64,
            });
        }
    }

    for (field, value) in [("hPos", frame.h_pos), ("vPos", frame.v_pos)] {
        if !(0.0..=ANGLE_MAX).contains(&value) {
            return Err(FrameError::OutOfRange { field, value });
        }
    }

    if !frame.temp.is_finite() {
        return Err(FrameError::OutOfRange {
            field: "temp",
            value: frame.temp,
        });
    }

    Ok(())
}

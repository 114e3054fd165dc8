//! Plain-text codec for recorded poses.
//!
//! A record looks like:
//!
//! ```text
//! Target X Position: 0.25
//! Target Y Position: 0.86
//! Target Z Position: 0
//!
//! Link1: Rotation(0, 12.5, 0)
//! Link2: Rotation(350.1, 0, 4)
//! --------------------------------------------------
//! ```
//!
//! Blank lines and the dashed separator are ignored, as is any other line
//! that is neither a target coordinate nor a rotation.

use crate::error::EnvError;
use crate::types::{EulerAngles, PoseRecord, SamplePoint};

const TARGET_X: &str = "Target X Position";
const TARGET_Y: &str = "Target Y Position";
const TARGET_Z: &str = "Target Z Position";
const ROTATION_TAG: &str = ": Rotation(";
const SEPARATOR: &str = "--------------------------------------------------";

/// Parses one record from its text form.
pub fn parse_record(text: &str) -> Result<PoseRecord, EnvError> {
    let mut x = None;
    let mut y = None;
    let mut z = None;
    let mut record = PoseRecord::new(SamplePoint::origin());

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with("---") {
            continue;
        }

        if line.starts_with(TARGET_X) {
            x = Some(parse_coordinate(line, line_no)?);
        } else if line.starts_with(TARGET_Y) {
            y = Some(parse_coordinate(line, line_no)?);
        } else if line.starts_with(TARGET_Z) {
            z = Some(parse_coordinate(line, line_no)?);
        } else if let Some(split) = line.find(ROTATION_TAG) {
            let name = line[..split].trim();
            let rotation = parse_rotation(&line[split + ROTATION_TAG.len()..], line_no)?;
            record = record.with_joint(name, rotation);
        } else {
            tracing::trace!(line = line_no, "ignoring unrecognised record line");
        }
    }

    record.target = SamplePoint::new(
        x.ok_or(EnvError::MissingField(TARGET_X))?,
        y.ok_or(EnvError::MissingField(TARGET_Y))?,
        z.ok_or(EnvError::MissingField(TARGET_Z))?,
    );

    Ok(record)
}

/// Renders a record in the text form accepted by [`parse_record`].
pub fn format_record(record: &PoseRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}: {}\n", TARGET_X, record.target.x));
    out.push_str(&format!("{}: {}\n", TARGET_Y, record.target.y));
    out.push_str(&format!("{}: {}\n", TARGET_Z, record.target.z));
    out.push('\n');

    for joint in &record.joints {
        out.push_str(&format!(
            "{}{}{}, {}, {})\n",
            joint.name, ROTATION_TAG, joint.rotation.x, joint.rotation.y, joint.rotation.z
        ));
    }

    out.push_str(SEPARATOR);
    out.push('\n');
    out
}

fn parse_coordinate(line: &str, line_no: usize) -> Result<f64, EnvError> {
    let (_, value) = line
        .split_once(':')
        .ok_or_else(|| EnvError::parse(line_no, "expected `<label>: <value>`"))?;
    parse_float(value, line_no)
}

fn parse_rotation(body: &str, line_no: usize) -> Result<EulerAngles, EnvError> {
    let inner = body
        .strip_suffix(')')
        .ok_or_else(|| EnvError::parse(line_no, "rotation is missing its closing `)`"))?;

    let parts: Vec<&str> = inner.split(',').collect();
    if parts.len() != 3 {
        return Err(EnvError::parse(
            line_no,
            format!("rotation needs 3 components, found {}", parts.len()),
        ));
    }

    Ok(EulerAngles::new(
        parse_float(parts[0], line_no)?,
        parse_float(parts[1], line_no)?,
        parse_float(parts[2], line_no)?,
    ))
}

fn parse_float(value: &str, line_no: usize) -> Result<f64, EnvError> {
    let value = value.trim();
    value
        .parse::<f64>()
        .map_err(|e| EnvError::parse(line_no, format!("invalid number `{}`: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
Target X Position: -0.55
Target Y Position: 0.86
Target Z Position: 1.25

Link1: Rotation(0, 12.5, 0)
Link2: Rotation(350.1, 1E-05, 4)
--------------------------------------------------
";

    #[test]
    fn test_parse_sample_record() {
        let record = parse_record(SAMPLE).unwrap();

        assert_relative_eq!(record.target.x, -0.55);
        assert_relative_eq!(record.target.y, 0.86);
        assert_relative_eq!(record.target.z, 1.25);

        assert_eq!(record.joints.len(), 2);
        assert_eq!(record.joints[0].name, "Link1");
        assert_relative_eq!(record.joints[0].rotation.y, 12.5);
        assert_eq!(record.joints[1].name, "Link2");
        assert_relative_eq!(record.joints[1].rotation.x, 350.1);
        assert_relative_eq!(record.joints[1].rotation.y, 1e-5);
    }

    #[test]
    fn test_format_then_parse_preserves_record() {
        let record = PoseRecord::new(SamplePoint::new(0.25, 1.75, 0.5))
            .with_joint("Base", EulerAngles::new(10.0, 20.0, 30.0))
            .with_joint("Wrist", EulerAngles::new(-5.5, 0.0, 359.0));

        let text = format_record(&record);
        assert!(text.ends_with(&format!("{}\n", SEPARATOR)));

        let parsed = parse_record(&text).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_missing_coordinate_is_reported() {
        let text = "Target X Position: 1\nTarget Y Position: 2\nLink: Rotation(0, 0, 0)\n";
        let err = parse_record(text).unwrap_err();
        assert!(matches!(err, EnvError::MissingField(TARGET_Z)));
    }

    #[test]
    fn test_malformed_rotation_names_line() {
        let text = "Target X Position: 1\nTarget Y Position: 2\nTarget Z Position: 3\nLink: Rotation(0, 0)\n";
        match parse_record(text).unwrap_err() {
            EnvError::Parse { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_number() {
        let text = "Target X Position: abc\n";
        assert!(matches!(
            parse_record(text),
            Err(EnvError::Parse { line: 1, .. })
        ));
    }
}

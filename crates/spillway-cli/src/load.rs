//! Scenario and input loading for the command-line harness.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use spillway_core::{InputSpec, Scenario, SimError, PERSON_OVERFLOW};
use thiserror::Error;

/// Failures surfaced by the harness.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A scenario file is not valid JSON for a scenario.
    #[error("invalid scenario {origin}: {source}")]
    Parse {
        /// File path or built-in name.
        origin: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The simulator rejected the scenario or the read.
    #[error(transparent)]
    Sim(#[from] SimError),
    /// Output could not be serialized.
    #[error("failed to encode output: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Parses scenario JSON; `origin` names the text in error messages.
///
/// # Errors
///
/// Returns [`CliError::Parse`] when the text is not a valid scenario.
pub fn parse_scenario(text: &str, origin: &str) -> Result<Scenario, CliError> {
    serde_json::from_str(text).map_err(|source| CliError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// Loads a scenario from a JSON file, or the built-in scenario by name.
///
/// # Errors
///
/// Returns [`CliError::Io`] or [`CliError::Parse`].
pub fn load_scenario(path: &Path) -> Result<Scenario, CliError> {
    if path.as_os_str() == PERSON_OVERFLOW && !path.exists() {
        debug!("using built-in scenario `{PERSON_OVERFLOW}`");
        return Ok(Scenario::person_overflow());
    }

    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded scenario from {}", path.display());
    parse_scenario(&text, &path.display().to_string())
}

/// Reads a file's bytes as a finite read input.
///
/// # Errors
///
/// Returns [`CliError::Io`] when the file cannot be read.
pub fn file_input(path: &Path) -> Result<InputSpec, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded {} input bytes from {}", bytes.len(), path.display());
    Ok(InputSpec::Bytes { bytes })
}

#[cfg(test)]
mod tests {
    use super::{load_scenario, parse_scenario, CliError};
    use spillway_core::{ByteOrder, FieldKind, InputSpec, ScalarValue};
    use std::path::Path;

    const SCENARIO: &str = r#"{
        "byte_order": "big",
        "regions": [
            { "name": "buf", "capacity": 8 },
            { "name": "obj", "capacity": 8, "fields": [
                { "name": "id", "offset": 0, "width": 4, "kind": "unsigned" },
                { "name": "tag", "offset": 4, "width": 4, "kind": "chars" }
            ] }
        ],
        "initial": [
            { "region": "obj", "field": "id", "value": 7 },
            { "region": "obj", "field": "tag", "value": "ok" }
        ],
        "read": {
            "destination": "buf",
            "length": 12,
            "input": { "kind": "chunked", "chunk": 10, "inner": { "kind": "pattern", "seed": 65 } }
        }
    }"#;

    #[test]
    fn parses_full_scenario() {
        let scenario = parse_scenario(SCENARIO, "inline").expect("valid scenario");
        assert_eq!(scenario.byte_order, ByteOrder::Big);
        assert_eq!(scenario.regions[1].fields[1].kind, FieldKind::Chars);
        assert_eq!(scenario.initial[0].value, ScalarValue::Integer(7));
        assert_eq!(scenario.initial[1].value, ScalarValue::Text("ok".into()));
        assert!(matches!(scenario.read.input, InputSpec::Chunked { chunk: 10, .. }));
    }

    #[test]
    fn defaults_apply_to_optional_sections() {
        let scenario = parse_scenario(
            r#"{ "regions": [ { "name": "a", "capacity": 4 } ],
                 "read": { "destination": "a", "length": 2, "input": { "kind": "text", "text": "hi" } } }"#,
            "inline",
        )
        .expect("minimal scenario");
        assert_eq!(scenario.byte_order, ByteOrder::Little);
        assert!(scenario.initial.is_empty());
        assert!(scenario.regions[0].fields.is_empty());
    }

    #[test]
    fn malformed_json_names_origin() {
        let error = parse_scenario("{", "broken.json").expect_err("must fail");
        assert!(matches!(error, CliError::Parse { .. }));
        assert!(error.to_string().contains("broken.json"));
    }

    #[test]
    fn builtin_name_resolves_without_file() {
        let scenario = load_scenario(Path::new("person-overflow")).expect("builtin");
        assert_eq!(scenario.read.length, 100);
    }

    #[test]
    fn missing_file_is_io_error() {
        let error = load_scenario(Path::new("does/not/exist.json")).expect_err("must fail");
        assert!(matches!(error, CliError::Io { .. }));
    }
}

//! YAML parsing with error handling

use serde::de::DeserializeOwned;

use crate::yaml::diagnostics::{YamlError, YamlSyntaxError};

/// Parse YAML content into a typed value, keeping the source for diagnostics
pub fn parse_yaml<T: DeserializeOwned + 'static>(content: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(content).map_err(|e| {
        YamlError::Syntax(YamlSyntaxError::from_serde_error(&e, content, filename))
    })
}

/// Parse YAML from a file path
pub fn parse_yaml_file<T: DeserializeOwned + 'static>(path: &std::path::Path) -> Result<T, YamlError> {
    let content = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();
    parse_yaml(&content, &filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        name: String,
        central_value: f64,
    }

    #[test]
    fn test_parse_valid_yaml() {
        let yaml = "name: VMEAS\ncentral_value: 2.5";
        let result: Point = parse_yaml(yaml, "model.yaml").unwrap();
        assert_eq!(result.name, "VMEAS");
        assert_eq!(result.central_value, 2.5);
    }

    #[test]
    fn test_syntax_error_keeps_filename() {
        let yaml = "name: VMEAS\n  central_value: [";
        let err = parse_yaml::<Point>(yaml, "model.yaml").unwrap_err();
        match err {
            YamlError::Syntax(syntax) => assert_eq!(syntax.filename, "model.yaml"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = parse_yaml_file::<Point>(std::path::Path::new("/nonexistent/model.yaml"))
            .unwrap_err();
        assert!(matches!(err, YamlError::Io(_)));
    }
}

//! Shared helper functions for CLI commands

use std::path::Path;

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::config::CalcConfig;
use crate::entities::model::MeasurementModel;

/// Placeholder shown for unavailable values
pub const PLACEHOLDER: &str = "--";

/// Load the calculation settings named by `--config`, or the defaults
pub fn load_config(global: &GlobalOpts) -> Result<CalcConfig> {
    match &global.config {
        Some(path) => Ok(CalcConfig::load(path)?),
        None => Ok(CalcConfig::default()),
    }
}

/// Load settings and a model file together
pub fn load_context(global: &GlobalOpts, model_path: &Path) -> Result<(MeasurementModel, CalcConfig)> {
    let config = load_config(global)?;
    let model = MeasurementModel::load(model_path)?;
    Ok((model, config))
}

/// Calibration point indices selected by `--point`, all points when absent
pub fn select_points(model: &MeasurementModel, point: Option<&str>) -> Result<Vec<usize>> {
    match point {
        Some(selector) => Ok(vec![model.point_index(selector)?]),
        None => Ok((0..model.point_count()).collect()),
    }
}

/// Result variables selected by `--target`, all results when absent
pub fn select_targets(results: Vec<String>, target: Option<&str>) -> Vec<String> {
    match target {
        Some(t) => vec![t.to_string()],
        None => results,
    }
}

/// Format a value with up to `digits` significant digits, or the placeholder
pub fn format_value(value: Option<f64>, digits: usize) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let text = format!("{:.*e}", digits.saturating_sub(1), v);
            // Plain notation for moderate magnitudes
            if v == 0.0 || (1e-4..1e6).contains(&v.abs()) {
                match text.parse::<f64>() {
                    Ok(rounded) => rounded.to_string(),
                    Err(_) => text,
                }
            } else {
                text
            }
        }
        Some(v) => v.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

/// Effective degrees of freedom, with the large sentinel shown as `inf`
pub fn format_dof(dof: f64) -> String {
    if dof >= crate::core::budget::INFINITE_DOF || dof.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", dof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(2.0), 6), "2");
        assert_eq!(format_value(Some(0.123456789), 4), "0.1235");
        assert_eq!(format_value(Some(1.5e-7), 3), "1.50e-7");
        assert_eq!(format_value(None, 4), "--");
        assert_eq!(format_value(Some(0.0), 4), "0");
    }

    #[test]
    fn test_format_dof() {
        assert_eq!(format_dof(1e100), "inf");
        assert_eq!(format_dof(14.9522), "14.95");
    }

    #[test]
    fn test_select_targets() {
        let all = vec!["W".to_string(), "V".to_string()];
        assert_eq!(select_targets(all.clone(), None), all);
        assert_eq!(select_targets(all, Some("V")), vec!["V"]);
    }
}

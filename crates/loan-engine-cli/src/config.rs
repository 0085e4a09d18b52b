//! `--config` loading. Without a file the engine runs on built-in defaults.

use loan_engine_core::LendingConfig;

use crate::input;

pub fn load_config(path: Option<&str>) -> Result<LendingConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let config: LendingConfig = input::file::read_structured(path)?;
            tracing::debug!(path, "loaded lending configuration");
            config
        }
        None => LendingConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;

    #[test]
    fn test_defaults_without_file() {
        assert_eq!(load_config(None).unwrap(), LendingConfig::default());
    }

    #[test]
    fn test_partial_yaml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lending.yml");
        fs::write(&path, "fallback_credit_score: 550\nhistory_limit: 10\n").unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.fallback_credit_score, 550);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.fallback_dti_ratio, dec!(0.30));
    }
}

use serde::Deserialize;
use std::path::Path;

use crate::error::{ReduceError, Result};
use crate::frame_reduction::frames::normalize_extension;
use crate::frame_reduction::{ReducerConfig, ReferencePolicy, Strategy};

/// On-disk form of a reducer configuration. Every key is optional and
/// falls back to the defaults of `ReducerConfig`.
///
/// ```toml
/// strategy = "histogram"
/// threshold = 0.8
/// min_interval = 6
/// reference = "last-kept"
/// extensions = ["jpg", "png"]
/// ```
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ReducerConfigFile {
    strategy: Option<String>,
    threshold: Option<f64>,
    min_interval: Option<i64>,
    reference: Option<String>,
    extensions: Option<Vec<String>>,
}

/// Caller-supplied values layered on top of a config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub strategy: Option<String>,
    pub threshold: Option<f64>,
    pub min_interval: Option<i64>,
    pub reference: Option<String>,
    pub extensions: Option<Vec<String>>,
}

fn parse_file(contents: &str, origin: &Path) -> Result<ConfigOverrides> {
    let file: ReducerConfigFile = toml::from_str(contents).map_err(|source| ReduceError::Config {
        path: origin.to_path_buf(),
        source,
    })?;

    Ok(ConfigOverrides {
        strategy: file.strategy,
        threshold: file.threshold,
        min_interval: file.min_interval,
        reference: file.reference,
        extensions: file.extensions,
    })
}

impl ReducerConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self> {
        Self::resolve(parse_file(contents, origin)?, ConfigOverrides::default())
    }

    /// Read a TOML config file, apply overrides and validate the result
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let base = match path {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|e| ReduceError::io(path, e))?;
                parse_file(&contents, path)?
            }
            None => ConfigOverrides::default(),
        };
        Self::resolve(base, overrides)
    }

    fn resolve(base: ConfigOverrides, overrides: ConfigOverrides) -> Result<Self> {
        let defaults = ReducerConfig::default();

        let strategy = match overrides.strategy.or(base.strategy) {
            Some(name) => name.parse::<Strategy>()?,
            None => defaults.strategy,
        };
        let min_interval = match overrides.min_interval.or(base.min_interval) {
            Some(n) if n < 0 => return Err(ReduceError::NegativeInterval(n)),
            Some(n) => n as usize,
            None => defaults.min_interval,
        };
        let reference_policy = overrides
            .reference
            .or(base.reference)
            .map(|name| name.parse::<ReferencePolicy>())
            .transpose()?;
        let extensions = overrides
            .extensions
            .or(base.extensions)
            .map(|exts| exts.iter().map(|e| normalize_extension(e)).collect())
            .unwrap_or(defaults.extensions);

        let config = ReducerConfig {
            strategy,
            threshold: overrides
                .threshold
                .or(base.threshold)
                .unwrap_or(defaults.threshold),
            min_interval,
            reference_policy,
            extensions,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = ReducerConfig::load(None, ConfigOverrides::default()).unwrap();
        assert_eq!(config, ReducerConfig::default());
    }

    #[test]
    fn test_file_values_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "strategy = \"ssim\"\nthreshold = 0.955\nextensions = [\".JPG\"]"
        )
        .unwrap();

        let config = ReducerConfig::load(
            Some(file.path()),
            ConfigOverrides {
                reference: Some("last-kept".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.strategy, Strategy::Ssim);
        assert_eq!(config.threshold, 0.955);
        assert_eq!(config.extensions, vec!["jpg".to_string()]);
        assert_eq!(config.reference_policy(), ReferencePolicy::LastKept);

        let config = ReducerConfig::load(
            Some(file.path()),
            ConfigOverrides {
                threshold: Some(0.5),
                strategy: Some("histogram".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.strategy, Strategy::Histogram);
        assert_eq!(config.threshold, 0.5);
    }

    #[test]
    fn test_rejects_bad_values() {
        let origin = Path::new("reducer.toml");
        assert!(matches!(
            ReducerConfig::from_toml_str("min_interval = -3", origin),
            Err(ReduceError::NegativeInterval(-3))
        ));
        assert!(matches!(
            ReducerConfig::from_toml_str("threshold = 1.2", origin),
            Err(ReduceError::InvalidThreshold(_))
        ));
        assert!(matches!(
            ReducerConfig::from_toml_str("strategy = \"orb\"", origin),
            Err(ReduceError::UnknownStrategy(_))
        ));
        assert!(matches!(
            ReducerConfig::from_toml_str("reference = \"oldest\"", origin),
            Err(ReduceError::UnknownReferencePolicy(_))
        ));
        assert!(matches!(
            ReducerConfig::from_toml_str("treshold = 0.5", origin),
            Err(ReduceError::Config { .. })
        ));
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{LineError, LineResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Reject atoms already present instead of coalescing them.
    pub reject_duplicates: bool,
    /// Upper bound on the twists visited by one chain walk.
    pub max_chain_len: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            reject_duplicates: false,
            max_chain_len: 1 << 20,
        }
    }
}

impl LineConfig {
    /// Parse a config from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> LineResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LineResult<()> {
        if self.max_chain_len == 0 {
            return Err(LineError::Config("max_chain_len must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LineConfig::default();
        assert!(!c.reject_duplicates);
        assert_eq!(c.max_chain_len, 1_048_576);
    }

    #[test]
    fn toml_overrides_and_defaults() {
        let c = LineConfig::from_toml_str("reject_duplicates = true").unwrap();
        assert!(c.reject_duplicates);
        assert_eq!(c.max_chain_len, 1_048_576);

        let c = LineConfig::from_toml_str("max_chain_len = 16").unwrap();
        assert_eq!(c.max_chain_len, 16);
        assert_eq!(LineConfig::from_toml_str("").unwrap(), LineConfig::default());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        assert!(matches!(
            LineConfig::from_toml_str("max_chain_len = \"lots\""),
            Err(LineError::Config(_))
        ));
        assert!(matches!(
            LineConfig::from_toml_str("max_chain_len = 0"),
            Err(LineError::Config(_))
        ));
    }

    #[test]
    fn json_roundtrip() {
        let c = LineConfig {
            reject_duplicates: true,
            max_chain_len: 64,
        };
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(serde_json::from_str::<LineConfig>(&json).unwrap(), c);
    }
}

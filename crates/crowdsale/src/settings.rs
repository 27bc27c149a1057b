//! Operator-tunable sale settings.
//!
//! Settings can come from TOML text or a file and are then overlaid with
//! environment variables:
//!
//! - `TRANCHE_INTERVAL_LENGTH`: ledger positions per interval
//! - `TRANCHE_WHITELIST_POLICY`: `guaranteed_window` or `always`

use crate::reserve::ReserveBands;
use crate::whitelist::WhitelistPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tranche_primitives::{env_override, from_toml_str, read_toml_file, ConfigError};

pub const ENV_INTERVAL_LENGTH: &str = "TRANCHE_INTERVAL_LENGTH";
pub const ENV_WHITELIST_POLICY: &str = "TRANCHE_WHITELIST_POLICY";

/// Default ledger positions per interval.
pub const DEFAULT_INTERVAL_LENGTH: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleSettings {
    pub interval_length: u64,
    pub whitelist_policy: WhitelistPolicy,
    pub bands: ReserveBands,
}

impl Default for SaleSettings {
    fn default() -> Self {
        Self {
            interval_length: DEFAULT_INTERVAL_LENGTH,
            whitelist_policy: WhitelistPolicy::default(),
            bands: ReserveBands::default(),
        }
    }
}

impl SaleSettings {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = from_toml_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Self = read_toml_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay environment overrides, then re-validate.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(length) = env_override::<u64>(ENV_INTERVAL_LENGTH)? {
            self.interval_length = length;
        }
        if let Some(policy) = env_override::<WhitelistPolicy>(ENV_WHITELIST_POLICY)? {
            self.whitelist_policy = policy;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_length == 0 {
            return Err(ConfigError::Invalid("interval_length must be positive".into()));
        }
        self.bands.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = SaleSettings::default();
        assert_eq!(settings.interval_length, 30);
        assert_eq!(settings.whitelist_policy, WhitelistPolicy::GuaranteedWindow);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = SaleSettings::from_toml(
            r#"
            whitelist_policy = "always"

            [bands]
            tolerance_bps = 2500
            "#,
        )
        .unwrap();
        assert_eq!(settings.interval_length, 30);
        assert_eq!(settings.whitelist_policy, WhitelistPolicy::Always);
        assert_eq!(settings.bands.tolerance_bps, 2_500);
        assert_eq!(settings.bands.strong_bps, 7_000);
    }

    #[test]
    fn invalid_toml_settings_rejected() {
        assert!(SaleSettings::from_toml("interval_length = 0").is_err());
        assert!(SaleSettings::from_toml("whitelist_policy = \"never\"").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval_length = 12").unwrap();
        let settings = SaleSettings::load(file.path()).unwrap();
        assert_eq!(settings.interval_length, 12);
    }

    #[test]
    fn environment_overrides_apply() {
        std::env::set_var(ENV_INTERVAL_LENGTH, "45");
        std::env::set_var(ENV_WHITELIST_POLICY, "always");
        let settings = SaleSettings::default().with_env_overrides().unwrap();
        std::env::remove_var(ENV_INTERVAL_LENGTH);
        std::env::remove_var(ENV_WHITELIST_POLICY);

        assert_eq!(settings.interval_length, 45);
        assert_eq!(settings.whitelist_policy, WhitelistPolicy::Always);
    }
}

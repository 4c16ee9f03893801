//! TOML-based service configuration and tariff presets.

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::billing::RateTable;
use crate::domain::{IndexPolicy, RateDraft, UtilityRate, UtilityType};

/// Top-level service configuration parsed from TOML.
///
/// All sections have defaults matching the `residential` preset. Load from
/// TOML with [`AppConfig::from_toml_file`] or use [`AppConfig::residential`]
/// for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Page size limits for list endpoints.
    #[serde(default)]
    pub listing: ListingConfig,
    /// Reading and bill rules.
    #[serde(default)]
    pub billing: BillingConfig,
    /// Role enforcement.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Rates seeded into the store at startup.
    #[serde(default)]
    pub tariff: TariffConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface address to bind.
    pub bind_addr: String,
    /// TCP port (0 picks an ephemeral port).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Page size limits for list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Page size used when a request omits `pageSize` (must be > 0).
    pub default_page_size: usize,
    /// Largest page size a request may ask for (must be >= default).
    pub max_page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// Reading and bill rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BillingConfig {
    /// Reject readings whose current index is below the previous index.
    pub reject_decreasing_index: bool,
    /// Currency code printed on reports.
    pub currency: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            reject_decreasing_index: false,
            currency: "VND".to_string(),
        }
    }
}

impl BillingConfig {
    pub fn index_policy(&self) -> IndexPolicy {
        if self.reject_decreasing_index {
            IndexPolicy::RejectDecrease
        } else {
            IndexPolicy::AllowDecrease
        }
    }
}

/// Role enforcement.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// When false, the `X-User-Role` header is not checked.
    pub enforce_roles: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enforce_roles: true,
        }
    }
}

/// Rates seeded into the store at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    pub rates: Vec<RateDraft>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            rates: residential_rates(),
        }
    }
}

fn rate(utility_type: UtilityType, tier: i64, from: i64, to: i64, price: i64) -> RateDraft {
    RateDraft {
        utility_type,
        tier,
        from,
        to,
        price: Decimal::from(price),
    }
}

/// Upper bound used for the open-ended top bracket of preset tariffs.
const TOP_BRACKET_END: i64 = 1_000_000;

fn residential_rates() -> Vec<RateDraft> {
    use UtilityType::{Electric, Water};
    vec![
        rate(Electric, 1, 0, 50, 1806),
        rate(Electric, 2, 50, 100, 1866),
        rate(Electric, 3, 100, 200, 2167),
        rate(Electric, 4, 200, 300, 2729),
        rate(Electric, 5, 300, 400, 3050),
        rate(Electric, 6, 400, TOP_BRACKET_END, 3151),
        rate(Water, 1, 0, 10, 5973),
        rate(Water, 2, 10, 20, 7052),
        rate(Water, 3, 20, 30, 8669),
        rate(Water, 4, 30, TOP_BRACKET_END, 15929),
    ]
}

fn flat_rates() -> Vec<RateDraft> {
    vec![
        rate(UtilityType::Electric, 1, 0, TOP_BRACKET_END, 3500),
        rate(UtilityType::Water, 1, 0, TOP_BRACKET_END, 18000),
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"listing.max_page_size"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl AppConfig {
    /// Returns the residential preset: six electric and four water tiers.
    pub fn residential() -> Self {
        Self {
            server: ServerConfig::default(),
            listing: ListingConfig::default(),
            billing: BillingConfig::default(),
            auth: AuthConfig::default(),
            tariff: TariffConfig::default(),
        }
    }

    /// Returns the flat preset: one open-ended tier per utility type.
    pub fn flat() -> Self {
        Self {
            tariff: TariffConfig {
                rates: flat_rates(),
            },
            ..Self::residential()
        }
    }

    /// Returns the empty preset: no seeded rates, every bill line priced flat.
    pub fn empty() -> Self {
        Self {
            tariff: TariffConfig { rates: Vec::new() },
            ..Self::residential()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["residential", "flat", "empty"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "residential" => Ok(Self::residential()),
            "flat" => Ok(Self::flat()),
            "empty" => Ok(Self::empty()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.bind_addr.parse::<std::net::IpAddr>().is_err() {
            errors.push(ConfigError {
                field: "server.bind_addr".into(),
                message: format!("\"{}\" is not an IP address", self.server.bind_addr),
            });
        }

        let l = &self.listing;
        if l.default_page_size == 0 {
            errors.push(ConfigError {
                field: "listing.default_page_size".into(),
                message: "must be > 0".into(),
            });
        }
        if l.max_page_size < l.default_page_size {
            errors.push(ConfigError {
                field: "listing.max_page_size".into(),
                message: "must be >= listing.default_page_size".into(),
            });
        }

        if self.billing.currency.trim().is_empty() {
            errors.push(ConfigError {
                field: "billing.currency".into(),
                message: "must not be empty".into(),
            });
        }

        let mut seeded = Vec::with_capacity(self.tariff.rates.len());
        for (i, draft) in self.tariff.rates.iter().enumerate() {
            match draft.clone().into_rate(i as u64 + 1) {
                Ok(rate) => seeded.push(rate),
                Err(field_errors) => {
                    errors.extend(field_errors.into_iter().map(|fe| ConfigError {
                        field: format!("tariff.rates[{i}].{}", fe.field),
                        message: fe.message,
                    }));
                }
            }
        }
        errors.extend(tariff_partition_errors(&seeded));

        errors
    }
}

fn tariff_partition_errors(rates: &[UtilityRate]) -> Vec<ConfigError> {
    UtilityType::ALL
        .into_iter()
        .map(|t| RateTable::for_type(t, rates))
        .filter(|table| !table.is_empty())
        .flat_map(|table| {
            let utility_type = table.utility_type();
            table
                .check_partition()
                .into_iter()
                .map(move |issue| ConfigError {
                    field: format!("tariff.rates ({utility_type})"),
                    message: issue.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residential_preset_valid() {
        let cfg = AppConfig::residential();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "residential should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = AppConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in AppConfig::PRESETS {
            let cfg = AppConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn flat_preset_has_one_tier_per_type() {
        let cfg = AppConfig::flat();
        assert_eq!(cfg.tariff.rates.len(), 2);
        assert!(AppConfig::empty().tariff.rates.is_empty());
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[server]
bind_addr = "0.0.0.0"
port = 8080

[listing]
default_page_size = 20
max_page_size = 50

[billing]
reject_decreasing_index = true
currency = "USD"

[auth]
enforce_roles = false

[[tariff.rates]]
type = "Electric"
tier = 1
from = 0
to = 100
price = 0.12

[[tariff.rates]]
type = "Electric"
tier = 2
from = 100
to = 1000
price = "0.18"
"#;
        let cfg = AppConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.server.port), Some(8080));
        assert_eq!(cfg.as_ref().map(|c| c.listing.default_page_size), Some(20));
        assert_eq!(
            cfg.as_ref().map(|c| c.billing.index_policy()),
            Some(IndexPolicy::RejectDecrease)
        );
        assert_eq!(cfg.as_ref().map(|c| c.tariff.rates.len()), Some(2));
        let errors = cfg.map(|c| c.validate()).unwrap_or_default();
        assert!(errors.is_empty(), "parsed config should be valid: {errors:?}");
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[server]
port = 3000
bogus_field = true
"#;
        let result = AppConfig::from_toml_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[server]
port = 4000
"#;
        let cfg = AppConfig::from_toml_str(toml);
        assert!(cfg.is_ok());
        let cfg = cfg.ok();
        // port overridden
        assert_eq!(cfg.as_ref().map(|c| c.server.port), Some(4000));
        // listing kept default
        assert_eq!(cfg.as_ref().map(|c| c.listing.max_page_size), Some(100));
        // residential tariff kept
        assert_eq!(cfg.as_ref().map(|c| c.tariff.rates.len()), Some(10));
        assert_eq!(cfg.as_ref().map(|c| c.auth.enforce_roles), Some(true));
    }

    #[test]
    fn validation_catches_zero_page_size() {
        let mut cfg = AppConfig::residential();
        cfg.listing.default_page_size = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "listing.default_page_size"));
    }

    #[test]
    fn validation_catches_max_below_default() {
        let mut cfg = AppConfig::residential();
        cfg.listing.max_page_size = 5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "listing.max_page_size"));
    }

    #[test]
    fn validation_catches_bad_bind_addr() {
        let mut cfg = AppConfig::residential();
        cfg.server.bind_addr = "localhost:80".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "server.bind_addr"));
    }

    #[test]
    fn validation_reports_invalid_rate_fields() {
        let mut cfg = AppConfig::residential();
        cfg.tariff.rates[0].price = Decimal::ZERO;
        let errors = cfg.validate();
        assert!(
            errors.iter().any(|e| e.field == "tariff.rates[0].price"),
            "expected price error: {errors:?}"
        );
    }

    #[test]
    fn validation_reports_tariff_gap() {
        let mut cfg = AppConfig::residential();
        // water tier 2 moved up leaves [10, 12) unpriced
        cfg.tariff.rates[7].from = 12;
        let errors = cfg.validate();
        assert!(
            errors
                .iter()
                .any(|e| e.field == "tariff.rates (Water)" && e.message.contains("[10, 12)")),
            "expected water gap error: {errors:?}"
        );
    }
}

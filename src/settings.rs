//! Runtime configuration.
//!
//! Layers, lowest first: built-in defaults, legacy unprefixed environment
//! variables (`TELEGRAM_TOKEN`, `OKX_API_KEY`, ...), an optional TOML file and
//! `ARBX_*` environment variables. The raw values are then validated into
//! [`Settings`]; any invalid value is fatal at startup.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

use crate::engine::spread::{DEFAULT_FEE_PCT, DEFAULT_MIN_PROFIT_PCT};
use crate::engine::types::Pair;
use crate::market_data::adapters::kraken::KRAKEN_REST_URL;
use crate::market_data::adapters::okx::OKX_REST_URL;
use crate::market_data::adapters::ApiCredentials;

pub const DEFAULT_CONFIG_FILE: &str = "arbx.toml";
pub const MAX_HISTORY_LEN: usize = 50;

// legacy name -> settings key
const LEGACY_ENV: &[(&str, &str)] = &[
    ("TELEGRAM_TOKEN", "telegram_token"),
    ("TELEGRAM_CHAT_ID", "telegram_chat_id"),
    ("OKX_API_KEY", "okx_api_key"),
    ("OKX_API_SECRET", "okx_api_secret"),
    ("OKX_PASSWORD", "okx_password"),
    ("KRAKEN_API_KEY", "kraken_api_key"),
    ("KRAKEN_API_SECRET", "kraken_api_secret"),
];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid { field, reason: reason.into() }
}

/// Flat, unvalidated view of every configuration key.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<i64>,
    pub okx_api_key: Option<String>,
    pub okx_api_secret: Option<String>,
    pub okx_password: Option<String>,
    pub kraken_api_key: Option<String>,
    pub kraken_api_secret: Option<String>,
    pub okx_base_url: String,
    pub kraken_base_url: String,
    pub symbol: String,
    pub loop_interval_secs: u64,
    pub trade_size_usdt: Decimal,
    pub min_profit_pct: Decimal,
    pub fee_pct: Decimal,
    pub starting_capital_usdt: Decimal,
    pub fetch_timeout_ms: u64,
    pub fetch_retries: u32,
    pub history_len: usize,
    pub notify_idle: bool,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            telegram_token: None,
            telegram_chat_id: None,
            okx_api_key: None,
            okx_api_secret: None,
            okx_password: None,
            kraken_api_key: None,
            kraken_api_secret: None,
            okx_base_url: OKX_REST_URL.to_string(),
            kraken_base_url: KRAKEN_REST_URL.to_string(),
            symbol: "BTC/USDT".to_string(),
            loop_interval_secs: 5,
            trade_size_usdt: dec!(100),
            min_profit_pct: DEFAULT_MIN_PROFIT_PCT,
            fee_pct: DEFAULT_FEE_PCT,
            starting_capital_usdt: dec!(10000),
            fetch_timeout_ms: 3_000,
            fetch_retries: 2,
            history_len: 10,
            notify_idle: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueSettings {
    pub base_url: String,
    pub credentials: Option<ApiCredentials>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram: Option<TelegramSettings>,
    pub okx: VenueSettings,
    pub kraken: VenueSettings,
    pub pair: Pair,
    pub loop_interval: Duration,
    pub trade_size_usdt: Decimal,
    pub min_profit_pct: Decimal,
    pub fee_pct: Decimal,
    pub starting_capital_usdt: Decimal,
    pub fetch_timeout: Duration,
    pub fetch_retries: u32,
    pub history_len: usize,
    pub notify_idle: bool,
}

impl Settings {
    pub fn require_telegram(&self) -> Result<&TelegramSettings, SettingsError> {
        self.telegram
            .as_ref()
            .ok_or_else(|| {
                invalid(
                    "telegram_token",
                    "TELEGRAM_TOKEN and TELEGRAM_CHAT_ID are required unless --console is used",
                )
            })
    }
}

/// Load from `path` (or `arbx.toml` if present) and the environment.
pub fn load(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder();
    for (var, key) in LEGACY_ENV {
        if let Ok(value) = std::env::var(var) {
            builder = builder.set_default(*key, value)?;
        }
    }
    builder = match path {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };
    builder = builder.add_source(Environment::with_prefix("ARBX").try_parsing(true));
    from_builder(builder)
}

pub(crate) fn from_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<Settings, SettingsError> {
    let raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.validate()
}

impl RawSettings {
    pub fn validate(self) -> Result<Settings, SettingsError> {
        let telegram = match (non_empty(self.telegram_token), self.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(TelegramSettings { token, chat_id }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(invalid(
                    "telegram_chat_id",
                    "set TELEGRAM_CHAT_ID together with TELEGRAM_TOKEN",
                ))
            }
            (None, Some(_)) => {
                return Err(invalid(
                    "telegram_token",
                    "set TELEGRAM_TOKEN together with TELEGRAM_CHAT_ID",
                ))
            }
        };

        // OKX requires a passphrase alongside key and secret
        let okx_credentials = match (
            non_empty(self.okx_api_key),
            non_empty(self.okx_api_secret),
            non_empty(self.okx_password),
        ) {
            (Some(key), Some(secret), Some(passphrase)) => {
                Some(ApiCredentials { key, secret, passphrase: Some(passphrase) })
            }
            (None, None, None) => None,
            _ => {
                return Err(invalid(
                    "okx_api_key",
                    "OKX needs api key, secret and password together",
                ))
            }
        };
        let kraken_key = non_empty(self.kraken_api_key);
        let kraken_credentials = match (kraken_key, non_empty(self.kraken_api_secret)) {
            (Some(key), Some(secret)) => Some(ApiCredentials { key, secret, passphrase: None }),
            (None, None) => None,
            _ => {
                return Err(invalid("kraken_api_key", "Kraken needs api key and secret together"))
            }
        };

        let pair: Pair = self.symbol.parse().map_err(|e| invalid("symbol", format!("{e}")))?;

        if self.loop_interval_secs == 0 {
            return Err(invalid("loop_interval_secs", "must be at least 1"));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(invalid("fetch_timeout_ms", "must be positive"));
        }
        if self.trade_size_usdt <= Decimal::ZERO {
            return Err(invalid(
                "trade_size_usdt",
                format!("must be positive, got {}", self.trade_size_usdt),
            ));
        }
        if self.min_profit_pct < Decimal::ZERO {
            return Err(invalid(
                "min_profit_pct",
                format!("must not be negative, got {}", self.min_profit_pct),
            ));
        }
        if self.fee_pct < Decimal::ZERO || self.fee_pct >= dec!(100) {
            return Err(invalid("fee_pct", format!("must be in [0, 100), got {}", self.fee_pct)));
        }
        if self.starting_capital_usdt < Decimal::ZERO {
            return Err(invalid("starting_capital_usdt", "must not be negative"));
        }
        if self.history_len == 0 || self.history_len > MAX_HISTORY_LEN {
            return Err(invalid("history_len", format!("must be between 1 and {MAX_HISTORY_LEN}")));
        }
        let urls =
            [("okx_base_url", &self.okx_base_url), ("kraken_base_url", &self.kraken_base_url)];
        for (field, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(field, format!("not an http(s) URL: {url}")));
            }
        }

        Ok(Settings {
            telegram,
            okx: VenueSettings { base_url: self.okx_base_url, credentials: okx_credentials },
            kraken: VenueSettings {
                base_url: self.kraken_base_url,
                credentials: kraken_credentials,
            },
            pair,
            loop_interval: Duration::from_secs(self.loop_interval_secs),
            trade_size_usdt: self.trade_size_usdt,
            min_profit_pct: self.min_profit_pct,
            fee_pct: self.fee_pct,
            starting_capital_usdt: self.starting_capital_usdt,
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            fetch_retries: self.fetch_retries,
            history_len: self.history_len,
            notify_idle: self.notify_idle,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RawSettings::default().validate().unwrap();
        assert_eq!(settings.pair, Pair::new("BTC", "USDT"));
        assert_eq!(settings.loop_interval, Duration::from_secs(5));
        assert_eq!(settings.min_profit_pct, dec!(0.5));
        assert!(settings.telegram.is_none());
        assert!(settings.require_telegram().is_err());
    }

    #[test]
    fn test_toml_layer() {
        let toml = r#"
            telegram_token = "123:abc"
            telegram_chat_id = -1001234
            symbol = "ETH/USDT"
            trade_size_usdt = 250.5
            min_profit_pct = "0.3"
            notify_idle = false
        "#;
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        let settings = from_builder(builder).unwrap();

        assert_eq!(settings.require_telegram().unwrap().chat_id, -1001234);
        assert_eq!(settings.pair, Pair::new("ETH", "USDT"));
        assert_eq!(settings.trade_size_usdt, dec!(250.5));
        assert_eq!(settings.min_profit_pct, dec!(0.3));
        assert!(!settings.notify_idle);
        // untouched keys keep their defaults
        assert_eq!(settings.fee_pct, DEFAULT_FEE_PCT);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let check = |raw: RawSettings, field: &str| match raw.validate() {
            Err(SettingsError::Invalid { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected invalid {field}, got {other:?}"),
        };

        check(RawSettings { trade_size_usdt: dec!(0), ..Default::default() }, "trade_size_usdt");
        check(RawSettings { fee_pct: dec!(-0.1), ..Default::default() }, "fee_pct");
        check(RawSettings { min_profit_pct: dec!(-1), ..Default::default() }, "min_profit_pct");
        check(RawSettings { loop_interval_secs: 0, ..Default::default() }, "loop_interval_secs");
        check(RawSettings { symbol: "BTCUSDT".into(), ..Default::default() }, "symbol");
        check(RawSettings { history_len: 500, ..Default::default() }, "history_len");
        check(
            RawSettings { okx_base_url: "ftp://okx".into(), ..Default::default() },
            "okx_base_url",
        );
        check(
            RawSettings { telegram_token: Some("123:abc".into()), ..Default::default() },
            "telegram_chat_id",
        );
    }

    #[test]
    fn test_partial_credentials_are_rejected() {
        let raw = RawSettings {
            okx_api_key: Some("key".into()),
            okx_api_secret: Some("secret".into()),
            ..Default::default()
        };
        assert!(matches!(raw.validate(), Err(SettingsError::Invalid { field: "okx_api_key", .. })));

        let raw = RawSettings { kraken_api_secret: Some("secret".into()), ..Default::default() };
        assert!(matches!(
            raw.validate(),
            Err(SettingsError::Invalid { field: "kraken_api_key", .. })
        ));

        let raw = RawSettings {
            kraken_api_key: Some("key".into()),
            kraken_api_secret: Some("secret".into()),
            okx_api_key: Some("  ".into()),
            ..Default::default()
        };
        let settings = raw.validate().unwrap();
        assert!(settings.kraken.credentials.is_some());
        assert!(settings.okx.credentials.is_none());
    }

    // The environment is process-global; env-reading tests take this lock
    static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    struct EnvVars(&'static [(&'static str, &'static str)]);

    impl EnvVars {
        fn set(vars: &'static [(&'static str, &'static str)]) -> Self {
            for (name, value) in vars {
                std::env::set_var(name, value);
            }
            Self(vars)
        }
    }

    impl Drop for EnvVars {
        fn drop(&mut self) {
            for (name, _) in self.0 {
                std::env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_load_layers_legacy_and_prefixed_env() {
        let _lock = ENV_LOCK.lock();
        let _env = EnvVars::set(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-1001234"),
            ("OKX_API_KEY", "okx-key"),
            ("OKX_API_SECRET", "okx-secret"),
            ("OKX_PASSWORD", "okx-pass"),
            ("ARBX_TRADE_SIZE_USDT", "250"),
            ("ARBX_MIN_PROFIT_PCT", "0.3"),
            ("ARBX_TELEGRAM_CHAT_ID", "777"),
        ]);

        let settings = load(None).unwrap();
        let telegram = settings.require_telegram().unwrap();
        // legacy name fills the token, the prefixed name wins for the chat id
        assert_eq!(telegram.token, "123:abc");
        assert_eq!(telegram.chat_id, 777);

        let okx = settings.okx.credentials.as_ref().unwrap();
        assert_eq!(okx.key, "okx-key");
        assert_eq!(okx.passphrase.as_deref(), Some("okx-pass"));
        assert!(settings.kraken.credentials.is_none());

        assert_eq!(settings.trade_size_usdt, dec!(250));
        assert_eq!(settings.min_profit_pct, dec!(0.3));
        assert!(settings.notify_idle);
    }

    #[test]
    fn test_load_requires_explicit_config_file() {
        let _lock = ENV_LOCK.lock();

        let err = load(Some(Path::new("/nonexistent/arbx.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Load(_)), "{err:?}");
    }
}

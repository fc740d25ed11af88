use crate::domain::{Decimal, UserId};
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_ORDER_EXPIRY_MS: i64 = 3 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub commission_rate: Decimal,
    pub order_expiry_ms: i64,
    pub max_message_chars: usize,
    pub max_payment_info_chars: usize,
    pub cancel_policy: CancelPolicy,
    pub platform_account: Option<UserId>,
    pub expiry_sweep_interval_ms: u64,
}

/// Who may cancel a deal once it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Either participant, while pending or paid.
    Either,
    /// Either participant while pending; only the seller once the buyer has paid.
    SellerAfterPayment,
}

/// Immutable settings threaded into the exchange at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSettings {
    pub commission_rate: Decimal,
    pub order_expiry_ms: i64,
    pub max_message_chars: usize,
    pub max_payment_info_chars: usize,
    pub cancel_policy: CancelPolicy,
    pub platform_account: Option<UserId>,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        ExchangeSettings {
            commission_rate: Decimal::new(rust_decimal::Decimal::new(3, 2)),
            order_expiry_ms: DEFAULT_ORDER_EXPIRY_MS,
            max_message_chars: 2000,
            max_payment_info_chars: 1000,
            cancel_policy: CancelPolicy::Either,
            platform_account: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = ExchangeSettings::default();

        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let commission_rate = match env_map.get("COMMISSION_RATE") {
            Some(raw) => {
                let rate = Decimal::from_str_canonical(raw).map_err(|_| {
                    ConfigError::InvalidValue(
                        "COMMISSION_RATE".to_string(),
                        "must be a decimal".to_string(),
                    )
                })?;
                if rate.is_negative() || rate >= Decimal::one() {
                    return Err(ConfigError::InvalidValue(
                        "COMMISSION_RATE".to_string(),
                        format!("must be in [0, 1), got {}", rate),
                    ));
                }
                rate
            }
            None => defaults.commission_rate,
        };

        let order_expiry_ms = parse_or(
            &env_map,
            "ORDER_EXPIRY_MS",
            defaults.order_expiry_ms,
            "must be a valid i64",
        )?;
        if order_expiry_ms <= 0 {
            return Err(ConfigError::InvalidValue(
                "ORDER_EXPIRY_MS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let max_message_chars = parse_or(
            &env_map,
            "MAX_MESSAGE_CHARS",
            defaults.max_message_chars,
            "must be a valid usize",
        )?;

        let max_payment_info_chars = parse_or(
            &env_map,
            "MAX_PAYMENT_INFO_CHARS",
            defaults.max_payment_info_chars,
            "must be a valid usize",
        )?;

        let cancel_policy = match env_map
            .get("TX_CANCEL_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("either")
        {
            "either" => CancelPolicy::Either,
            "seller-after-payment" => CancelPolicy::SellerAfterPayment,
            other => {
                return Err(ConfigError::InvalidValue(
                    "TX_CANCEL_POLICY".to_string(),
                    format!("must be either or seller-after-payment, got {}", other),
                ))
            }
        };

        let platform_account = env_map
            .get("PLATFORM_ACCOUNT_ID")
            .map(|s| {
                s.parse::<i64>().map(UserId::new).map_err(|_| {
                    ConfigError::InvalidValue(
                        "PLATFORM_ACCOUNT_ID".to_string(),
                        "must be a valid i64".to_string(),
                    )
                })
            })
            .transpose()?;

        let expiry_sweep_interval_ms = parse_or(
            &env_map,
            "EXPIRY_SWEEP_INTERVAL_MS",
            60_000u64,
            "must be a valid u64",
        )?;

        Ok(Config {
            port,
            database_path,
            commission_rate,
            order_expiry_ms,
            max_message_chars,
            max_payment_info_chars,
            cancel_policy,
            platform_account,
            expiry_sweep_interval_ms,
        })
    }

    pub fn exchange_settings(&self) -> ExchangeSettings {
        ExchangeSettings {
            commission_rate: self.commission_rate,
            order_expiry_ms: self.order_expiry_ms,
            max_message_chars: self.max_message_chars,
            max_payment_info_chars: self.max_payment_info_chars,
            cancel_policy: self.cancel_policy,
            platform_account: self.platform_account,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expectation: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expectation.to_string())),
        None => Ok(default),
    }
}

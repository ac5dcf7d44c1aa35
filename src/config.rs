//! Campaign configuration, built from `OUTREACH_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const SECS_PER_DAY: u64 = 86_400;

// ── Classifier rates ────────────────────────────────────────────────

/// The enumerated classifier rate options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateOption {
    BounceRate,
    UnsubscribeRate,
    ReplyRate,
    OooRate,
    InterestRate,
}

impl RateOption {
    pub const ALL: [RateOption; 5] = [
        RateOption::BounceRate,
        RateOption::UnsubscribeRate,
        RateOption::ReplyRate,
        RateOption::OooRate,
        RateOption::InterestRate,
    ];

    /// Option name as used in config keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BounceRate => "bounce_rate",
            Self::UnsubscribeRate => "unsubscribe_rate",
            Self::ReplyRate => "reply_rate",
            Self::OooRate => "ooo_rate",
            Self::InterestRate => "interest_rate",
        }
    }

    fn env_key(&self) -> String {
        format!("OUTREACH_{}", self.as_str().to_uppercase())
    }
}

impl std::fmt::Display for RateOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probabilities driving the simulated reply behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRates {
    pub bounce_rate: f64,
    pub unsubscribe_rate: f64,
    pub reply_rate: f64,
    /// Share of replies that are out-of-office auto-responses.
    pub ooo_rate: f64,
    /// Share of non-OOO replies that express interest.
    pub interest_rate: f64,
}

impl Default for ClassifierRates {
    fn default() -> Self {
        Self {
            bounce_rate: 0.05,
            unsubscribe_rate: 0.03,
            reply_rate: 0.10,
            ooo_rate: 0.30,
            interest_rate: 0.40,
        }
    }
}

impl ClassifierRates {
    pub fn get(&self, option: RateOption) -> f64 {
        match option {
            RateOption::BounceRate => self.bounce_rate,
            RateOption::UnsubscribeRate => self.unsubscribe_rate,
            RateOption::ReplyRate => self.reply_rate,
            RateOption::OooRate => self.ooo_rate,
            RateOption::InterestRate => self.interest_rate,
        }
    }

    /// Set a single rate, rejecting values outside [0, 1].
    pub fn set(&mut self, option: RateOption, value: f64) -> Result<(), ConfigError> {
        check_probability(option.as_str(), value)?;
        match option {
            RateOption::BounceRate => self.bounce_rate = value,
            RateOption::UnsubscribeRate => self.unsubscribe_rate = value,
            RateOption::ReplyRate => self.reply_rate = value,
            RateOption::OooRate => self.ooo_rate = value,
            RateOption::InterestRate => self.interest_rate = value,
        }
        Ok(())
    }

    /// Builder-style variant of [`ClassifierRates::set`].
    pub fn with(mut self, option: RateOption, value: f64) -> Result<Self, ConfigError> {
        self.set(option, value)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for option in RateOption::ALL {
            check_probability(option.as_str(), self.get(option))?;
        }
        Ok(())
    }
}

pub(crate) fn check_probability(key: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value} is not a probability in [0, 1]"),
        });
    }
    Ok(())
}

// ── Capabilities ────────────────────────────────────────────────────

/// How the campaign timeline is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Compressed timeline, every step runs back to back.
    Demo,
    /// Timer-driven stage sends and periodic response checks.
    Scheduled,
}

/// Which notifier implementation to wire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    Log,
    None,
}

/// Which enrichment implementation to wire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentKind {
    Simulated,
    None,
}

impl FromStr for RunMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "scheduled" => Ok(Self::Scheduled),
            _ => Err(()),
        }
    }
}

impl FromStr for NotifierKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

impl FromStr for EnrichmentKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" => Ok(Self::Simulated),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

// ── Campaign config ─────────────────────────────────────────────────

/// Full campaign configuration.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// Comma-separated industry keywords, e.g. "manufacturing, construction".
    pub industry_filter: String,
    pub region: String,
    /// Target roles; empty means every role.
    pub role_filter: Vec<String>,
    /// Days after launch before the followup stage.
    pub followup_delay_days: u32,
    /// Days after launch before the personalized stage.
    pub personalized_delay_days: u32,
    /// Days after launch when the campaign is archived.
    pub horizon_days: u32,
    pub response_check_interval: Duration,
    /// Length of one campaign "day". Shrink it to compress a scheduled run.
    pub day_length: Duration,
    pub rates: ClassifierRates,
    /// Probability that a single simulated send attempt fails.
    pub send_failure_rate: f64,
    pub max_booking_attempts: u32,
    /// Seed for every simulated collaborator. `None` uses entropy.
    pub seed: Option<u64>,
    pub mode: RunMode,
    pub notifier: NotifierKind,
    pub enrichment: EnrichmentKind,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            industry_filter: "manufacturing, construction".to_string(),
            region: "Australia".to_string(),
            role_filter: vec![
                "CFO".to_string(),
                "Head of Digital Transformation".to_string(),
                "Digital Transformation Lead".to_string(),
            ],
            followup_delay_days: 3,
            personalized_delay_days: 4,
            horizon_days: 7,
            response_check_interval: Duration::from_secs(3600), // 1 hour
            day_length: Duration::from_secs(SECS_PER_DAY),
            rates: ClassifierRates::default(),
            send_failure_rate: 0.0,
            max_booking_attempts: 3,
            seed: None,
            mode: RunMode::Demo,
            notifier: NotifierKind::Log,
            enrichment: EnrichmentKind::Simulated,
        }
    }
}

impl CampaignConfig {
    /// Build config from the process environment and validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup, falling back to defaults
    /// for absent keys. Present but unparsable values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let industry_filter = lookup("OUTREACH_INDUSTRIES").unwrap_or(defaults.industry_filter);
        let region = lookup("OUTREACH_REGION").unwrap_or(defaults.region);
        let role_filter = match lookup("OUTREACH_ROLES") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.role_filter,
        };

        let mut rates = defaults.rates;
        for option in RateOption::ALL {
            let key = option.env_key();
            if let Some(value) = parse_key::<f64>(&lookup, &key)? {
                rates.set(option, value).map_err(|e| match e {
                    ConfigError::InvalidValue { message, .. } => {
                        ConfigError::InvalidValue { key, message }
                    }
                    other => other,
                })?;
            }
        }

        let config = Self {
            industry_filter,
            region,
            role_filter,
            followup_delay_days: parse_key(&lookup, "OUTREACH_FOLLOWUP_DAYS")?
                .unwrap_or(defaults.followup_delay_days),
            personalized_delay_days: parse_key(&lookup, "OUTREACH_PERSONALIZED_DAYS")?
                .unwrap_or(defaults.personalized_delay_days),
            horizon_days: parse_key(&lookup, "OUTREACH_HORIZON_DAYS")?
                .unwrap_or(defaults.horizon_days),
            response_check_interval: parse_key(&lookup, "OUTREACH_CHECK_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.response_check_interval),
            day_length: parse_key(&lookup, "OUTREACH_DAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.day_length),
            rates,
            send_failure_rate: parse_key(&lookup, "OUTREACH_SEND_FAILURE_RATE")?
                .unwrap_or(defaults.send_failure_rate),
            max_booking_attempts: parse_key(&lookup, "OUTREACH_MAX_BOOKING_ATTEMPTS")?
                .unwrap_or(defaults.max_booking_attempts),
            seed: parse_key(&lookup, "OUTREACH_SEED")?,
            mode: parse_key(&lookup, "OUTREACH_MODE")?.unwrap_or(defaults.mode),
            notifier: parse_key(&lookup, "OUTREACH_NOTIFIER")?.unwrap_or(defaults.notifier),
            enrichment: parse_key(&lookup, "OUTREACH_ENRICHMENT")?
                .unwrap_or(defaults.enrichment),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject misconfiguration that would otherwise surface mid-campaign.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rates.validate()?;
        check_probability("send_failure_rate", self.send_failure_rate)?;

        if self.followup_delay_days == 0 {
            return Err(invalid("followup_delay_days", "must be at least 1 day"));
        }
        if self.personalized_delay_days <= self.followup_delay_days {
            return Err(invalid(
                "personalized_delay_days",
                "must be later than followup_delay_days",
            ));
        }
        // Finish must not be queued at the same instant as the personalized send.
        if self.horizon_days <= self.personalized_delay_days {
            return Err(invalid(
                "horizon_days",
                "must be later than personalized_delay_days",
            ));
        }
        if self.response_check_interval.is_zero() {
            return Err(invalid("response_check_interval", "must be non-zero"));
        }
        if self.day_length.is_zero() {
            return Err(invalid("day_length", "must be non-zero"));
        }
        if self.max_booking_attempts == 0 {
            return Err(invalid("max_booking_attempts", "must be at least 1"));
        }
        Ok(())
    }

    /// Wall-clock offsets from launch for the scheduled runner.
    pub fn schedule(&self) -> crate::campaign::runner::Schedule {
        crate::campaign::runner::Schedule {
            followup_at: self.day_length * self.followup_delay_days,
            personalized_at: self.day_length * self.personalized_delay_days,
            horizon: self.day_length * self.horizon_days,
            check_interval: self.response_check_interval,
        }
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn parse_key<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| ConfigError::Parse {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = CampaignConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rates.bounce_rate, 0.05);
        assert_eq!(config.rates.interest_rate, 0.40);
        assert_eq!(config.mode, RunMode::Demo);
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = CampaignConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.industry_filter, "manufacturing, construction");
        assert_eq!(config.role_filter.len(), 3);
        assert_eq!(config.followup_delay_days, 3);
        assert!(config.seed.is_none());
    }

    #[test]
    fn lookup_overrides_values() {
        let config = CampaignConfig::from_lookup(lookup_from(&[
            ("OUTREACH_ROLES", "CFO, , CTO"),
            ("OUTREACH_REPLY_RATE", "1.0"),
            ("OUTREACH_SEED", "42"),
            ("OUTREACH_MODE", "Scheduled"),
            ("OUTREACH_NOTIFIER", "none"),
            ("OUTREACH_CHECK_INTERVAL_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.role_filter, vec!["CFO", "CTO"]);
        assert_eq!(config.rates.reply_rate, 1.0);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.mode, RunMode::Scheduled);
        assert_eq!(config.notifier, NotifierKind::None);
        assert_eq!(config.response_check_interval, Duration::from_secs(60));
    }

    #[test]
    fn rate_out_of_range_is_rejected() {
        let err = CampaignConfig::from_lookup(lookup_from(&[("OUTREACH_BOUNCE_RATE", "1.5")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "OUTREACH_BOUNCE_RATE"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn unparsable_value_is_rejected() {
        let err = CampaignConfig::from_lookup(lookup_from(&[("OUTREACH_FOLLOWUP_DAYS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = CampaignConfig::from_lookup(lookup_from(&[("OUTREACH_MODE", "turbo")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn inconsistent_delays_are_rejected() {
        let config = CampaignConfig {
            followup_delay_days: 4,
            personalized_delay_days: 4,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CampaignConfig {
            horizon_days: 2,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn horizon_must_follow_personalized_stage() {
        let config = CampaignConfig {
            personalized_delay_days: 7,
            horizon_days: 7,
            ..CampaignConfig::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "horizon_days"),
            other => panic!("Expected InvalidValue for horizon_days, got {:?}", other),
        }

        let err = CampaignConfig::from_lookup(lookup_from(&[
            ("OUTREACH_PERSONALIZED_DAYS", "5"),
            ("OUTREACH_HORIZON_DAYS", "5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let config = CampaignConfig {
            personalized_delay_days: 7,
            horizon_days: 8,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rates_set_and_get() {
        let mut rates = ClassifierRates::default();
        rates.set(RateOption::OooRate, 0.0).unwrap();
        assert_eq!(rates.get(RateOption::OooRate), 0.0);
        assert!(rates.set(RateOption::ReplyRate, -0.1).is_err());
        assert!(rates.set(RateOption::ReplyRate, f64::NAN).is_err());
        // rejected value leaves the previous one in place
        assert_eq!(rates.reply_rate, 0.10);
    }

    #[test]
    fn schedule_scales_with_day_length() {
        let config = CampaignConfig {
            day_length: Duration::from_secs(10),
            ..CampaignConfig::default()
        };
        let schedule = config.schedule();
        assert_eq!(schedule.followup_at, Duration::from_secs(30));
        assert_eq!(schedule.personalized_at, Duration::from_secs(40));
        assert_eq!(schedule.horizon, Duration::from_secs(70));
    }
}

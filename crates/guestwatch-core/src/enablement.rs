//! On/off switch for the whole run.
//!
//! The raw value comes from the environment (`GUESTWATCH_ENABLED`) or the
//! `--enabled` flag. Malformed values fail open: a typo must never silence
//! alerting.

pub const ENABLED_ENV: &str = "GUESTWATCH_ENABLED";

const ON_VALUES: [&str; 4] = ["true", "1", "yes", "on"];
const OFF_VALUES: [&str; 4] = ["false", "0", "no", "off"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    /// Absent or empty.
    Default,
    On,
    Off,
    Unrecognized(String),
}

impl Flag {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Flag::Default;
        };
        let lower = raw.to_ascii_lowercase();
        if ON_VALUES.contains(&lower.as_str()) {
            Flag::On
        } else if OFF_VALUES.contains(&lower.as_str()) {
            Flag::Off
        } else {
            Flag::Unrecognized(raw.to_string())
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Flag::Off)
    }
}

/// Resolve the enablement flag, warning on values outside the known sets.
pub fn resolve_enabled(raw: Option<&str>) -> bool {
    let flag = Flag::parse(raw);
    if let Flag::Unrecognized(value) = &flag {
        tracing::warn!(
            value = %value,
            "unrecognized {ENABLED_ENV} value, treating as enabled"
        );
    }
    flag.is_enabled()
}

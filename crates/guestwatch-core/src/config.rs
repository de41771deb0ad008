use crate::error::{GuestwatchError, Result};
use crate::paths;
use chrono::Duration;
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

pub const EMAILS_ENV: &str = "GUESTWATCH_EMAILS";
pub const PHONES_ENV: &str = "GUESTWATCH_PHONES";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// WatchList
// ---------------------------------------------------------------------------

/// Products (and optionally collections) whose orders must carry a guest count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchList {
    #[serde(default)]
    pub product_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<CollectionRule>,
}

/// Orders with an item from `collection_id` and at least
/// `min_total_quantity` units overall also need a guest count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRule {
    pub collection_id: String,
    #[serde(default = "default_min_total_quantity")]
    pub min_total_quantity: i64,
}

fn default_min_total_quantity() -> i64 {
    3
}

impl WatchList {
    pub fn new<I, S>(product_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            product_ids: product_ids.into_iter().map(Into::into).collect(),
            collections: Vec::new(),
        }
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.product_ids.iter().any(|p| p == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.product_ids.is_empty() && self.collections.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipients {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
}

impl Recipients {
    /// Apply `GUESTWATCH_EMAILS` / `GUESTWATCH_PHONES` overrides (comma
    /// separated) and normalize phone numbers.
    pub fn resolve(&self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let emails = lookup(EMAILS_ENV)
            .map(|v| split_list(&v))
            .unwrap_or_else(|| self.emails.clone());
        let phones = lookup(PHONES_ENV)
            .map(|v| split_list(&v))
            .unwrap_or_else(|| self.phones.clone());
        Self {
            emails: emails.into_iter().map(|e| e.trim().to_string()).collect(),
            phones: phones.iter().map(|p| normalize_phone(p)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Numbers without a country code are assumed to be US numbers.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+1{trimmed}")
    }
}

static PHONE_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn phone_re() -> &'static Regex {
    PHONE_RE.get_or_init(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").unwrap())
}

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

// ---------------------------------------------------------------------------
// PollConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Length of the first window, used when no state exists yet.
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
    /// How far each window reaches back before the last successful check.
    #[serde(default = "default_overlap_minutes")]
    pub overlap_minutes: u32,
}

fn default_window_minutes() -> u32 {
    15
}

fn default_overlap_minutes() -> u32 {
    5
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            overlap_minutes: default_overlap_minutes(),
        }
    }
}

impl PollConfig {
    pub fn window(&self) -> Duration {
        Duration::minutes(i64::from(self.window_minutes))
    }

    pub fn overlap(&self) -> Duration {
        Duration::minutes(i64::from(self.overlap_minutes))
    }
}

// ---------------------------------------------------------------------------
// DisplayConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// IANA zone used to render order times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Printed after the rendered time, verbatim.
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_label() -> String {
    "EST".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            label: default_label(),
        }
    }
}

impl DisplayConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| GuestwatchError::InvalidTimezone(self.timezone.clone()))
    }
}

// ---------------------------------------------------------------------------
// Transport endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommerceConfig {
    #[serde(default = "default_commerce_url")]
    pub api_base_url: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_commerce_url() -> String {
    "https://api.commerce7.com/v1".to_string()
}

fn default_page_limit() -> u32 {
    50
}

fn default_max_pages() -> u32 {
    20
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_commerce_url(),
            page_limit: default_page_limit(),
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default = "default_sms_url")]
    pub api_base_url: String,
}

fn default_sms_url() -> String {
    "https://api.twilio.com".to_string()
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_sms_url(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub watch: WatchList,
    #[serde(default)]
    pub recipients: Recipients,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub commerce: CommerceConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub sms: SmsConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchList::default(),
            recipients: Recipients::default(),
            poll: PollConfig::default(),
            display: DisplayConfig::default(),
            commerce: CommerceConfig::default(),
            smtp: SmtpConfig::default(),
            sms: SmsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(GuestwatchError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check the config against the recipients that will actually be used
    /// (after environment overrides).
    pub fn validate(&self, recipients: &Recipients) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level, message: String| warnings.push(ConfigWarning { level, message });

        if self.watch.is_empty() {
            push(
                WarnLevel::Error,
                "watch.product_ids is empty: no order can ever alert".to_string(),
            );
        }

        if recipients.is_empty() {
            push(
                WarnLevel::Error,
                "no recipients configured (recipients.emails / recipients.phones)".to_string(),
            );
        }

        for email in &recipients.emails {
            if !email_re().is_match(email) {
                push(
                    WarnLevel::Warning,
                    format!("recipient email '{email}' does not look like an address"),
                );
            }
        }

        for phone in &recipients.phones {
            if !phone_re().is_match(phone) {
                push(
                    WarnLevel::Warning,
                    format!("recipient phone '{phone}' is not in E.164 form"),
                );
            }
        }

        if self.poll.window_minutes == 0 {
            push(
                WarnLevel::Error,
                "poll.window_minutes must be greater than zero".to_string(),
            );
        }

        if self.display.tz().is_err() {
            push(
                WarnLevel::Error,
                format!("display.timezone '{}' is not a known zone", self.display.timezone),
            );
        }

        for rule in &self.watch.collections {
            if rule.min_total_quantity < 1 {
                push(
                    WarnLevel::Warning,
                    format!(
                        "collection '{}' has min_total_quantity={} (every order will match)",
                        rule.collection_id, rule.min_total_quantity
                    ),
                );
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

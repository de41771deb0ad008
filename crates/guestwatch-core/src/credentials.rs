//! Secrets read from the environment once at startup.
//!
//! Nothing here is ever written to disk. Missing values are collected and
//! reported together so one run surfaces every gap.

use crate::config::Recipients;
use crate::error::{GuestwatchError, Result};

#[derive(Clone)]
pub struct CommerceCredentials {
    pub app_id: String,
    pub api_key: String,
    pub tenant_id: String,
}

#[derive(Clone)]
pub struct SmsCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Clone)]
pub struct SmtpCredentials {
    pub sender: String,
    pub password: String,
}

/// Everything a run needs. SMS and SMTP credentials are only present when
/// their channel has recipients.
#[derive(Clone)]
pub struct Credentials {
    pub commerce: CommerceCredentials,
    pub sms: Option<SmsCredentials>,
    pub smtp: Option<SmtpCredentials>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.commerce.tenant_id)
            .field("sms", &self.sms.is_some())
            .field("smtp", &self.smtp.is_some())
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn from_env(recipients: &Recipients) -> Result<Self> {
        Self::from_lookup(recipients, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        recipients: &Recipients,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut missing = Vec::new();
        let mut get = |key: &str| match lookup(key).filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None => {
                missing.push(format!("{key} not set"));
                String::new()
            }
        };

        let commerce = CommerceCredentials {
            app_id: get("C7_APP_ID"),
            api_key: get("C7_API_KEY"),
            tenant_id: get("C7_TENANT_ID"),
        };

        let sms = (!recipients.phones.is_empty()).then(|| SmsCredentials {
            account_sid: get("TWILIO_ACCOUNT_SID"),
            auth_token: get("TWILIO_AUTH_TOKEN"),
            from_number: get("TWILIO_PHONE_NUMBER"),
        });

        let smtp = (!recipients.emails.is_empty()).then(|| SmtpCredentials {
            sender: get("SMTP_EMAIL"),
            password: get("SMTP_PASSWORD"),
        });

        if !missing.is_empty() {
            return Err(GuestwatchError::Config(missing));
        }

        Ok(Self { commerce, sms, smtp })
    }
}

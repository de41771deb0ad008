use crate::config::SmsConfig;
use crate::credentials::SmsCredentials;
use crate::error::{GuestwatchError, Result};
use crate::notify::{Channel, OutboundMessage, Transport};
use reqwest::blocking::Client;
use serde::Deserialize;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TwilioError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Twilio Messages API, one POST per phone number.
pub struct TwilioSms {
    http: Client,
    messages_url: String,
    credentials: SmsCredentials,
}

impl TwilioSms {
    pub fn new(config: &SmsConfig, credentials: SmsCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GuestwatchError::Delivery(format!("building HTTP client: {e}")))?;
        let messages_url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base_url.trim_end_matches('/'),
            credentials.account_sid
        );
        Ok(Self {
            http,
            messages_url,
            credentials,
        })
    }
}

impl Transport for TwilioSms {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn send(&self, recipient: &str, message: &OutboundMessage) -> Result<()> {
        let form = [
            ("To", recipient),
            ("From", self.credentials.from_number.as_str()),
            ("Body", message.body.as_str()),
        ];
        let response = self
            .http
            .post(&self.messages_url)
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(&form)
            .send()
            .map_err(|e| GuestwatchError::Delivery(format!("sms: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        let detail = match serde_json::from_str::<TwilioError>(&body) {
            Ok(TwilioError {
                code: Some(code),
                message: Some(msg),
            }) => format!("{msg} (code {code})"),
            _ => body.trim().to_string(),
        };
        Err(GuestwatchError::Delivery(format!("sms {status}: {detail}")))
    }
}

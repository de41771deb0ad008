use crate::alert::AlertEvent;
use crate::config::Recipients;
use crate::error::Result;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Channel / Transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Sms => write!(f, "sms"),
        }
    }
}

/// A rendered message for one channel. `subject` is unused by SMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub subject: Option<String>,
    pub body: String,
}

impl OutboundMessage {
    pub fn for_channel(alert: &AlertEvent, channel: Channel) -> Self {
        match channel {
            Channel::Email => Self {
                subject: Some(alert.email_subject()),
                body: alert.email_body(),
            },
            Channel::Sms => Self {
                subject: None,
                body: alert.sms_body(),
            },
        }
    }
}

/// Delivers a message to a single recipient. One send, no retries.
pub trait Transport {
    fn channel(&self) -> Channel;
    fn send(&self, recipient: &str, message: &OutboundMessage) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn channel(&self) -> Channel {
        (**self).channel()
    }

    fn send(&self, recipient: &str, message: &OutboundMessage) -> Result<()> {
        (**self).send(recipient, message)
    }
}

/// The transports available for this run. A channel with recipients but no
/// transport records a failed attempt per recipient.
#[derive(Clone, Copy, Default)]
pub struct Transports<'a> {
    pub email: Option<&'a dyn Transport>,
    pub sms: Option<&'a dyn Transport>,
}

// ---------------------------------------------------------------------------
// DeliveryReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAttempt {
    pub order_id: String,
    pub channel: Channel,
    pub recipient: String,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

impl DeliveryAttempt {
    pub fn delivered(&self) -> bool {
        self.outcome == DeliveryOutcome::Delivered
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub attempts: Vec<DeliveryAttempt>,
}

impl DeliveryReport {
    pub fn delivered_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.delivered()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.attempts.len() - self.delivered_count()
    }

    pub fn any_delivered(&self) -> bool {
        self.attempts.iter().any(DeliveryAttempt::delivered)
    }

    pub fn extend(&mut self, other: DeliveryReport) {
        self.attempts.extend(other.attempts);
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Send `alert` to every recipient on every channel. Each attempt stands
/// alone: a failure is recorded and the loop moves on.
pub fn notify(
    alert: &AlertEvent,
    recipients: &Recipients,
    transports: Transports<'_>,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    let channels = [
        (Channel::Email, &recipients.emails, transports.email),
        (Channel::Sms, &recipients.phones, transports.sms),
    ];

    for (channel, list, transport) in channels {
        if list.is_empty() {
            continue;
        }
        if let Some(t) = transport {
            debug_assert_eq!(t.channel(), channel, "transport wired to the wrong channel");
        }
        let message = OutboundMessage::for_channel(alert, channel);
        for recipient in list {
            let outcome = match transport {
                Some(t) => match t.send(recipient, &message) {
                    Ok(()) => {
                        tracing::info!(
                            order = %alert.order_number,
                            %channel,
                            recipient = %recipient,
                            "alert delivered"
                        );
                        DeliveryOutcome::Delivered
                    }
                    Err(e) => {
                        tracing::warn!(
                            order = %alert.order_number,
                            %channel,
                            recipient = %recipient,
                            error = %e,
                            "alert delivery failed"
                        );
                        DeliveryOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                },
                None => {
                    tracing::warn!(%channel, recipient = %recipient, "no transport configured");
                    DeliveryOutcome::Failed {
                        error: format!("no {channel} transport configured"),
                    }
                }
            };
            report.attempts.push(DeliveryAttempt {
                order_id: alert.order_id.clone(),
                channel,
                recipient: recipient.clone(),
                outcome,
            });
        }
    }

    report
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::GuestwatchError;
    use std::cell::RefCell;

    /// Records every send; fails for recipients listed in `failing`.
    pub struct RecordingTransport {
        pub channel: Channel,
        pub failing: Vec<String>,
        pub sent: RefCell<Vec<(String, OutboundMessage)>>,
    }

    impl RecordingTransport {
        pub fn new(channel: Channel) -> Self {
            Self {
                channel,
                failing: Vec::new(),
                sent: RefCell::new(Vec::new()),
            }
        }

        pub fn failing_for(mut self, recipient: &str) -> Self {
            self.failing.push(recipient.to_string());
            self
        }

        pub fn sent_to(&self) -> Vec<String> {
            self.sent.borrow().iter().map(|(r, _)| r.clone()).collect()
        }
    }

    impl Transport for RecordingTransport {
        fn channel(&self) -> Channel {
            self.channel
        }

        fn send(&self, recipient: &str, message: &OutboundMessage) -> Result<()> {
            if self.failing.iter().any(|f| f == recipient) {
                return Err(GuestwatchError::Delivery(format!("{recipient} rejected")));
            }
            self.sent
                .borrow_mut()
                .push((recipient.to_string(), message.clone()));
            Ok(())
        }
    }
}

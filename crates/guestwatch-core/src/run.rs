//! One polling pass: gate → fetch → evaluate → dedupe → notify → persist.
//!
//! State is read once at the start and written once at the end. A fetch
//! failure returns before anything is written, so the next run simply sees a
//! wider window. A crash after notifying but before the final write can
//! repeat those alerts on the next run; there is no pending/committed split.

use crate::alert::AlertEvent;
use crate::config::{Config, Recipients};
use crate::dedupe::filter_new;
use crate::error::Result;
use crate::evaluate::{evaluate, qualifies};
use crate::notify::{notify, DeliveryReport, Transport, Transports};
use crate::order::Order;
use crate::source::{OrderSource, Window};
use crate::state::{RunRecord, RunState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// External services a run talks to. Built only after the gate passes, so a
/// disabled run never needs credentials.
pub struct Collaborators<'a> {
    pub source: Box<dyn OrderSource + 'a>,
    pub email: Option<Box<dyn Transport + 'a>>,
    pub sms: Option<Box<dyn Transport + 'a>>,
}

impl Collaborators<'_> {
    fn transports(&self) -> Transports<'_> {
        Transports {
            email: self.email.as_deref(),
            sms: self.sms.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Disabled,
    Completed(RunSummary),
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub window: Window,
    pub dry_run: bool,
    pub fetched: usize,
    pub qualifying: usize,
    pub already_alerted: usize,
    pub alerts: Vec<AlertEvent>,
    /// Orders with at least one successful delivery; recorded as alerted.
    pub notified: Vec<String>,
    /// Orders whose every delivery failed; left unrecorded for a retry.
    pub undelivered: Vec<String>,
    pub deliveries: DeliveryReport,
}

impl RunSummary {
    /// Latest instant the next run may start from without losing an
    /// undelivered order: the earliest undelivered timestamp, or `now`.
    /// An undelivered order with no timestamp keeps the previous checkpoint.
    fn retry_checkpoint(&self, previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        self.alerts
            .iter()
            .filter(|a| self.undelivered.contains(&a.order_id))
            .map(|a| a.occurred_at.unwrap_or(previous))
            .fold(now, std::cmp::min)
    }

    fn record(&self, started_at: DateTime<Utc>) -> RunRecord {
        RunRecord {
            started_at,
            window_start: self.window.start,
            fetched: self.fetched,
            qualifying: self.qualifying,
            new: self.alerts.len(),
            notified: self.notified.len(),
            deliveries_ok: self.deliveries.delivered_count(),
            deliveries_failed: self.deliveries.failed_count(),
        }
    }
}

pub struct RunContext<'a> {
    pub root: &'a Path,
    pub config: &'a Config,
    pub recipients: &'a Recipients,
    pub now: DateTime<Utc>,
    pub dry_run: bool,
}

impl RunContext<'_> {
    /// Full run including the gate check and state persistence. `enabled` is
    /// the resolved gate (see [`crate::enablement::resolve_enabled`]).
    pub fn run<'c>(
        &self,
        enabled: bool,
        connect: impl FnOnce() -> Result<Collaborators<'c>>,
    ) -> Result<RunOutcome> {
        if !enabled {
            tracing::info!("guest count alerts are disabled, skipping run");
            return Ok(RunOutcome::Disabled);
        }

        let collaborators = connect()?;
        let mut state = RunState::load_or_init(self.root, self.now, self.config.poll.window())?;
        let summary = self.execute(&mut state, &collaborators)?;

        if !self.dry_run {
            state.save(self.root)?;
            tracing::info!(
                notified = summary.notified.len(),
                alerted_total = state.alerted_order_ids.len(),
                "run state saved"
            );
        }
        Ok(RunOutcome::Completed(summary))
    }

    /// Everything between the gate and the final write. Mutates `state` in
    /// memory only, and not at all on a dry run.
    pub fn execute(
        &self,
        state: &mut RunState,
        collaborators: &Collaborators<'_>,
    ) -> Result<RunSummary> {
        let watch = &self.config.watch;
        let window = Window::since(state.last_checked_at, self.config.poll.overlap(), self.now);

        let fetched = collaborators.source.fetch_orders(&window, watch)?;

        let qualifying: Vec<Order> = fetched
            .iter()
            .filter(|o| qualifies(o, watch))
            .cloned()
            .collect();
        let qualifying_count = qualifying.len();

        let fresh = filter_new(qualifying, &state.alerted_order_ids);
        let already_alerted = qualifying_count - fresh.len();
        if already_alerted > 0 {
            tracing::debug!(already_alerted, "skipping orders that were already alerted");
        }

        let alerts = fresh
            .iter()
            .filter_map(|o| evaluate(o, watch).map(|f| AlertEvent::new(o, f, &self.config.display)))
            .collect::<Result<Vec<_>>>()?;

        for alert in &alerts {
            tracing::warn!(
                order = %alert.order_number,
                associate = %alert.associate_name,
                kind = %alert.kind,
                "order is missing a guest count"
            );
        }

        let mut summary = RunSummary {
            window,
            dry_run: self.dry_run,
            fetched: fetched.len(),
            qualifying: qualifying_count,
            already_alerted,
            alerts,
            notified: Vec::new(),
            undelivered: Vec::new(),
            deliveries: DeliveryReport::default(),
        };

        if self.dry_run {
            tracing::info!(would_alert = summary.alerts.len(), "dry run, nothing sent");
            return Ok(summary);
        }

        let transports = collaborators.transports();
        for alert in &summary.alerts {
            let report = notify(alert, self.recipients, transports);
            if report.any_delivered() {
                summary.notified.push(alert.order_id.clone());
            } else {
                tracing::error!(order = %alert.order_number, "no alert delivery succeeded");
                summary.undelivered.push(alert.order_id.clone());
            }
            summary.deliveries.extend(report);
        }

        state.mark_alerted(summary.notified.iter().cloned());
        let checked_through = summary.retry_checkpoint(state.last_checked_at, self.now);
        if checked_through < self.now {
            tracing::warn!(
                undelivered = summary.undelivered.len(),
                checked_through = %checked_through,
                "holding the checkpoint back so undelivered orders are fetched again"
            );
        }
        state.complete_run(checked_through, summary.record(self.now));

        tracing::info!(
            fetched = summary.fetched,
            qualifying = summary.qualifying,
            new = summary.alerts.len(),
            notified = summary.notified.len(),
            "check complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchList;
    use crate::error::GuestwatchError;
    use crate::notify::testing::RecordingTransport;
    use crate::notify::Channel;
    use crate::paths;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use std::cell::Cell;
    use tempfile::TempDir;

    const TASTING: &str = "3ecdff78-cc2a-495c-a795-ec651e04025e";

    /// Serves a fixed order list, honouring the requested window.
    struct FakeSource {
        orders: Vec<Order>,
        fail: bool,
        calls: Cell<usize>,
    }

    impl FakeSource {
        fn new(orders: Vec<Order>) -> Self {
            Self {
                orders,
                fail: false,
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }
    }

    impl OrderSource for FakeSource {
        fn fetch_orders(&self, window: &Window, _watch: &WatchList) -> Result<Vec<Order>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(GuestwatchError::Fetch("connection refused".to_string()));
            }
            Ok(self
                .orders
                .iter()
                .filter(|o| o.created_at().is_some_and(|ts| window.contains(ts)))
                .cloned()
                .collect())
        }
    }

    fn jane_doe() -> Order {
        serde_json::from_value(json!({
            "id": "c7-42632",
            "orderNumber": 42632,
            "orderPaidDate": "2025-09-04T23:27:00Z",
            "totalAmount": 15000,
            "customer": {"name": "Jane Doe"},
            "salesAssociate": {"name": "Alex Rivera"},
            "items": [{"productId": TASTING, "productTitle": "Estate Tasting"}]
        }))
        .unwrap()
    }

    fn counted_order() -> Order {
        serde_json::from_value(json!({
            "id": "c7-42633",
            "orderNumber": 42633,
            "orderPaidDate": "2025-09-04T23:20:00Z",
            "guestCount": 4,
            "items": [{"productId": TASTING}]
        }))
        .unwrap()
    }

    fn config() -> Config {
        Config {
            watch: WatchList::new([TASTING]),
            ..Config::default()
        }
    }

    fn recipients(emails: &[&str], phones: &[&str]) -> Recipients {
        Recipients {
            emails: emails.iter().map(|s| s.to_string()).collect(),
            phones: phones.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn first_run_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 4, 23, 30, 0).unwrap()
    }

    fn connect<'a>(
        source: &'a FakeSource,
        email: &'a RecordingTransport,
        sms: &'a RecordingTransport,
    ) -> impl FnOnce() -> Result<Collaborators<'a>> {
        move || {
            Ok(Collaborators {
                source: Box::new(source),
                email: Some(Box::new(email)),
                sms: Some(Box::new(sms)),
            })
        }
    }

    fn completed(outcome: RunOutcome) -> RunSummary {
        match outcome {
            RunOutcome::Completed(summary) => summary,
            RunOutcome::Disabled => panic!("expected a completed run"),
        }
    }

    #[test]
    fn end_to_end_alerts_once() {
        let dir = TempDir::new().unwrap();
        let cfg = config();
        let r = recipients(&["manager@example.com"], &["+15551234567"]);
        let source = FakeSource::new(vec![jane_doe(), counted_order()]);
        let email = RecordingTransport::new(Channel::Email);
        let sms = RecordingTransport::new(Channel::Sms);

        let ctx = RunContext {
            root: dir.path(),
            config: &cfg,
            recipients: &r,
            now: first_run_at(),
            dry_run: false,
        };
        let summary = completed(ctx.run(true, connect(&source, &email, &sms)).unwrap());

        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.qualifying, 1);
        assert_eq!(summary.notified, vec!["c7-42632"]);
        assert_eq!(email.sent_to(), vec!["manager@example.com"]);
        assert_eq!(sms.sent_to(), vec!["+15551234567"]);

        {
            let sent = email.sent.borrow();
            let body = &sent[0].1.body;
            assert!(body.contains("• Date/Time: September 04, 2025 at 07:27 PM EST"));
            assert!(body.contains("• Customer: Jane Doe"));
            assert!(body.contains("• Total Amount: $150.00"));
        }

        let state = RunState::load(dir.path()).unwrap();
        assert!(state.is_alerted("c7-42632"));
        assert_eq!(state.last_checked_at, first_run_at());

        // The next window overlaps the first, so the order is fetched again.
        let ctx = RunContext {
            now: first_run_at() + Duration::minutes(1),
            ..ctx
        };
        let summary = completed(ctx.run(true, connect(&source, &email, &sms)).unwrap());
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.already_alerted, 1);
        assert!(summary.alerts.is_empty());
        assert!(summary.deliveries.attempts.is_empty());
        assert_eq!(email.sent_to().len(), 1);
        assert_eq!(sms.sent_to().len(), 1);
        assert_eq!(source.calls.get(), 2);

        let state = RunState::load(dir.path()).unwrap();
        assert_eq!(state.runs.len(), 2);
    }

    #[test]
    fn multiple_recipients_get_independent_attempts() {
        let dir = TempDir::new().unwrap();
        let cfg = config();
        let r = recipients(
            &["a@example.com", "b@example.com"],
            &["+15550000001", "+15550000002"],
        );
        let source = FakeSource::new(vec![jane_doe()]);
        let email = RecordingTransport::new(Channel::Email).failing_for("a@example.com");
        let sms = RecordingTransport::new(Channel::Sms);

        let ctx = RunContext {
            root: dir.path(),
            config: &cfg,
            recipients: &r,
            now: first_run_at(),
            dry_run: false,
        };
        let summary = completed(ctx.run(true, connect(&source, &email, &sms)).unwrap());

        assert_eq!(summary.deliveries.attempts.len(), 4);
        assert_eq!(summary.deliveries.delivered_count(), 3);
        assert_eq!(summary.notified, vec!["c7-42632"]);
        assert_eq!(sms.sent_to(), vec!["+15550000001", "+15550000002"]);
    }

    #[test]
    fn disabled_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let cfg = config();
        let r = recipients(&["a@example.com"], &[]);
        let ctx = RunContext {
            root: dir.path(),
            config: &cfg,
            recipients: &r,
            now: first_run_at(),
            dry_run: false,
        };
        let outcome = ctx
            .run(false, || -> Result<Collaborators<'static>> {
                panic!("collaborators must not be built when disabled")
            })
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Disabled));
        assert!(!paths::state_path(dir.path()).exists());
    }

    #[test]
    fn fetch_failure_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let earlier = first_run_at() - Duration::hours(2);
        let mut state = RunState::new(earlier);
        state.mark_alerted(["old-order"]);
        state.save(dir.path()).unwrap();
        let before = std::fs::read_to_string(paths::state_path(dir.path())).unwrap();

        let cfg = config();
        let r = recipients(&["a@example.com"], &[]);
        let source = FakeSource::failing();
        let email = RecordingTransport::new(Channel::Email);
        let sms = RecordingTransport::new(Channel::Sms);
        let ctx = RunContext {
            root: dir.path(),
            config: &cfg,
            recipients: &r,
            now: first_run_at(),
            dry_run: false,
        };
        let err = ctx.run(true, connect(&source, &email, &sms)).unwrap_err();
        assert!(matches!(err, GuestwatchError::Fetch(_)));

        let after = std::fs::read_to_string(paths::state_path(dir.path())).unwrap();
        assert_eq!(before, after);
        assert!(email.sent_to().is_empty());
    }

    #[test]
    fn widened_window_after_failure_catches_up() {
        let dir = TempDir::new().unwrap();
        RunState::new(first_run_at() - Duration::hours(2))
            .save(dir.path())
            .unwrap();

        let cfg = config();
        let r = recipients(&[], &["+15550000001"]);
        let source = FakeSource::new(vec![jane_doe()]);
        let email = RecordingTransport::new(Channel::Email);
        let sms = RecordingTransport::new(Channel::Sms);
        let ctx = RunContext {
            root: dir.path(),
            config: &cfg,
            recipients: &r,
            now: first_run_at(),
            dry_run: false,
        };
        let summary = completed(ctx.run(true, connect(&source, &email, &sms)).unwrap());
        assert_eq!(
            summary.window.start,
            first_run_at() - Duration::hours(2) - Duration::minutes(5)
        );
        assert_eq!(summary.notified.len(), 1);
    }

    #[test]
    fn fully_failed_delivery_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let cfg = config();
        let r = recipients(&["a@example.com"], &[]);
        let source = FakeSource::new(vec![jane_doe()]);
        let email = RecordingTransport::new(Channel::Email).failing_for("a@example.com");
        let sms = RecordingTransport::new(Channel::Sms);
        let ctx = RunContext {
            root: dir.path(),
            config: &cfg,
            recipients: &r,
            now: first_run_at(),
            dry_run: false,
        };
        let summary = completed(ctx.run(true, connect(&source, &email, &sms)).unwrap());
        assert!(summary.notified.is_empty());
        assert_eq!(summary.undelivered, vec!["c7-42632"]);

        let state = RunState::load(dir.path()).unwrap();
        assert!(!state.is_alerted("c7-42632"));
        // Held at the undelivered order's paid time (23:27), not the run time.
        assert_eq!(
            state.last_checked_at,
            Utc.with_ymd_and_hms(2025, 9, 4, 23, 27, 0).unwrap()
        );
        assert_eq!(state.last_run().unwrap().deliveries_failed, 1);
    }

    #[test]
    fn undelivered_order_is_retried_a_full_interval_later() {
        let dir = TempDir::new().unwrap();
        let cfg = config();
        let r = recipients(&["a@example.com"], &[]);
        let early: Order = serde_json::from_value(json!({
            "id": "c7-42630",
            "orderNumber": 42630,
            "orderPaidDate": "2025-09-04T23:20:00Z",
            "items": [{"productId": TASTING}]
        }))
        .unwrap();
        let source = FakeSource::new(vec![early]);
        let broken = RecordingTransport::new(Channel::Email).failing_for("a@example.com");
        let working = RecordingTransport::new(Channel::Email);
        let sms = RecordingTransport::new(Channel::Sms);

        let ctx = RunContext {
            root: dir.path(),
            config: &cfg,
            recipients: &r,
            now: first_run_at(),
            dry_run: false,
        };
        let summary = completed(ctx.run(true, connect(&source, &broken, &sms)).unwrap());
        assert_eq!(summary.undelivered, vec!["c7-42630"]);

        let ctx = RunContext {
            now: first_run_at() + Duration::minutes(15),
            ..ctx
        };
        let summary = completed(ctx.run(true, connect(&source, &working, &sms)).unwrap());
        assert!(summary.window.start <= Utc.with_ymd_and_hms(2025, 9, 4, 23, 20, 0).unwrap());
        assert_eq!(summary.notified, vec!["c7-42630"]);
        assert_eq!(working.sent_to(), vec!["a@example.com"]);

        let state = RunState::load(dir.path()).unwrap();
        assert!(state.is_alerted("c7-42630"));
        assert_eq!(state.last_checked_at, first_run_at() + Duration::minutes(15));
    }

    #[test]
    fn dry_run_sends_and_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let cfg = config();
        let r = recipients(&["a@example.com"], &["+15550000001"]);
        let source = FakeSource::new(vec![jane_doe()]);
        let email = RecordingTransport::new(Channel::Email);
        let sms = RecordingTransport::new(Channel::Sms);
        let ctx = RunContext {
            root: dir.path(),
            config: &cfg,
            recipients: &r,
            now: first_run_at(),
            dry_run: true,
        };
        let summary = completed(ctx.run(true, connect(&source, &email, &sms)).unwrap());
        assert_eq!(summary.alerts.len(), 1);
        assert!(summary.notified.is_empty());
        assert!(email.sent_to().is_empty());
        assert!(sms.sent_to().is_empty());
        assert!(!paths::state_path(dir.path()).exists());
    }
}

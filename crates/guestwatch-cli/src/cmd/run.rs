use crate::output::{print_json, print_table};
use chrono::Utc;
use guestwatch_core::commerce::CommerceClient;
use guestwatch_core::config::{Config, Recipients, WarnLevel};
use guestwatch_core::credentials::Credentials;
use guestwatch_core::email::SmtpMailer;
use guestwatch_core::enablement::resolve_enabled;
use guestwatch_core::notify::{DeliveryOutcome, Transport};
use guestwatch_core::run::{Collaborators, RunContext, RunOutcome, RunSummary};
use guestwatch_core::sms::TwilioSms;
use guestwatch_core::GuestwatchError;
use std::path::Path;

pub fn run(root: &Path, dry_run: bool, enabled: Option<&str>, json: bool) -> anyhow::Result<()> {
    // The gate comes first: a disabled install may have no usable config.
    if !resolve_enabled(enabled) {
        tracing::info!("guest count alerts are disabled, skipping run");
        return report(&RunOutcome::Disabled, json);
    }

    let (config, recipients) = super::load_config(root)?;

    let ctx = RunContext {
        root,
        config: &config,
        recipients: &recipients,
        now: Utc::now(),
        dry_run,
    };
    let outcome = ctx.run(true, || connect(&config, &recipients))?;
    report(&outcome, json)
}

fn report(outcome: &RunOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(outcome);
    }
    match outcome {
        RunOutcome::Disabled => println!("Guest count alerts are disabled; nothing checked."),
        RunOutcome::Completed(summary) => print_summary(summary),
    }
    Ok(())
}

/// Validate the config and build the live Commerce7, SMTP and Twilio clients.
fn connect(
    config: &Config,
    recipients: &Recipients,
) -> guestwatch_core::Result<Collaborators<'static>> {
    let mut errors = Vec::new();
    for w in config.validate(recipients) {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => errors.push(w.message),
        }
    }
    if !errors.is_empty() {
        return Err(GuestwatchError::Config(errors));
    }

    let credentials = Credentials::from_env(recipients)?;
    tracing::debug!(?credentials, "credentials loaded");

    let source = CommerceClient::new(&config.commerce, credentials.commerce)?;
    let email = match credentials.smtp {
        Some(c) => Some(Box::new(SmtpMailer::new(&config.smtp, c)?) as Box<dyn Transport>),
        None => None,
    };
    let sms = match credentials.sms {
        Some(c) => Some(Box::new(TwilioSms::new(&config.sms, c)?) as Box<dyn Transport>),
        None => None,
    };

    Ok(Collaborators {
        source: Box::new(source),
        email,
        sms,
    })
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Checked {} to {}",
        summary.window.start.to_rfc3339(),
        summary.window.end.to_rfc3339()
    );
    println!(
        "Fetched {} orders, {} missing a guest count ({} already alerted)",
        summary.fetched, summary.qualifying, summary.already_alerted
    );

    if summary.alerts.is_empty() {
        println!("No new alerts.");
        return;
    }

    println!();
    let rows = summary
        .alerts
        .iter()
        .map(|a| {
            vec![
                format!("#{}", a.order_number),
                a.kind.to_string(),
                a.associate_name.clone(),
                a.customer_name.clone(),
                format!("${}", a.amount),
                a.local_datetime.clone(),
            ]
        })
        .collect();
    print_table(
        &["ORDER", "KIND", "ASSOCIATE", "CUSTOMER", "TOTAL", "WHEN"],
        rows,
    );

    if summary.dry_run {
        println!();
        println!("Dry run: nothing sent, state not saved.");
        return;
    }

    if !summary.deliveries.attempts.is_empty() {
        println!();
        let rows = summary
            .deliveries
            .attempts
            .iter()
            .map(|d| {
                let status = match &d.outcome {
                    DeliveryOutcome::Delivered => "delivered".to_string(),
                    DeliveryOutcome::Failed { error } => format!("failed: {error}"),
                };
                vec![d.channel.to_string(), d.recipient.clone(), status]
            })
            .collect();
        print_table(&["CHANNEL", "RECIPIENT", "STATUS"], rows);
    }

    println!();
    println!(
        "{} of {} orders notified.",
        summary.notified.len(),
        summary.alerts.len()
    );
    if !summary.undelivered.is_empty() {
        println!(
            "Undelivered (will retry next run): {}",
            summary.undelivered.join(", ")
        );
    }
}

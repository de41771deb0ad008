use anyhow::Context;
use guestwatch_core::config::{Config, Recipients, WatchList};
use guestwatch_core::{io, paths};
use std::path::Path;

pub fn run(
    root: &Path,
    products: Vec<String>,
    emails: Vec<String>,
    phones: Vec<String>,
) -> anyhow::Result<()> {
    println!("Initializing guestwatch in: {}", root.display());

    let config = Config {
        watch: WatchList::new(products),
        recipients: Recipients { emails, phones },
        ..Config::default()
    };
    let data = serde_yaml::to_string(&config)?;
    let created = io::write_if_missing(&paths::config_path(root), data.as_bytes())
        .context("failed to write config.yaml")?;
    if created {
        println!("  created: .guestwatch/config.yaml");
    } else {
        println!("  exists:  .guestwatch/config.yaml");
    }

    println!();
    println!("Next steps:");
    println!("  1. Add product ids under watch.product_ids and recipients in config.yaml");
    println!("  2. Export C7_APP_ID, C7_API_KEY and C7_TENANT_ID (plus SMTP_* / TWILIO_*)");
    println!("  3. guestwatch ping && guestwatch config validate");
    println!("  4. Schedule `guestwatch run` every 15 minutes");

    Ok(())
}

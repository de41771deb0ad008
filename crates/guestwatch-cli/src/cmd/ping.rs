use crate::output::print_json;
use anyhow::Context;
use guestwatch_core::commerce::CommerceClient;
use guestwatch_core::config::Recipients;
use guestwatch_core::credentials::Credentials;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let (config, _) = super::load_config(root)?;
    // Only the Commerce7 keys matter here; notification secrets are not checked.
    let credentials = Credentials::from_env(&Recipients::default())?;
    let tenant = credentials.commerce.tenant_id.clone();

    let client = CommerceClient::new(&config.commerce, credentials.commerce)?;
    let orders = client
        .ping()
        .with_context(|| format!("cannot reach Commerce7 at {}", config.commerce.api_base_url))?;
    tracing::info!(tenant = %tenant, orders, "commerce7 connection ok");

    if json {
        print_json(&serde_json::json!({
            "ok": true,
            "tenant": tenant,
            "api_base_url": config.commerce.api_base_url,
        }))?;
    } else {
        println!("Connected to Commerce7 tenant '{tenant}'.");
    }
    Ok(())
}

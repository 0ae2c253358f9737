//! `gencall ask <prompt>` – one request, response text on stdout.

use anyhow::{Context, Result};
use gencall_core::config::GencallConfig;
use gencall_core::Client;

use crate::cli::RequestArgs;

pub async fn run_ask(cfg: GencallConfig, prompt: String, args: RequestArgs) -> Result<()> {
    let text = tokio::task::spawn_blocking(move || -> Result<String> {
        let client = Client::from_config(&cfg)?;
        let request = args.request(&client, prompt);
        Ok(client.call(request)?.text)
    })
    .await
    .context("ask task join")??;
    println!("{}", text);
    Ok(())
}

//! The sweep itself: `keysweep [--pattern P] [--access-key K]`.

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;

use keysweep::config::SweepConfig;
use keysweep::github::GitHubClient;
use keysweep::sweep::{RepoFilter, SweepContext, SweepDriver};
use keysweep::ui::{SweepUI, render_report};

use super::super::Cli;

pub async fn cmd_sweep(cli: &Cli) -> Result<()> {
    load_env_file(cli.env_file.as_deref())?;

    let config = SweepConfig::from_env().context("Failed to load configuration")?;
    let client = GitHubClient::new(&config.client).context("Failed to build forge client")?;
    let ctx = SweepContext::new(config, Arc::new(client));

    let pattern = match &cli.pattern {
        Some(p) => p.clone(),
        None => prompt("Repository name pattern")?,
    };
    if pattern.trim().is_empty() {
        bail!("Repository name pattern must not be empty");
    }
    let filter = RepoFilter::new(&pattern)
        .with_context(|| format!("Invalid repository pattern: {}", pattern))?;

    let access_key = match &cli.access_key {
        Some(k) => k.clone(),
        None => prompt("Access key ID")?,
    };

    let ui = SweepUI::new(cli.verbose);
    let driver = SweepDriver::new(&ctx).with_progress(&ui);

    let report = driver
        .sweep(&filter, &access_key)
        .await
        .context("Failed to list repositories")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", render_report(&report));
    }

    Ok(())
}

/// `.env` in the working directory is optional; an explicitly named file is not.
fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    use dialoguer::{Input, theme::ColorfulTheme};

    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(label)
        .interact_text()
        .with_context(|| format!("Failed to read {}", label.to_lowercase()))
}

//! CLI for the gencall Messages API client.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gencall_core::config::{self, GencallConfig};
use gencall_core::{Client, Request};
use std::path::PathBuf;

use commands::{run_ask, run_batch, run_completions, run_config, run_manpage};

/// Top-level CLI for gencall.
#[derive(Debug, Parser)]
#[command(name = "gencall")]
#[command(about = "gencall: resilient client for the Anthropic Messages API", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/gencall/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one prompt and print the response text.
    Ask {
        /// Prompt text.
        prompt: String,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Send every non-empty line of a file as a prompt, in order, through one client.
    Batch {
        /// File with one prompt per line ('#' starts a comment line).
        path: PathBuf,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Show the config file path and effective settings.
    Config,

    /// Print shell completions.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },

    /// Print a roff man page.
    Manpage,
}

/// Per-invocation overrides of config defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct RequestArgs {
    /// System instruction sent with each prompt.
    #[arg(long)]
    pub system: Option<String>,

    /// Model identifier.
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum output tokens.
    #[arg(long, value_name = "N")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Total attempts per request.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,
}

impl RequestArgs {
    /// Fold the overrides into the loaded config.
    pub fn apply(&self, cfg: &mut GencallConfig) {
        if let Some(model) = &self.model {
            cfg.model = model.clone();
        }
        if let Some(n) = self.max_tokens {
            cfg.max_tokens = n;
        }
        if let Some(t) = self.temperature {
            cfg.temperature = t;
        }
        if let Some(n) = self.max_retries {
            cfg.max_retries = n;
        }
    }

    /// Request for `prompt` from the client's defaults plus `--system`.
    pub fn request(&self, client: &Client, prompt: impl Into<String>) -> Request {
        let request = client.request(prompt);
        match &self.system {
            Some(system) => request.with_system(system.clone()),
            None => request,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<(GencallConfig, PathBuf)> {
    match path {
        Some(p) => Ok((config::load_from(p)?, p.clone())),
        None => Ok((config::load_or_init()?, config::config_path()?)),
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => return run_completions(shell),
            CliCommand::Manpage => return run_manpage(),
            _ => {}
        }

        let (mut cfg, cfg_path) = load_config(cli.config.as_ref())?;
        tracing::debug!(path = %cfg_path.display(), "loaded config");

        match cli.command {
            CliCommand::Ask { prompt, request } => {
                request.apply(&mut cfg);
                run_ask(cfg, prompt, request).await?;
            }
            CliCommand::Batch { path, request } => {
                request.apply(&mut cfg);
                run_batch(cfg, path, request).await?;
            }
            CliCommand::Config => run_config(&cfg, &cfg_path)?,
            CliCommand::Completions { .. } | CliCommand::Manpage => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

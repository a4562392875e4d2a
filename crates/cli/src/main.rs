// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Courier CLI
//!
//! Operator tool for the third-party order API: exports order shipment
//! receipts in bulk and queries usage statistics. Credentials and the API
//! origin come from `COURIER_*` environment variables. Ctrl-C cancels an
//! in-flight batch; already-completed members keep their results.

mod config;
mod logging;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use courier_sdk::{CancellationToken, Client, Credential};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::logging::init_logging;

#[derive(Parser)]
#[command(name = "courier", about = "Client for the third-party order API")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Export order shipment receipts and save them locally
	Export {
		/// Order shipment identifiers to export
		#[arg(required = true)]
		ids: Vec<String>,
		/// Directory receipts are written into
		#[arg(long, default_value = ".")]
		out: PathBuf,
	},
	/// Fetch API usage statistics
	Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
	// Initialize logging first
	init_logging()?;

	let cli = Cli::parse();
	let cfg = CliConfig::from_env()?;

	let credential = Credential::new(cfg.api_key.clone(), cfg.master_secret.as_bytes());
	let client = Client::with_config(
		credential,
		cfg.base_url.clone(),
		Duration::from_secs(cfg.timeout_secs),
	)
	.batch_concurrency(cfg.concurrency);

	match cli.command {
		Command::Export { ids, out } => export(client, ids, out).await,
		Command::Stats => stats(client).await,
	}
}

async fn export(client: Client, ids: Vec<String>, out: PathBuf) -> Result<()> {
	tokio::fs::create_dir_all(&out)
		.await
		.with_context(|| format!("Failed to create output directory: {}", out.display()))?;

	let cancel = CancellationToken::new();
	let interrupt = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!(target: "courier", "Interrupt received, cancelling batch");
			interrupt.cancel();
		}
	});

	info!(
		target: "courier",
		count = ids.len(),
		out = %out.display(),
		"Exporting receipts"
	);

	let outcome = client.export_receipts_to_dir(&ids, &out, cancel).await;

	for (id, result) in ids.iter().zip(&outcome.outcomes) {
		match result {
			Ok(path) => {
				info!(target: "courier", %id, path = %path.display(), "Receipt exported")
			}
			Err(err) => warn!(target: "courier", %id, error = %err, "Export failed"),
		}
	}

	info!(
		target: "courier",
		total = outcome.total,
		succeeded = outcome.succeeded,
		failed = outcome.failed,
		cancelled = outcome.cancelled,
		elapsed_ms = outcome.elapsed.as_millis() as u64,
		throughput_per_sec = outcome.throughput(),
		"Batch complete"
	);

	if outcome.succeeded < outcome.total {
		bail!(
			"{} of {} exports did not complete",
			outcome.total - outcome.succeeded,
			outcome.total
		);
	}

	Ok(())
}

async fn stats(client: Client) -> Result<()> {
	let stats = client
		.usage_stats()
		.await
		.context("Failed to fetch usage statistics")?;
	println!("{}", serde_json::to_string_pretty(&stats)?);
	Ok(())
}

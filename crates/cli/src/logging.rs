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

//! Logging initialization for the courier CLI
//!
//! Console output (stderr) is always enabled. The following environment
//! variables adjust behavior:
//!
//! - `RUST_LOG`: Log level filter (default: `info`)
//! - `LOG_DIR`: When set, logs are additionally written to daily-rolling
//!   files under `{LOG_DIR}/courier/` named `courier.{date}.log`

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use tracing_appender::{
	non_blocking,
	rolling::{self, Rotation},
};
use tracing_subscriber::{
	EnvFilter, fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt,
};

/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory component name
pub const LOG_COMPONENT_NAME: &str = "courier";

// Store log guard to prevent log loss on program exit
static LOG_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

/// Setup daily-rolling file logging layer.
///
/// `tracing-appender` handles the rotation; files are named
/// `{prefix}.{date}.log`, e.g. `courier.2026-01-03.log`.
fn setup_file_logging(log_dir: &Path) -> Result<non_blocking::NonBlocking> {
	let file_appender = rolling::RollingFileAppender::builder()
		.rotation(Rotation::DAILY)
		.filename_prefix(LOG_COMPONENT_NAME.to_string())
		.filename_suffix(".log")
		.build(log_dir)
		.with_context(|| {
			format!(
				"Failed to create rolling file appender in {}",
				log_dir.display()
			)
		})?;

	let (file_writer, guard) = non_blocking(file_appender);

	// Store guard to prevent log loss
	LOG_GUARD.set(guard).ok();

	Ok(file_writer)
}

/// Initialize logging with console output and optional file output
pub fn init_logging() -> Result<()> {
	let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

	let console_layer = fmt::layer()
		.with_writer(std::io::stderr)
		.with_timer(fmt::time::UtcTime::rfc_3339())
		.with_target(true)
		.with_ansi(true);

	let subscriber = Registry::default().with(filter).with(console_layer);

	if let Ok(log_root) = env::var("LOG_DIR") {
		let log_dir = Path::new(&log_root).join(LOG_COMPONENT_NAME);
		std::fs::create_dir_all(&log_dir)
			.with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

		let file_writer = setup_file_logging(&log_dir)?;
		subscriber
			.with(
				fmt::layer()
					.with_writer(file_writer)
					.with_timer(fmt::time::UtcTime::rfc_3339())
					.with_target(true)
					.with_ansi(false), // Disable ANSI colors for file output
			)
			.init();
	} else {
		subscriber.init();
	}

	Ok(())
}

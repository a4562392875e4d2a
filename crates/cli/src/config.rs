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

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default per-request timeout in seconds (can be overridden by COURIER_TIMEOUT_SECS)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default batch concurrency bound (can be overridden by COURIER_CONCURRENCY)
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Runtime configuration, loaded from `COURIER_*` environment variables.
///
/// A local `.env` file is honored. `api_key`, `master_secret` and
/// `base_url` are required; the rest fall back to defaults. No `Debug`
/// impl: the master secret must never reach logs.
#[derive(Clone, Deserialize)]
pub struct CliConfig {
	/// API key identifying this client
	pub api_key: String,
	/// Master secret used as the HMAC signing key
	pub master_secret: String,
	/// API origin, e.g. `https://api.example.com`
	pub base_url: String,
	/// Per-request deadline in seconds
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
	/// Batch members in flight at once
	#[serde(default = "default_concurrency")]
	pub concurrency: usize,
}

fn default_timeout_secs() -> u64 {
	DEFAULT_TIMEOUT_SECS
}

fn default_concurrency() -> usize {
	DEFAULT_CONCURRENCY
}

impl CliConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self> {
		dotenv::dotenv().ok();

		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("COURIER"))
			.build()
			.context("Failed to read environment configuration")?;

		cfg.try_deserialize().context(
			"Invalid COURIER_* configuration (COURIER_API_KEY, COURIER_MASTER_SECRET and COURIER_BASE_URL are required)",
		)
	}
}

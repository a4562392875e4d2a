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

//! Courier SDK - Client library for the third-party order API
//!
//! This crate provides an authenticated HTTP client for the third-party
//! API: per-request HMAC-SHA256 signing, single-request dispatch with
//! typed error classification, and concurrent batch dispatch with
//! partial-failure accounting.
//!
//! The SDK is designed to be lightweight and embeddable:
//! - No background threads
//! - No runtime initialization
//! - No environment or configuration loading

pub mod batch;
pub mod client;
pub mod signing;
pub mod types;

pub use batch::{BatchOutcome, BatchRequest, DEFAULT_BATCH_CONCURRENCY};
pub use client::{
	Client, ClientError, DEFAULT_TIMEOUT, HEADER_API_KEY, HEADER_SIGNATURE, HEADER_TIMESTAMP,
	SyncClient,
};
pub use signing::{canonical_string, sign_request};
pub use types::{ApiEnvelope, Credential, ReceiptData};

// Re-exported so callers do not need direct reqwest/tokio-util deps for
// the common paths.
pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;

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

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::batch::DEFAULT_BATCH_CONCURRENCY;
use crate::signing::sign_request;
use crate::types::{ApiEnvelope, Credential, ReceiptData};

/// Header carrying the client identifier.
pub const HEADER_API_KEY: &str = "X-API-Key";

/// Header carrying the lowercase hex HMAC digest.
pub const HEADER_SIGNATURE: &str = "X-API-Signature";

/// Header carrying the RFC3339 UTC timestamp captured at signing time.
pub const HEADER_TIMESTAMP: &str = "X-API-Timestamp";

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error types for client operations
#[derive(Debug, Error)]
pub enum ClientError {
	/// The connection could not be established, was interrupted, or timed
	/// out. Not retried by this layer.
	#[error("Transport error: {0}")]
	Transport(String),
	/// The upstream rejected the signature or credential (401/403).
	#[error("Authentication rejected (status {status}): {message}")]
	Auth { status: u16, message: String },
	/// Any other non-success upstream response, including a 2xx envelope
	/// with `success: false`.
	#[error("Upstream error (status {status}): {message}")]
	Upstream { status: u16, message: String },
	/// A success response whose body does not match the documented shape.
	#[error("Decode error: {0}")]
	Decode(String),
	/// A batch member aborted by caller cancellation.
	#[error("Request cancelled")]
	Cancelled,
	/// Local receipt persistence failed. Never produced by the network path.
	#[error("Storage error: {0}")]
	Storage(#[from] std::io::Error),
}

/// Client for the third-party API.
///
/// Holds the immutable credential and an owned connection pool. Every call
/// captures a fresh timestamp and computes a fresh signature; nothing about
/// a signed request is cached or reused, so each send is independently
/// valid against the server's replay checks.
#[derive(Clone)]
pub struct Client {
	pub(crate) credential: Credential,
	pub(crate) base_url: String,
	pub(crate) http: ReqwestClient,
	pub(crate) batch_concurrency: usize,
}

impl Client {
	/// Create a new client with the default timeout.
	pub fn new(credential: Credential, base_url: impl Into<String>) -> Self {
		Self::with_config(credential, base_url, DEFAULT_TIMEOUT)
	}

	/// Create a new client with a custom per-request timeout.
	pub fn with_config(
		credential: Credential,
		base_url: impl Into<String>,
		timeout: Duration,
	) -> Self {
		let http = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.expect("Failed to create HTTP client");

		Self {
			credential,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			http,
			batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
		}
	}

	/// Bound the number of batch members in flight at once.
	pub fn batch_concurrency(mut self, limit: usize) -> Self {
		self.batch_concurrency = limit.max(1);
		self
	}

	/// Make one authenticated request and decode the success payload.
	///
	/// The body is serialized once and those exact bytes are both signed
	/// and transmitted; any divergence would invalidate the signature
	/// server-side. Exactly one network attempt is made per call; retry
	/// policy is a caller concern.
	pub async fn send<T: DeserializeOwned>(
		&self,
		method: Method,
		path: &str,
		body: Option<&serde_json::Value>,
	) -> Result<T, ClientError> {
		let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

		let body_string = match body {
			Some(value) => serde_json::to_string(value).map_err(|e| {
				ClientError::Decode(format!("Failed to serialize request body: {}", e))
			})?,
			None => String::new(),
		};

		let signature = sign_request(
			method.as_str(),
			path,
			&body_string,
			&timestamp,
			self.credential.api_key(),
			self.credential.master_secret(),
		);

		let url = format!("{}{}", self.base_url, path);
		debug!(target: "courier::client", %method, %url, "sending signed request");

		let mut request = self
			.http
			.request(method, &url)
			.header(HEADER_API_KEY, self.credential.api_key())
			.header(HEADER_SIGNATURE, signature)
			.header(HEADER_TIMESTAMP, &timestamp);

		if body.is_some() {
			request = request
				.header(reqwest::header::CONTENT_TYPE, "application/json")
				.body(body_string);
		}

		let response = request.send().await.map_err(|e| {
			if e.is_timeout() {
				ClientError::Transport(format!("Request timed out: {}", e))
			} else {
				ClientError::Transport(format!("Request failed: {}", e))
			}
		})?;

		let status = response.status();
		debug!(target: "courier::client", %url, %status, "received response");

		let text = response
			.text()
			.await
			.map_err(|e| ClientError::Transport(format!("Failed to read response body: {}", e)))?;

		if !status.is_success() {
			return Err(classify_failure(status, &text));
		}

		let envelope: ApiEnvelope<T> = serde_json::from_str(&text)
			.map_err(|e| ClientError::Decode(format!("Invalid response envelope: {}", e)))?;

		if !envelope.success {
			return Err(ClientError::Upstream {
				status: status.as_u16(),
				message: envelope.error.unwrap_or_else(|| "Unknown error".to_string()),
			});
		}

		envelope
			.data
			.ok_or_else(|| ClientError::Decode("Success envelope missing data".to_string()))
	}

	/// Export an order shipment receipt.
	///
	/// The returned payload carries the rendered file transport-encoded;
	/// use [`ReceiptData::decode_content`] or [`Client::export_receipt_to_file`]
	/// to obtain the raw bytes.
	pub async fn export_order_shipment_receipt(
		&self,
		order_shipment_id: &str,
	) -> Result<ReceiptData, ClientError> {
		self.send(Method::GET, &receipt_export_path(order_shipment_id), None).await
	}

	/// Fetch API usage statistics.
	///
	/// The envelope is decoded strictly; the inner payload schema is not
	/// documented upstream and is returned as-is.
	pub async fn usage_stats(&self) -> Result<serde_json::Value, ClientError> {
		self.send(Method::GET, "/api/v1/third-party/usage-stats", None).await
	}

	/// Export a receipt and persist it under `dir` as
	/// `receipt_{id}.{extension}`.
	///
	/// The payload is decoded before the file is created, so a failed
	/// export or a malformed payload leaves no file behind. The handle is
	/// flushed before it is closed.
	pub async fn export_receipt_to_file(
		&self,
		order_shipment_id: &str,
		dir: impl AsRef<Path>,
	) -> Result<PathBuf, ClientError> {
		let receipt = self.export_order_shipment_receipt(order_shipment_id).await?;
		let bytes = receipt.decode_content().map_err(|e| {
			ClientError::Decode(format!("Invalid receipt content encoding: {}", e))
		})?;

		let path = dir.as_ref().join(receipt.file_name(order_shipment_id));
		let mut file = tokio::fs::File::create(&path).await?;
		file.write_all(&bytes).await?;
		file.flush().await?;

		debug!(
			target: "courier::client",
			path = %path.display(),
			bytes = bytes.len(),
			"receipt saved"
		);
		Ok(path)
	}
}

/// Path of the receipt export operation for one shipment.
pub(crate) fn receipt_export_path(order_shipment_id: &str) -> String {
	format!(
		"/api/v1/third-party/export-order-shipment-receipt/{}",
		order_shipment_id
	)
}

fn classify_failure(status: StatusCode, body: &str) -> ClientError {
	let message = extract_error_message(body);
	if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
		ClientError::Auth { status: status.as_u16(), message }
	} else {
		ClientError::Upstream { status: status.as_u16(), message }
	}
}

/// Pull a human-readable message out of a failure body: the `error` field
/// when the body is JSON, the raw text otherwise, a generic message when
/// the body is empty.
fn extract_error_message(body: &str) -> String {
	if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
		&& let Some(error) = value.get("error").and_then(|e| e.as_str())
	{
		return error.to_string();
	}

	if body.trim().is_empty() {
		"Unknown error".to_string()
	} else {
		body.to_string()
	}
}

/// Synchronous client wrapper (for compatibility)
///
/// This wraps the async client and runs it in a tokio runtime.
/// For new code, prefer using the async Client directly.
pub struct SyncClient {
	client: Client,
	runtime: tokio::runtime::Runtime,
}

impl SyncClient {
	/// Create a new synchronous client with the default timeout.
	pub fn new(credential: Credential, base_url: impl Into<String>) -> std::io::Result<Self> {
		let runtime = tokio::runtime::Runtime::new()?;
		Ok(Self {
			client: Client::new(credential, base_url),
			runtime,
		})
	}

	/// Create a new synchronous client with a custom timeout.
	pub fn with_config(
		credential: Credential,
		base_url: impl Into<String>,
		timeout: Duration,
	) -> std::io::Result<Self> {
		let runtime = tokio::runtime::Runtime::new()?;
		Ok(Self {
			client: Client::with_config(credential, base_url, timeout),
			runtime,
		})
	}

	/// Export an order shipment receipt (synchronous).
	pub fn export_order_shipment_receipt(
		&self,
		order_shipment_id: &str,
	) -> Result<ReceiptData, ClientError> {
		self.runtime
			.block_on(self.client.export_order_shipment_receipt(order_shipment_id))
	}

	/// Export a receipt to a file (synchronous).
	pub fn export_receipt_to_file(
		&self,
		order_shipment_id: &str,
		dir: impl AsRef<Path>,
	) -> Result<PathBuf, ClientError> {
		self.runtime
			.block_on(self.client.export_receipt_to_file(order_shipment_id, dir))
	}

	/// Fetch usage statistics (synchronous).
	pub fn usage_stats(&self) -> Result<serde_json::Value, ClientError> {
		self.runtime.block_on(self.client.usage_stats())
	}

	/// Export a batch of receipts concurrently (synchronous facade).
	pub fn export_receipts(
		&self,
		order_shipment_ids: &[String],
	) -> crate::batch::BatchOutcome<ReceiptData> {
		self.runtime.block_on(self.client.export_receipts(order_shipment_ids))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn test_credential() -> Credential {
		Credential::new("key123", "s3cret")
	}

	#[test]
	fn test_client_creation() {
		let client = Client::new(test_credential(), "http://localhost:8080");
		assert_eq!(client.base_url, "http://localhost:8080");
		assert_eq!(client.batch_concurrency, DEFAULT_BATCH_CONCURRENCY);
	}

	#[test]
	fn test_base_url_trailing_slash_trimmed() {
		let client = Client::new(test_credential(), "http://localhost:8080/");
		assert_eq!(client.base_url, "http://localhost:8080");
	}

	#[test]
	fn test_batch_concurrency_floor() {
		let client = Client::new(test_credential(), "http://localhost:8080").batch_concurrency(0);
		assert_eq!(client.batch_concurrency, 1);
	}

	#[test]
	fn test_sync_client_creation() {
		let client = SyncClient::new(test_credential(), "http://localhost:8080");
		assert!(client.is_ok());
	}

	#[test]
	fn test_receipt_export_path() {
		assert_eq!(
			receipt_export_path("ABC123"),
			"/api/v1/third-party/export-order-shipment-receipt/ABC123"
		);
	}

	#[test]
	fn test_extract_error_message_from_json() {
		assert_eq!(
			extract_error_message(r#"{"error":"invalid signature"}"#),
			"invalid signature"
		);
	}

	#[test]
	fn test_extract_error_message_fallback_to_text() {
		assert_eq!(extract_error_message("gateway exploded"), "gateway exploded");
	}

	#[test]
	fn test_extract_error_message_empty_body() {
		assert_eq!(extract_error_message("  "), "Unknown error");
	}

	#[test]
	fn test_classify_auth_statuses() {
		for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
			match classify_failure(status, r#"{"error":"nope"}"#) {
				ClientError::Auth { status: s, message } => {
					assert_eq!(s, status.as_u16());
					assert_eq!(message, "nope");
				}
				other => panic!("expected auth error, got {:?}", other),
			}
		}
	}

	#[test]
	fn test_classify_other_statuses_as_upstream() {
		match classify_failure(StatusCode::NOT_FOUND, "missing") {
			ClientError::Upstream { status, message } => {
				assert_eq!(status, 404);
				assert_eq!(message, "missing");
			}
			other => panic!("expected upstream error, got {:?}", other),
		}
	}
}

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

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

/// API credential: client identifier plus the master secret used as the
/// HMAC key.
///
/// The secret is held as raw bytes, is redacted from `Debug` output, and is
/// intentionally not serializable. A credential is immutable for the
/// lifetime of the client that holds it.
#[derive(Clone)]
pub struct Credential {
	api_key: String,
	master_secret: Vec<u8>,
}

impl Credential {
	/// Create a credential from the API key and master secret.
	pub fn new(api_key: impl Into<String>, master_secret: impl AsRef<[u8]>) -> Self {
		Self {
			api_key: api_key.into(),
			master_secret: master_secret.as_ref().to_vec(),
		}
	}

	/// Client identifier sent in the `X-API-Key` header.
	pub fn api_key(&self) -> &str {
		&self.api_key
	}

	/// Signing key bytes.
	pub fn master_secret(&self) -> &[u8] {
		&self.master_secret
	}
}

impl fmt::Debug for Credential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credential")
			.field("api_key", &self.api_key)
			.field("master_secret", &"<redacted>")
			.finish()
	}
}

/// Response envelope shared by every third-party endpoint.
///
/// The upstream always answers with `{success, data?, error?}`. Responses
/// that do not parse as this shape are rejected as decode errors rather
/// than interpreted loosely.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
	/// Whether the upstream considers the operation successful.
	pub success: bool,
	/// Payload, present on success.
	pub data: Option<T>,
	/// Human-readable error message, present on failure.
	pub error: Option<String>,
}

/// Exported receipt payload: transport-encoded file content plus the file
/// extension the upstream rendered it as (typically `pdf`).
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptData {
	/// Base64-encoded file content.
	pub content: String,
	/// File extension without the leading dot.
	pub extension: String,
}

impl ReceiptData {
	/// Decode the transport-encoded content back to raw file bytes.
	pub fn decode_content(&self) -> Result<Vec<u8>, base64::DecodeError> {
		BASE64.decode(&self.content)
	}

	/// File name for persisting this receipt, derived from the shipment
	/// identifier: `receipt_{id}.{extension}`.
	pub fn file_name(&self, order_shipment_id: &str) -> String {
		format!("receipt_{}.{}", order_shipment_id, self.extension)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_credential_debug_redacts_secret() {
		let credential = Credential::new("key123", "s3cret");
		let rendered = format!("{:?}", credential);
		assert!(rendered.contains("key123"));
		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("s3cret"));
	}

	#[test]
	fn test_receipt_content_round_trip() {
		let original: &[u8] = b"%PDF-1.4 fake receipt bytes";
		let receipt = ReceiptData {
			content: BASE64.encode(original),
			extension: "pdf".to_string(),
		};
		assert_eq!(receipt.decode_content().unwrap(), original);
	}

	#[test]
	fn test_receipt_file_name() {
		let receipt = ReceiptData {
			content: String::new(),
			extension: "pdf".to_string(),
		};
		assert_eq!(receipt.file_name("ABC123"), "receipt_ABC123.pdf");
	}

	#[test]
	fn test_envelope_parses_success_shape() {
		let envelope: ApiEnvelope<ReceiptData> =
			serde_json::from_str(r#"{"success":true,"data":{"content":"aGk=","extension":"pdf"}}"#)
				.unwrap();
		assert!(envelope.success);
		assert_eq!(envelope.data.unwrap().extension, "pdf");
		assert!(envelope.error.is_none());
	}

	#[test]
	fn test_envelope_parses_error_shape() {
		let envelope: ApiEnvelope<ReceiptData> =
			serde_json::from_str(r#"{"success":false,"error":"shipment not found"}"#).unwrap();
		assert!(!envelope.success);
		assert!(envelope.data.is_none());
		assert_eq!(envelope.error.as_deref(), Some("shipment not found"));
	}

	#[test]
	fn test_envelope_rejects_unrelated_shape() {
		let result: Result<ApiEnvelope<ReceiptData>, _> =
			serde_json::from_str(r#"{"status":"ok"}"#);
		assert!(result.is_err());
	}
}

// Copyright 2025 chenjjiaa
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

//! Request signing for third-party API authentication
//!
//! Every request carries an HMAC-SHA256 signature over a canonical string
//! assembled from the request and the client identity. The server recomputes
//! the same digest from the received bytes, so the signed `path` and `body`
//! must be byte-identical to what goes on the wire.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Assemble the canonical string-to-sign.
///
/// Fields are joined by `\n` in a fixed order: method, path, body,
/// timestamp, API key. No escaping or normalization is applied; an absent
/// body is represented by the empty string, never omitted.
pub fn canonical_string(
	method: &str,
	path: &str,
	body: &str,
	timestamp: &str,
	api_key: &str,
) -> String {
	format!("{}\n{}\n{}\n{}\n{}", method, path, body, timestamp, api_key)
}

/// Compute the request signature.
///
/// The digest is HMAC-SHA256 keyed with the master secret over the
/// canonical string, hex-encoded lowercase. This function is pure:
/// identical inputs always produce the identical signature.
pub fn sign_request(
	method: &str,
	path: &str,
	body: &str,
	timestamp: &str,
	api_key: &str,
	master_secret: &[u8],
) -> String {
	let mut mac =
		HmacSha256::new_from_slice(master_secret).expect("HMAC accepts keys of any length");
	mac.update(canonical_string(method, path, body, timestamp, api_key).as_bytes());
	hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
	use super::*;

	const METHOD: &str = "GET";
	const PATH: &str = "/api/v1/third-party/export-order-shipment-receipt/ABC123";
	const TIMESTAMP: &str = "2025-01-01T00:00:00Z";
	const API_KEY: &str = "key123";
	const SECRET: &[u8] = b"s3cret";

	fn reference_signature() -> String {
		sign_request(METHOD, PATH, "", TIMESTAMP, API_KEY, SECRET)
	}

	#[test]
	fn test_known_signature() {
		// Independently computed with a reference HMAC-SHA256 implementation.
		assert_eq!(
			reference_signature(),
			"e999a2e126c961d551d4ed12eed2722349e34b45f3069734a86407fb87702365"
		);
	}

	#[test]
	fn test_deterministic() {
		assert_eq!(reference_signature(), reference_signature());
	}

	#[test]
	fn test_canonical_field_order() {
		assert_eq!(
			canonical_string("POST", "/p", "{}", "t", "k"),
			"POST\n/p\n{}\nt\nk"
		);
	}

	#[test]
	fn test_empty_body_is_empty_string() {
		// An absent body signs as the empty string, leaving the separator
		// structure intact.
		assert_eq!(canonical_string("GET", "/p", "", "t", "k"), "GET\n/p\n\nt\nk");
	}

	#[test]
	fn test_each_field_changes_signature() {
		let base = reference_signature();

		assert_ne!(base, sign_request("POST", PATH, "", TIMESTAMP, API_KEY, SECRET));
		assert_ne!(base, sign_request(METHOD, "/api/v1/other", "", TIMESTAMP, API_KEY, SECRET));
		assert_ne!(base, sign_request(METHOD, PATH, "{}", TIMESTAMP, API_KEY, SECRET));
		assert_ne!(
			base,
			sign_request(METHOD, PATH, "", "2025-01-01T00:00:01Z", API_KEY, SECRET)
		);
		assert_ne!(base, sign_request(METHOD, PATH, "", TIMESTAMP, "key124", SECRET));
		assert_ne!(base, sign_request(METHOD, PATH, "", TIMESTAMP, API_KEY, b"s3cret2"));
	}

	#[test]
	fn test_signature_is_lowercase_hex() {
		let sig = reference_signature();
		assert_eq!(sig.len(), 64);
		assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}
}

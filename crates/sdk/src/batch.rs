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

//! Concurrent batch dispatch
//!
//! A batch issues all member requests without waiting on any individual
//! one. Each member runs the full single-request lifecycle with its own
//! freshly captured timestamp and signature. One member's failure never
//! aborts or affects its siblings: the barrier waits for every member to
//! reach a terminal state, and outcomes are collected in caller input
//! order regardless of completion order.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{Client, ClientError, receipt_export_path};
use crate::types::ReceiptData;

/// Default bound on batch members in flight at once.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 16;

/// One member of a batch: everything needed to dispatch a single request.
#[derive(Debug, Clone)]
pub struct BatchRequest {
	pub method: Method,
	pub path: String,
	pub body: Option<serde_json::Value>,
}

impl BatchRequest {
	pub fn new(method: Method, path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
		Self {
			method,
			path: path.into(),
			body,
		}
	}

	/// Bodyless GET member.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path, None)
	}
}

/// Aggregated result of one batch dispatch.
///
/// `outcomes[i]` corresponds to the caller's `requests[i]`. Members that
/// were cancelled before completing are reported as
/// [`ClientError::Cancelled`] and counted separately from failures.
#[derive(Debug)]
pub struct BatchOutcome<T> {
	pub total: usize,
	pub succeeded: usize,
	pub failed: usize,
	pub cancelled: usize,
	/// Wall-clock time from issuing the first member to the last member's
	/// terminal state.
	pub elapsed: Duration,
	pub outcomes: Vec<Result<T, ClientError>>,
}

impl<T> BatchOutcome<T> {
	fn collect(outcomes: Vec<Result<T, ClientError>>, elapsed: Duration) -> Self {
		let mut succeeded = 0;
		let mut failed = 0;
		let mut cancelled = 0;
		for outcome in &outcomes {
			match outcome {
				Ok(_) => succeeded += 1,
				Err(ClientError::Cancelled) => cancelled += 1,
				Err(_) => failed += 1,
			}
		}

		Self {
			total: outcomes.len(),
			succeeded,
			failed,
			cancelled,
			elapsed,
			outcomes,
		}
	}

	/// Completed members per second over the whole batch.
	pub fn throughput(&self) -> f64 {
		let secs = self.elapsed.as_secs_f64();
		if secs > 0.0 { self.total as f64 / secs } else { 0.0 }
	}
}

/// Fan out member futures as tasks and fan in their results.
///
/// Concurrency is bounded by a semaphore. Cancellation resolves members
/// that have not completed to [`ClientError::Cancelled`]; members that
/// already finished keep their results. Joining the handles in spawn
/// order fills the outcome list in input order.
async fn run_batch<T, F>(
	members: Vec<F>,
	limit: usize,
	cancel: CancellationToken,
) -> BatchOutcome<T>
where
	T: Send + 'static,
	F: Future<Output = Result<T, ClientError>> + Send + 'static,
{
	let started = Instant::now();
	let semaphore = Arc::new(Semaphore::new(limit.max(1)));

	let mut handles = Vec::with_capacity(members.len());
	for member in members {
		let semaphore = semaphore.clone();
		let cancel = cancel.clone();
		handles.push(tokio::spawn(async move {
			let _permit = tokio::select! {
				permit = semaphore.acquire_owned() => {
					permit.expect("batch semaphore is never closed")
				}
				_ = cancel.cancelled() => return Err(ClientError::Cancelled),
			};

			tokio::select! {
				result = member => result,
				_ = cancel.cancelled() => Err(ClientError::Cancelled),
			}
		}));
	}

	let mut outcomes = Vec::with_capacity(handles.len());
	for handle in handles {
		let outcome = match handle.await {
			Ok(result) => result,
			Err(err) => Err(ClientError::Transport(format!("Batch worker failed: {}", err))),
		};
		outcomes.push(outcome);
	}

	BatchOutcome::collect(outcomes, started.elapsed())
}

impl Client {
	/// Dispatch a batch of independent requests concurrently.
	///
	/// All members decode to the same payload type; see
	/// [`Client::export_receipts`] for the common receipt case.
	pub async fn send_batch<T>(&self, requests: Vec<BatchRequest>) -> BatchOutcome<T>
	where
		T: DeserializeOwned + Send + 'static,
	{
		self.send_batch_with_cancel(requests, CancellationToken::new()).await
	}

	/// Dispatch a batch with a caller-held cancellation token.
	///
	/// Cancelling the token resolves every not-yet-completed member to
	/// [`ClientError::Cancelled`]; the barrier still waits for all members
	/// to reach a terminal state before returning.
	pub async fn send_batch_with_cancel<T>(
		&self,
		requests: Vec<BatchRequest>,
		cancel: CancellationToken,
	) -> BatchOutcome<T>
	where
		T: DeserializeOwned + Send + 'static,
	{
		let members: Vec<_> = requests
			.into_iter()
			.map(|request| {
				let client = self.clone();
				async move {
					client
						.send(request.method.clone(), &request.path, request.body.as_ref())
						.await
				}
			})
			.collect();

		let outcome = run_batch(members, self.batch_concurrency, cancel).await;
		debug!(
			target: "courier::batch",
			total = outcome.total,
			succeeded = outcome.succeeded,
			failed = outcome.failed,
			cancelled = outcome.cancelled,
			elapsed_ms = outcome.elapsed.as_millis() as u64,
			"batch completed"
		);
		outcome
	}

	/// Export a batch of order shipment receipts concurrently.
	pub async fn export_receipts(
		&self,
		order_shipment_ids: &[String],
	) -> BatchOutcome<ReceiptData> {
		let requests = order_shipment_ids
			.iter()
			.map(|id| BatchRequest::get(receipt_export_path(id)))
			.collect();
		self.send_batch(requests).await
	}

	/// Export a batch of receipts and persist each success under `dir`.
	///
	/// Per member, the payload is decoded before any file is created, so a
	/// failed member leaves no file behind. Outcomes carry the written
	/// paths in input order.
	pub async fn export_receipts_to_dir(
		&self,
		order_shipment_ids: &[String],
		dir: impl AsRef<Path>,
		cancel: CancellationToken,
	) -> BatchOutcome<PathBuf> {
		let dir = dir.as_ref();
		let members: Vec<_> = order_shipment_ids
			.iter()
			.map(|id| {
				let client = self.clone();
				let id = id.clone();
				let dir = dir.to_path_buf();
				async move { client.export_receipt_to_file(&id, dir).await }
			})
			.collect();

		run_batch(members, self.batch_concurrency, cancel).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_batch_request_get() {
		let request = BatchRequest::get("/api/v1/third-party/usage-stats");
		assert_eq!(request.method, Method::GET);
		assert!(request.body.is_none());
	}

	#[test]
	fn test_outcome_counts() {
		let outcomes: Vec<Result<u32, ClientError>> = vec![
			Ok(1),
			Err(ClientError::Cancelled),
			Err(ClientError::Transport("boom".to_string())),
			Ok(2),
		];
		let outcome = BatchOutcome::collect(outcomes, Duration::from_millis(10));
		assert_eq!(outcome.total, 4);
		assert_eq!(outcome.succeeded, 2);
		assert_eq!(outcome.failed, 1);
		assert_eq!(outcome.cancelled, 1);
	}

	#[test]
	fn test_throughput() {
		let outcomes: Vec<Result<u32, ClientError>> = vec![Ok(1), Ok(2)];
		let outcome = BatchOutcome::collect(outcomes, Duration::from_secs(1));
		assert!((outcome.throughput() - 2.0).abs() < f64::EPSILON);
	}

	#[test]
	fn test_throughput_zero_elapsed() {
		let outcome: BatchOutcome<u32> = BatchOutcome::collect(Vec::new(), Duration::ZERO);
		assert_eq!(outcome.throughput(), 0.0);
	}
}

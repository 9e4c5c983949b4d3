use std::future::Future;

use crate::{Error, Result};

/// Bounded retry for operations whose output may be malformed.
///
/// Only retryable errors are retried; fatal ones (quota, config) return immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
}
impl RetryPolicy {
	pub fn new(max_attempts: u32) -> Self {
		Self { max_attempts: max_attempts.max(1) }
	}

	pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut last_error = None;

		for n in 1..=self.max_attempts {
			match attempt(n).await {
				Ok(value) => return Ok(value),
				Err(err) if !err.is_retryable() => return Err(err),
				Err(err) => {
					tracing::warn!(
						operation,
						attempt = n,
						max_attempts = self.max_attempts,
						error = %err,
						"Attempt failed."
					);

					last_error = Some(err);
				},
			}
		}

		Err(Error::RetriesExhausted {
			operation,
			attempts: self.max_attempts,
			message: last_error.map(|err| err.to_string()).unwrap_or_default(),
		})
	}
}

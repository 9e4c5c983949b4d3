use std::{future::Future, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};

use crate::{Result, VariantMap, workflow::Stage};

/// Runs one task per variant on a bounded pool and collects the results keyed by variant.
///
/// A fatal error aborts the remaining tasks and is returned. Any other failure, including a
/// panicking task, is logged and replaced by `degrade(variant)` so siblings keep their results.
pub(crate) async fn fan_out<T, F, Fut, D>(
	stage: Stage,
	limit: usize,
	variants: Vec<usize>,
	mut task: F,
	degrade: D,
) -> Result<VariantMap<T>>
where
	T: Send + 'static,
	F: FnMut(usize) -> Fut,
	Fut: Future<Output = Result<T>> + Send + 'static,
	D: Fn(usize) -> T,
{
	let semaphore = Arc::new(Semaphore::new(limit.max(1)));
	let mut tasks = JoinSet::new();

	for variant in variants.iter().copied() {
		let semaphore = semaphore.clone();
		let fut = task(variant);

		tasks.spawn(async move {
			// The semaphore is never closed, so a failed acquire only means running unbounded.
			let _permit = semaphore.acquire_owned().await.ok();

			(variant, fut.await)
		});
	}

	let mut out = VariantMap::new();

	while let Some(joined) = tasks.join_next().await {
		match joined {
			Ok((variant, Ok(value))) => out.insert_new(stage, variant, value)?,
			Ok((variant, Err(err))) if err.is_fatal() => {
				tracing::error!(
					stage = stage.as_str(),
					variant,
					error = %err,
					"Fan-out task failed fatally; aborting siblings."
				);
				tasks.abort_all();

				return Err(err);
			},
			Ok((variant, Err(err))) => {
				tracing::warn!(
					stage = stage.as_str(),
					variant,
					error = %err,
					"Fan-out task failed; using fallback value."
				);
				out.insert_new(stage, variant, degrade(variant))?;
			},
			Err(err) => {
				tracing::error!(stage = stage.as_str(), error = %err, "Fan-out task panicked.");
			},
		}
	}

	for variant in variants {
		if !out.contains(variant) {
			out.insert_new(stage, variant, degrade(variant))?;
		}
	}

	Ok(out)
}

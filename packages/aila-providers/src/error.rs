pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Provider quota or rate limit exhausted: {message}")]
	QuotaExhausted { message: String },
	#[error("Provider returned HTTP {status}: {message}")]
	Status { status: u16, message: String },
}
impl Error {
	/// Quota and rate-limit failures must never be retried.
	pub fn is_quota(&self) -> bool {
		matches!(self, Self::QuotaExhausted { .. })
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid config: {message}")]
	InvalidConfig { message: String },
	#[error("Generation quota exhausted: {message}")]
	QuotaExhausted { message: String },
	#[error("{operation} failed after {attempts} attempts: {message}")]
	RetriesExhausted { operation: &'static str, attempts: u32, message: String },
	#[error("Invalid model output: {message}")]
	InvalidOutput { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
	#[error("Stage {stage} produced a second value for variant {variant}.")]
	StateConflict { stage: &'static str, variant: usize },
	#[error("Pipeline state is inconsistent at variant {variant}: {message}")]
	InconsistentState { variant: usize, message: String },
}
impl Error {
	/// Fatal errors abort the whole run instead of degrading one fan-out slot.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::InvalidRequest { .. }
				| Self::InvalidConfig { .. }
				| Self::QuotaExhausted { .. }
				| Self::RetriesExhausted { .. }
				| Self::StateConflict { .. }
				| Self::InconsistentState { .. }
		)
	}

	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::InvalidOutput { .. } | Self::Provider { .. })
	}
}
impl From<aila_providers::Error> for Error {
	fn from(err: aila_providers::Error) -> Self {
		match err {
			aila_providers::Error::QuotaExhausted { message } => Self::QuotaExhausted { message },
			other => Self::Provider { message: other.to_string() },
		}
	}
}
impl From<aila_index::Error> for Error {
	fn from(err: aila_index::Error) -> Self {
		Self::Index { message: err.to_string() }
	}
}

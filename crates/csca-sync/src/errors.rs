use std::fmt;

/// Classification of a pipeline failure. Every stage maps its faults onto
/// exactly one of these codes at its public boundary; nothing downstream of a
/// stage ever sees a raw transport, decoder or driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
	/// Token acquisition failed (either token step).
	Authentication,
	/// Bundle download failed.
	ExternalService,
	/// CMS/ASN.1 decoding failed.
	Technical,
	/// Persistence failed.
	Database,
	/// Payload failed a domain check.
	Validation,
	/// Startup configuration invalid or missing.
	Configuration,
	/// An operation timed out (timeouts are usually surfaced under the
	/// owning stage's code instead).
	Timeout,
}

impl ErrorCode {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorCode::Authentication => "AUTHENTICATION_ERROR",
			ErrorCode::ExternalService => "EXTERNAL_SERVICE_ERROR",
			ErrorCode::Technical => "TECHNICAL_ERROR",
			ErrorCode::Database => "DATABASE_ERROR",
			ErrorCode::Validation => "VALIDATION_ERROR",
			ErrorCode::Configuration => "CONFIGURATION_ERROR",
			ErrorCode::Timeout => "TIMEOUT_ERROR",
		}
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A typed stage failure. Carries the code, a stable human message and,
/// usually, the rendered underlying fault as `details`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
	pub code: ErrorCode,
	pub message: String,
	pub details: Option<String>,
}

impl PipelineError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		PipelineError {
			code,
			message: message.into(),
			details: None,
		}
	}

	pub fn with_details(mut self, details: impl Into<String>) -> Self {
		self.details = Some(details.into());
		self
	}

	/// The adapter-boundary bridge: converts an arbitrary fallible core's
	/// error into a typed failure. Meant for `map_err` at the single public
	/// method of each adapter:
	///
	/// ```ignore
	/// self.fetch().await.map_err(PipelineError::wrap(ErrorCode::Authentication, "..."))
	/// ```
	pub fn wrap<E: fmt::Display>(
		code: ErrorCode,
		message: &'static str,
	) -> impl FnOnce(E) -> PipelineError {
		move |err| PipelineError::new(code, message).with_details(err.to_string())
	}
}

impl fmt::Display for PipelineError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.code, self.message)?;
		if let Some(details) = &self.details {
			write!(f, " ({details})")?;
		}
		Ok(())
	}
}

impl std::error::Error for PipelineError {}

pub type PipelineResult<T> = Result<T, PipelineError>;

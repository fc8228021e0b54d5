use std::{error::Error as StdError, fmt, io};

/// Type alias for the `Result` type returned by `onnx_inspect` functions.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error returned while loading or validating a model.
pub struct Error {
	code: ErrorCode,
	message: String,
	cause: Option<Box<dyn StdError + Send + Sync + 'static>>
}

impl fmt::Debug for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Error")
			.field("code", &self.code)
			.field("message", &self.message)
			.field("cause", &self.cause)
			.finish()
	}
}

impl Error {
	/// Creates an [`Error`] with the given [`ErrorCode`] and message.
	pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
		Self { code, message: msg.into(), cause: None }
	}

	/// Creates an [`Error`] with the given [`ErrorCode`] and message, recording `cause` as its source.
	pub fn with_cause<T: StdError + Send + Sync + 'static>(code: ErrorCode, msg: impl Into<String>, cause: T) -> Self {
		Self {
			code,
			message: msg.into(),
			cause: Some(Box::new(cause))
		}
	}

	/// Prefixes the message with `ctx`, e.g. the path of the file being loaded.
	pub(crate) fn context(self, ctx: impl fmt::Display) -> Self {
		Self {
			message: format!("{ctx}: {}", self.message),
			..self
		}
	}

	pub fn code(&self) -> ErrorCode {
		self.code
	}

	/// Whether this is a load or a validation failure.
	pub fn kind(&self) -> ErrorKind {
		self.code.kind()
	}

	pub fn message(&self) -> &str {
		self.message.as_str()
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.cause.as_ref().map(|x| &**x as &dyn StdError)
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		let code = match e.kind() {
			io::ErrorKind::NotFound => ErrorCode::NoSuchFile,
			_ => ErrorCode::Unreadable
		};
		let message = match code {
			ErrorCode::NoSuchFile => String::from("file not found"),
			_ => format!("file could not be read: {e}")
		};
		Error::with_cause(code, message, e)
	}
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
	/// The model file does not exist.
	NoSuchFile,
	/// The model file exists but could not be read (permissions, a directory, I/O failure).
	Unreadable,
	/// The file contents are not a serialized ONNX model.
	InvalidProtobuf,
	/// The graph references are inconsistent: dangling or duplicate names, cycles, missing types.
	InvalidGraph,
	/// Opset imports are missing or do not cover a node's domain.
	InvalidOpset
}

impl ErrorCode {
	pub fn kind(self) -> ErrorKind {
		match self {
			ErrorCode::NoSuchFile | ErrorCode::Unreadable | ErrorCode::InvalidProtobuf => ErrorKind::Load,
			ErrorCode::InvalidGraph | ErrorCode::InvalidOpset => ErrorKind::Validation
		}
	}
}

/// The two fatal failure classes of an inspection run.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ErrorKind {
	/// The file is missing, unreadable, or not parseable as ONNX.
	Load,
	/// The file parses but fails structural well-formedness checks.
	Validation
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ErrorKind::Load => f.write_str("failed to load model"),
			ErrorKind::Validation => f.write_str("model failed validation")
		}
	}
}

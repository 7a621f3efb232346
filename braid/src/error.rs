// SPDX-License-Identifier: Apache-2.0

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::{io, result};

pub type Result<T = ()> = result::Result<T, Error>;

type Source = std::sync::Arc<dyn StdError + Send + Sync>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ErrorKind {
	#[error("operation cancelled")]
	Cancelled,
	#[error("premature end-of-stream")]
	Eos,
	#[error("invalid UTF-8")]
	InvalidUtf8,
	#[error("IO error")]
	Io,
	#[error("illegal argument: {0}")]
	IllegalArgument(&'static str),
	#[error("illegal state: {0}")]
	IllegalState(&'static str),
	#[error("closed resource")]
	Closed,
}

/// The error type for buffer, stream and sink-queue operations. Errors are
/// cheap to clone; the sink queue stores the first emitter failure and replays
/// a clone of it to every subsequent producer call.
#[derive(Clone, Debug)]
pub struct Error {
	kind: ErrorKind,
	source: Option<Source>,
}

impl Error {
	fn new(kind: ErrorKind, source: Option<Source>) -> Self {
		Self { kind, source }
	}

	/// Creates a new "cancelled" error.
	pub fn cancelled() -> Self { Self::new(ErrorKind::Cancelled, None) }

	/// Creates a new "end-of-stream" error.
	pub fn eos() -> Self { Self::new(ErrorKind::Eos, None) }

	/// Creates a new "closed" error.
	pub fn closed() -> Self { Self::new(ErrorKind::Closed, None) }

	/// Creates a new IO error.
	pub fn io(error: io::Error) -> Self {
		let source: Source = std::sync::Arc::new(error);
		Self::new(ErrorKind::Io, Some(source))
	}

	/// Creates a new UTF-8 decode error.
	pub fn invalid_utf8(error: impl StdError + Send + Sync + 'static) -> Self {
		let source: Source = std::sync::Arc::new(error);
		Self::new(ErrorKind::InvalidUtf8, Some(source))
	}

	/// Creates a new precondition-violation error.
	pub fn illegal_argument(message: &'static str) -> Self {
		Self::new(ErrorKind::IllegalArgument(message), None)
	}

	/// Creates a new invariant-violation error.
	pub fn illegal_state(message: &'static str) -> Self {
		Self::new(ErrorKind::IllegalState(message), None)
	}

	/// Returns the error kind.
	pub fn kind(&self) -> ErrorKind { self.kind }

	/// Returns `true` for cancellation errors. Cancellation takes precedence
	/// over other pending errors at suspension points.
	pub fn is_cancelled(&self) -> bool { self.kind == ErrorKind::Cancelled }
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.kind, f)
	}
}

impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source
			.as_ref()
			.map(|src| &**src as &(dyn StdError + 'static))
	}
}

impl From<io::Error> for Error {
	fn from(value: io::Error) -> Self {
		if let io::ErrorKind::UnexpectedEof = value.kind() {
			Self::eos()
		} else {
			Self::io(value)
		}
	}
}

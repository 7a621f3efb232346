// SPDX-License-Identifier: Apache-2.0

//! The minimal byte source/sink contracts the buffer core is written against.
//! Concrete file, socket and compression adapters live outside this crate and
//! implement these traits.

use crate::{Buffer, Result};

/// A reader of bytes into a [`Buffer`].
pub trait Source {
	/// Appends up to `byte_count` bytes to `sink`, returning the number of
	/// bytes read, or `None` at end-of-stream.
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>>;

	/// Closes the source. Closing is idempotent.
	fn close_source(&mut self) -> Result { Ok(()) }
}

/// A writer of bytes out of a [`Buffer`].
pub trait Sink {
	/// Transfers exactly `byte_count` bytes from the front of `source`,
	/// consuming them.
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result;

	/// Forces any intermediary to commit buffered bytes.
	fn flush(&mut self) -> Result { Ok(()) }

	/// Flushes and closes the sink. Closing is idempotent.
	fn close_sink(&mut self) -> Result { self.flush() }
}

impl Buffer {
	/// Reads from `source` until end-of-stream, returning the number of bytes
	/// appended.
	pub fn write_all_from(&mut self, source: &mut impl Source) -> Result<usize> {
		let mut total = 0;
		while let Some(read) = source.read(self, crate::SEGMENT_SIZE)? {
			total += read;
		}
		Ok(total)
	}

	/// Drains the whole buffer into `sink`, returning the number of bytes
	/// written.
	pub fn read_all_to(&mut self, sink: &mut impl Sink) -> Result<usize> {
		let count = self.size();
		if count > 0 {
			sink.write(self, count)?;
		}
		Ok(count)
	}
}

impl Source for &[u8] {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		if self.is_empty() && byte_count > 0 {
			return Ok(None);
		}
		let count = byte_count.min(self.len());
		sink.write_from_slice(&self[..count])?;
		*self = &self[count..];
		Ok(Some(count))
	}
}

impl Sink for Vec<u8> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		source.require(byte_count)?;
		let start = self.len();
		self.resize(start + byte_count, 0);
		source.read_into_slice_exact(&mut self[start..])
	}
}

impl Source for Buffer {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		if self.is_empty() && byte_count > 0 {
			return Ok(None);
		}
		let count = byte_count.min(self.size());
		self.move_to(sink, count)?;
		Ok(Some(count))
	}
}

impl Sink for Buffer {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		source.move_to(self, byte_count)
	}
}

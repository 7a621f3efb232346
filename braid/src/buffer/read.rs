// SPDX-License-Identifier: Apache-2.0

use std::mem;
use crate::{pool, Error, Result};
use super::Buffer;

macro_rules! gen_int_reads {
	($($name:ident $le_name:ident $ty:ident),+ $(,)?) => {
		$(
		#[doc = concat!(" Reads one big-endian [`", stringify!($ty), "`].")]
		pub fn $name(&mut self) -> Result<$ty> {
			let mut bytes = [0; mem::size_of::<$ty>()];
			self.read_into_slice_exact(&mut bytes)?;
			Ok(<$ty>::from_be_bytes(bytes))
		}

		#[doc = concat!(" Reads one little-endian [`", stringify!($ty), "`].")]
		pub fn $le_name(&mut self) -> Result<$ty> {
			let mut bytes = [0; mem::size_of::<$ty>()];
			self.read_into_slice_exact(&mut bytes)?;
			Ok(<$ty>::from_le_bytes(bytes))
		}
		)+
	};
}

impl Buffer {
	/// Returns an end-of-stream error unless at least `byte_count` bytes are
	/// readable.
	pub fn require(&self, byte_count: usize) -> Result {
		if self.size() >= byte_count {
			Ok(())
		} else {
			Err(Error::eos())
		}
	}

	/// Reads one byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		let mut byte = [0];
		self.read_into_slice_exact(&mut byte)?;
		Ok(byte[0])
	}

	/// Reads one signed byte.
	pub fn read_i8(&mut self) -> Result<i8> {
		Ok(self.read_u8()? as i8)
	}

	gen_int_reads! {
		read_u16 read_u16_le u16,
		read_i16 read_i16_le i16,
		read_u32 read_u32_le u32,
		read_i32 read_i32_le i32,
		read_u64 read_u64_le u64,
		read_i64 read_i64_le i64,
	}

	/// Reads bytes into `dst`, returning the number of bytes read.
	pub fn read_into_slice(&mut self, dst: &mut [u8]) -> usize {
		let mut read = 0;
		while read < dst.len() {
			let Some(head) = self.segments.front_mut() else { break };
			let chunk = head.as_read_bytes();
			if chunk.is_empty() {
				if let Some(empty) = self.remove_head() {
					pool::recycle(empty);
				}
				continue;
			}
			let count = chunk.len().min(dst.len() - read);
			dst[read..read + count].copy_from_slice(&chunk[..count]);
			head.consume(count);
			read += count;
			self.size -= count;
		}
		self.trim_head();
		read
	}

	/// Fills `dst` exactly, or returns end-of-stream without consuming
	/// anything.
	pub fn read_into_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		self.require(dst.len())?;
		let read = self.read_into_slice(dst);
		debug_assert_eq!(read, dst.len());
		Ok(())
	}

	/// Discards up to `byte_count` bytes from the head, returning the number
	/// discarded.
	pub fn skip(&mut self, byte_count: usize) -> usize {
		let mut skipped = 0;
		while skipped < byte_count {
			let Some(head) = self.segments.front_mut() else { break };
			let len = head.len();
			if len == 0 {
				if let Some(empty) = self.remove_head() {
					pool::recycle(empty);
				}
				continue;
			}
			let count = len.min(byte_count - skipped);
			head.consume(count);
			skipped += count;
			self.size -= count;
		}
		self.trim_head();
		skipped
	}

	/// Consumes the whole buffer into a `Vec`.
	pub fn read_to_vec(&mut self) -> Vec<u8> {
		let mut vec = vec![0; self.size()];
		let read = self.read_into_slice(&mut vec);
		vec.truncate(read);
		vec
	}

	/// Consumes `byte_count` bytes and decodes them as UTF-8, replacing
	/// malformed sequences with U+FFFD.
	pub fn read_utf8(&mut self, byte_count: usize) -> String {
		self.read_byte_str(byte_count).to_string_lossy()
	}

	/// Consumes the whole buffer, decoding with U+FFFD replacement.
	pub fn read_utf8_all(&mut self) -> String {
		self.read_utf8(self.size())
	}

	/// Consumes `byte_count` bytes and decodes them as strict UTF-8. The bytes
	/// are consumed even when decoding fails.
	pub fn decode_utf8(&mut self, byte_count: usize) -> Result<String> {
		self.require(byte_count)?;
		let mut bytes = vec![0; byte_count];
		self.read_into_slice_exact(&mut bytes)?;
		simdutf8::compat::from_utf8(&bytes).map_err(Error::invalid_utf8)?;
		// Validated above; from_utf8 cannot fail here.
		String::from_utf8(bytes).map_err(Error::invalid_utf8)
	}

	/// Recycles a fully-consumed head segment.
	fn trim_head(&mut self) {
		while matches!(self.segments.front(), Some(head) if head.is_empty()) {
			if let Some(empty) = self.segments.pop_front() {
				pool::recycle(empty);
			}
		}
	}
}

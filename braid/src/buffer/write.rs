// SPDX-License-Identifier: Apache-2.0

use crate::{Error, Result};
use super::Buffer;

macro_rules! gen_int_writes {
	($($name:ident $le_name:ident $ty:ident),+ $(,)?) => {
		$(
		#[doc = concat!(" Writes one big-endian [`", stringify!($ty), "`].")]
		pub fn $name(&mut self, value: $ty) -> Result {
			self.write_from_slice(&value.to_be_bytes())
		}

		#[doc = concat!(" Writes one little-endian [`", stringify!($ty), "`].")]
		pub fn $le_name(&mut self, value: $ty) -> Result {
			self.write_from_slice(&value.to_le_bytes())
		}
		)+
	};
}

impl Buffer {
	/// Writes one byte.
	pub fn write_u8(&mut self, value: u8) -> Result {
		self.write_to_tail(1, |space| {
			space[0] = value;
			Ok(1)
		})?;
		Ok(())
	}

	/// Writes one signed byte.
	pub fn write_i8(&mut self, value: i8) -> Result {
		self.write_u8(value as u8)
	}

	gen_int_writes! {
		write_u16 write_u16_le u16,
		write_i16 write_i16_le i16,
		write_u32 write_u32_le u32,
		write_i32 write_i32_le i32,
		write_u64 write_u64_le u64,
		write_i64 write_i64_le i64,
	}

	/// Appends all bytes of `value` at the tail.
	pub fn write_from_slice(&mut self, mut value: &[u8]) -> Result {
		while !value.is_empty() {
			let written = self.write_to_tail(1, |space| {
				let count = space.len().min(value.len());
				space[..count].copy_from_slice(&value[..count]);
				Ok(count)
			})?;
			if written == 0 {
				return Err(Error::illegal_state("writable tail accepted no bytes"));
			}
			value = &value[written..];
		}
		Ok(())
	}

	/// Appends `value` encoded as UTF-8.
	pub fn write_utf8(&mut self, value: &str) -> Result {
		self.write_from_slice(value.as_bytes())
	}
}

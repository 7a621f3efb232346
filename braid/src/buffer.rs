// SPDX-License-Identifier: Apache-2.0

mod read;
mod write;

use std::collections::VecDeque;
use std::fmt;
use crate::{pool, ByteString, Error, Result};
use crate::segment::{Segment, SHARE_MINIMUM, SIZE};

/// An ordered queue of segments with aggregate byte-size bookkeeping. Bytes
/// are written at the tail and read from the head, FIFO by construction. Only
/// the tail segment is ever a write target; interior segments only shrink as
/// the head is consumed.
#[derive(Default)]
pub struct Buffer {
	segments: VecDeque<Segment>,
	size: usize,
}

impl Buffer {
	/// Creates an empty buffer.
	pub fn new() -> Self { Self::default() }

	/// Returns the number of readable bytes.
	pub fn size(&self) -> usize { self.size }

	/// Returns `true` if the buffer holds no readable bytes.
	pub fn is_empty(&self) -> bool { self.size == 0 }

	/// Peeks the first segment.
	pub fn head(&self) -> Option<&Segment> { self.segments.front() }

	/// Peeks the last segment.
	pub fn tail(&self) -> Option<&Segment> { self.segments.back() }

	pub(crate) fn iter_segments(&self) -> impl Iterator<Item = &Segment> {
		self.segments.iter()
	}

	/// Returns the tail as an owner segment with at least `min_capacity` free
	/// bytes, claiming a fresh segment from the pool when the current tail is
	/// absent, shared, or lacks room. `min_capacity` must be in `[1, SIZE]`.
	pub fn writable_tail(&mut self, min_capacity: usize) -> Result<&mut Segment> {
		if !(1..=SIZE).contains(&min_capacity) {
			return Err(Error::illegal_argument("min_capacity out of [1, SIZE]"));
		}
		let needs_fresh = match self.segments.back() {
			Some(tail) => !tail.is_owner() || tail.tail_space() < min_capacity,
			None => true,
		};
		if needs_fresh {
			self.segments.push_back(pool::take());
		}
		match self.segments.back_mut() {
			Some(tail) => Ok(tail),
			None => Err(Error::illegal_state("buffer has no tail after claim")),
		}
	}

	/// Runs `writer` against the free space of a writable tail with at least
	/// `min_capacity` bytes, then commits the returned byte count by advancing
	/// the tail's write cursor and the buffer size. Nothing is committed when
	/// `writer` fails.
	pub fn write_to_tail(
		&mut self,
		min_capacity: usize,
		writer: impl FnOnce(&mut [u8]) -> Result<usize>,
	) -> Result<usize> {
		let tail = self.writable_tail(min_capacity)?;
		let Some(space) = tail.writable() else {
			return Err(Error::illegal_state("writable tail is not an owner"));
		};
		let capacity = space.len();
		let written = writer(space)?;
		if written > capacity {
			return Err(Error::illegal_argument("writer committed past capacity"));
		}
		tail.commit(written);
		self.increment_size(written);
		Ok(written)
	}

	/// Detaches and returns the first segment, adjusting the byte size. The
	/// caller is responsible for recycling it.
	pub(crate) fn remove_head(&mut self) -> Option<Segment> {
		let seg = self.segments.pop_front()?;
		self.decrement_size(seg.len());
		Some(seg)
	}

	/// Splits the head so that it holds exactly `byte_count` bytes, keeping
	/// the remainder in place behind it. No-op when the head is already short
	/// enough.
	pub(crate) fn split_head(&mut self, byte_count: usize) {
		if let Some(head) = self.segments.front_mut() {
			if byte_count < head.len() {
				let prefix = head.split(byte_count);
				self.segments.push_front(prefix);
			}
		}
	}

	/// Appends a segment at the tail, coalescing small payloads into the
	/// current tail instead of queueing an extra segment.
	pub(crate) fn push_segment(&mut self, mut seg: Segment) {
		if seg.len() < SHARE_MINIMUM {
			if let Some(tail) = self.segments.back_mut() {
				let moved = seg.write_to(tail, seg.len());
				self.increment_size(moved);
			}
		}
		if seg.is_empty() {
			pool::recycle(seg);
			return;
		}
		self.increment_size(seg.len());
		self.segments.push_back(seg);
	}

	/// Appends a segment at the tail without coalescing or pool traffic. The
	/// emitter drains through this path, which never claims segments.
	pub(crate) fn push_raw(&mut self, seg: Segment) {
		if seg.is_empty() {
			pool::recycle(seg);
			return;
		}
		self.increment_size(seg.len());
		self.segments.push_back(seg);
	}

	pub(crate) fn increment_size(&mut self, byte_count: usize) {
		self.size += byte_count;
	}

	pub(crate) fn decrement_size(&mut self, byte_count: usize) {
		debug_assert!(byte_count <= self.size);
		self.size -= byte_count;
	}

	/// Moves `byte_count` bytes from the front of this buffer to the tail of
	/// `dst`. Whole segments transfer by detach-and-append; a partial head is
	/// shared when large and copied when under the share threshold.
	pub fn move_to(&mut self, dst: &mut Buffer, mut byte_count: usize) -> Result {
		if byte_count > self.size {
			return Err(Error::eos());
		}
		while byte_count > 0 {
			let head_len = match self.segments.front() {
				Some(head) => head.len(),
				None => return Err(Error::illegal_state("buffer size out of sync")),
			};
			if head_len == 0 {
				if let Some(empty) = self.remove_head() {
					pool::recycle(empty);
				}
			} else if head_len <= byte_count {
				let Some(seg) = self.remove_head() else { break };
				byte_count -= seg.len();
				dst.push_segment(seg);
			} else if byte_count < SHARE_MINIMUM {
				let tail = dst.writable_tail(1)?;
				let Some(head) = self.segments.front_mut() else { break };
				let moved = head.write_to(tail, byte_count);
				if moved == 0 {
					return Err(Error::illegal_state("writable tail rejected move"));
				}
				self.decrement_size(moved);
				dst.increment_size(moved);
				byte_count -= moved;
			} else {
				self.split_head(byte_count);
			}
		}
		Ok(())
	}

	/// Moves the front `byte_count` bytes into `dst` by sharing alone: whole
	/// segments detach, a partial head splits. Never claims from the pool.
	pub(crate) fn carve_front(&mut self, dst: &mut Buffer, mut byte_count: usize) {
		while byte_count > 0 {
			self.split_head(byte_count);
			let Some(seg) = self.remove_head() else { break };
			byte_count -= seg.len();
			dst.push_raw(seg);
		}
	}

	/// Copies `byte_count` bytes starting at `offset` into `dst` without
	/// consuming them, by sharing the overlapped segments. Segment-aligned
	/// ranges transfer with no byte copies; small ragged edges coalesce into
	/// `dst`'s tail.
	pub fn copy_to(&mut self, dst: &mut Buffer, mut offset: usize, mut byte_count: usize) -> Result {
		let end = offset
			.checked_add(byte_count)
			.ok_or_else(|| Error::illegal_argument("copy range overflows"))?;
		if end > self.size {
			return Err(Error::illegal_argument("copy range exceeds buffer size"));
		}
		for seg in self.segments.iter_mut() {
			if byte_count == 0 { break }
			let len = seg.len();
			if offset >= len {
				offset -= len;
				continue;
			}
			let take = (len - offset).min(byte_count);
			let mut view = seg.share();
			view.consume(offset);
			view.truncate(take);
			offset = 0;
			byte_count -= take;
			dst.push_segment(view);
		}
		Ok(())
	}

	/// Takes an immutable snapshot of the whole buffer as a byte string,
	/// sharing segment blocks instead of copying them.
	pub fn to_byte_string(&mut self) -> ByteString {
		let segments = self.segments
			.iter_mut()
			.filter(|seg| !seg.is_empty())
			.map(Segment::share)
			.collect();
		ByteString::from_segments(segments)
	}

	/// Consumes up to `byte_count` bytes from the head into an immutable byte
	/// string, sharing blocks where a segment is only partially taken.
	pub fn read_byte_str(&mut self, byte_count: usize) -> ByteString {
		let mut count = byte_count.min(self.size);
		let mut segments = Vec::new();
		while count > 0 {
			self.split_head(count);
			let Some(seg) = self.remove_head() else { break };
			count -= seg.len();
			if seg.is_empty() {
				pool::recycle(seg);
			} else {
				segments.push(seg);
			}
		}
		ByteString::from_segments(segments)
	}

	/// Appends a byte string by sharing its segments; no bytes are copied for
	/// segments above the share threshold.
	pub fn write_byte_str(&mut self, value: &ByteString) {
		for seg in value.alias_segments() {
			self.push_segment(seg);
		}
	}

	/// Iterates the readable bytes without consuming them.
	pub fn peek(&self) -> impl Iterator<Item = u8> + '_ {
		self.segments
			.iter()
			.flat_map(|seg| seg.as_read_bytes().iter().copied())
	}

	/// Recycles every segment, leaving the buffer empty.
	pub fn clear(&mut self) {
		for seg in self.segments.drain(..) {
			pool::recycle(seg);
		}
		self.size = 0;
	}
}

impl Drop for Buffer {
	fn drop(&mut self) {
		self.clear();
	}
}

impl fmt::Debug for Buffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Buffer")
			.field("size", &self.size)
			.field("segments", &self.segments.len())
			.finish()
	}
}

impl PartialEq<[u8]> for Buffer {
	fn eq(&self, other: &[u8]) -> bool {
		self.size == other.len() && self.peek().eq(other.iter().copied())
	}
}

impl PartialEq<&[u8]> for Buffer {
	fn eq(&self, other: &&[u8]) -> bool { *self == **other }
}

#[cfg(test)]
mod test {
	use super::Buffer;
	use crate::segment::SIZE;

	fn filled(len: usize) -> Buffer {
		let mut buf = Buffer::new();
		let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
		buf.write_from_slice(&data).unwrap();
		buf
	}

	#[test]
	fn size_matches_segment_sum() {
		let buf = filled(SIZE * 2 + 100);
		let sum: usize = buf.iter_segments().map(|seg| seg.len()).sum();
		assert_eq!(buf.size(), sum);
	}

	#[test]
	fn move_whole_segments_shares_nothing() {
		let mut src = filled(SIZE);
		let id = src.head().unwrap().id();
		let mut dst = Buffer::new();
		src.move_to(&mut dst, SIZE).unwrap();
		assert!(src.is_empty());
		assert_eq!(dst.size(), SIZE);
		assert_eq!(dst.head().unwrap().id(), id, "whole segment moved, not copied");
		assert!(dst.head().unwrap().is_owner());
	}

	#[test]
	fn small_move_copies_instead_of_sharing() {
		let mut src = filled(SIZE);
		let mut dst = Buffer::new();
		src.move_to(&mut dst, 100).unwrap();
		assert_eq!(src.size(), SIZE - 100);
		assert_eq!(dst.size(), 100);
		assert!(src.head().unwrap().is_owner(), "small move must not alias the block");
	}

	#[test]
	fn copy_to_is_non_consuming() {
		let mut src = filled(SIZE + 50);
		let mut dst = Buffer::new();
		src.copy_to(&mut dst, 10, SIZE).unwrap();
		assert_eq!(src.size(), SIZE + 50);
		assert_eq!(dst.size(), SIZE);
		let expected: Vec<u8> = (10..10 + SIZE).map(|i| i as u8).collect();
		assert!(dst == expected.as_slice());
	}

	#[test]
	fn copy_to_rejects_out_of_range() {
		let mut src = filled(16);
		let mut dst = Buffer::new();
		assert!(src.copy_to(&mut dst, 10, 7).is_err());
	}

	#[test]
	fn write_to_tail_rolls_back_on_error() {
		let mut buf = filled(3);
		let failed: crate::Result<usize> = buf.write_to_tail(8, |_| {
			Err(crate::Error::illegal_state("writer bailed"))
		});
		assert!(failed.is_err());
		assert_eq!(buf.size(), 3, "no commit after writer failure");
	}
}

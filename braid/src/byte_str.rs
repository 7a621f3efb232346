// SPDX-License-Identifier: Apache-2.0

mod encoding;
mod iter;

pub use iter::CodePoints;

use std::cmp::Ordering;
use std::fmt;
use once_cell::sync::OnceCell;
use crate::{Error, Result};
use crate::segment::Segment;

/// An immutable, shareable string of bytes stored in segments. Created from a
/// [`Buffer`] without copying segment bodies; only the directory is fresh.
///
/// The directory has `2·N` entries for `N` segments: the first half holds
/// cumulative byte counts through each segment, the second half each
/// segment's starting position within its block. Byte addressing binary
/// searches the first half.
///
/// [`Buffer`]: crate::Buffer
pub struct ByteString {
	segments: Box<[Segment]>,
	directory: Box<[usize]>,
	meta: OnceCell<Meta>,
	/// Decode as ASCII only: every high-bit byte becomes U+FFFD.
	ascii_decode: bool,
}

#[derive(Copy, Clone, Debug)]
struct Meta {
	code_points: usize,
	utf16_len: usize,
	is_ascii: bool,
}

impl ByteString {
	/// Returns the empty byte string.
	pub fn empty() -> Self {
		Self::from_segments(Vec::new())
	}

	pub(crate) fn from_segments(segments: Vec<Segment>) -> Self {
		let n = segments.len();
		let mut directory = vec![0; 2 * n];
		let mut total = 0;
		for (i, seg) in segments.iter().enumerate() {
			total += seg.len();
			directory[i] = total;
			directory[n + i] = seg.pos();
		}
		Self {
			segments: segments.into(),
			directory: directory.into(),
			meta: OnceCell::new(),
			ascii_decode: false,
		}
	}

	/// Builds a byte string that decodes as ASCII: code-point iteration maps
	/// every high-bit byte to U+FFFD instead of attempting UTF-8.
	pub fn ascii(bytes: &[u8]) -> Self {
		let mut str = Self::from(bytes);
		str.ascii_decode = true;
		str
	}

	/// Returns the length in bytes.
	pub fn byte_size(&self) -> usize {
		let n = self.segments.len();
		if n == 0 { 0 } else { self.directory[n - 1] }
	}

	/// Returns `true` if the string holds no bytes.
	pub fn is_empty(&self) -> bool { self.byte_size() == 0 }

	/// Returns the byte at `index`, or `None` out of bounds. Binary searches
	/// the directory for the owning segment.
	pub fn get_byte(&self, index: usize) -> Option<u8> {
		if index >= self.byte_size() {
			return None;
		}
		let n = self.segments.len();
		let seg = self.directory[..n].partition_point(|&end| end <= index);
		let prefix = if seg == 0 { 0 } else { self.directory[seg - 1] };
		let offset = self.directory[n + seg] + (index - prefix);
		Some(self.segments[seg].block_byte(offset))
	}

	/// Returns the number of code points, scanning and caching on first use.
	/// ASCII strings answer without decoding.
	pub fn length(&self) -> usize {
		self.meta().code_points
	}

	/// Returns the length in UTF-16 code units; supplementary-plane code
	/// points count twice.
	pub fn len_utf16(&self) -> usize {
		self.meta().utf16_len
	}

	/// Returns `true` if no byte has the high bit set. Computed by the same
	/// scan that counts code points.
	pub fn is_ascii(&self) -> bool {
		self.meta().is_ascii
	}

	/// Iterates decoded code points. The iterator is finite and a fresh one
	/// starts from the beginning. Malformed sequences decode to U+FFFD; see
	/// [`CodePoints`] for the exact rules.
	pub fn code_points(&self) -> CodePoints<'_> {
		CodePoints::new(&self.segments, self.ascii_decode)
	}

	/// Carves the sub-string `[start, end)` by sharing segment blocks; only a
	/// new directory is allocated.
	pub fn substring(&self, start: usize, end: usize) -> Result<Self> {
		let size = self.byte_size();
		if start > end || end > size {
			return Err(Error::illegal_argument("substring range out of bounds"));
		}
		if start == end {
			return Ok(Self::empty());
		}
		if start == 0 && end == size {
			return Ok(self.share());
		}

		let n = self.segments.len();
		let first = self.directory[..n].partition_point(|&sum| sum <= start);
		let last = self.directory[..n].partition_point(|&sum| sum <= end - 1);

		let mut segments = Vec::with_capacity(last - first + 1);
		for seg in &self.segments[first..=last] {
			segments.push(seg.alias());
		}
		let prefix = if first == 0 { 0 } else { self.directory[first - 1] };
		segments[0].consume(start - prefix);
		let mut remaining = end - start;
		for seg in segments.iter_mut() {
			seg.truncate(remaining);
			remaining -= seg.len();
		}

		let mut sub = Self::from_segments(segments);
		sub.ascii_decode = self.ascii_decode;
		Ok(sub)
	}

	/// Shares the whole string; segment blocks are aliased, not copied.
	pub fn share(&self) -> Self {
		let mut shared = Self::from_segments(
			self.segments.iter().map(Segment::alias).collect(),
		);
		shared.ascii_decode = self.ascii_decode;
		shared.meta = self.meta.clone();
		shared
	}

	/// Materializes the logical byte sequence into one contiguous vector.
	pub fn to_vec(&self) -> Vec<u8> {
		let mut vec = Vec::with_capacity(self.byte_size());
		for slice in self.slices() {
			vec.extend_from_slice(slice);
		}
		vec
	}

	/// Decodes the bytes as strict UTF-8.
	pub fn utf8(&self) -> Result<String> {
		let bytes = self.to_vec();
		simdutf8::compat::from_utf8(&bytes).map_err(Error::invalid_utf8)?;
		String::from_utf8(bytes).map_err(Error::invalid_utf8)
	}

	/// Decodes the bytes with U+FFFD replacement, honoring the ASCII decode
	/// mode.
	pub fn to_string_lossy(&self) -> String {
		self.code_points().collect()
	}

	/// Returns a copy with ASCII letters lowercased. Materializes to a
	/// contiguous buffer first.
	pub fn to_ascii_lowercase(&self) -> Self {
		let mut bytes = self.to_vec();
		bytes.make_ascii_lowercase();
		let mut str = Self::from(bytes.as_slice());
		str.ascii_decode = self.ascii_decode;
		str
	}

	/// Returns a copy with ASCII letters uppercased. Materializes to a
	/// contiguous buffer first.
	pub fn to_ascii_uppercase(&self) -> Self {
		let mut bytes = self.to_vec();
		bytes.make_ascii_uppercase();
		let mut str = Self::from(bytes.as_slice());
		str.ascii_decode = self.ascii_decode;
		str
	}

	/// Iterates the logical bytes.
	pub fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
		self.slices().flat_map(|slice| slice.iter().copied())
	}

	/// Returns `true` if the string begins with `prefix`.
	pub fn starts_with(&self, prefix: &[u8]) -> bool {
		self.byte_size() >= prefix.len()
			&& self.bytes().zip(prefix.iter().copied()).all(|(a, b)| a == b)
	}

	/// Returns `true` if the string ends with `suffix`.
	pub fn ends_with(&self, suffix: &[u8]) -> bool {
		let size = self.byte_size();
		size >= suffix.len()
			&& self.bytes()
				.skip(size - suffix.len())
				.eq(suffix.iter().copied())
	}

	/// Returns the position of the first occurrence of `byte` at or after
	/// `start`.
	pub fn index_of(&self, byte: u8, start: usize) -> Option<usize> {
		self.bytes()
			.enumerate()
			.skip(start)
			.find_map(|(at, b)| (b == byte).then_some(at))
	}

	pub(crate) fn slices(&self) -> impl Iterator<Item = &[u8]> {
		self.segments.iter().map(Segment::as_read_bytes)
	}

	/// Clones the segment windows for appending this string to a buffer.
	pub(crate) fn alias_segments(&self) -> impl Iterator<Item = Segment> + '_ {
		self.segments.iter().map(Segment::alias)
	}

	#[cfg(test)]
	pub(crate) fn segment_ids(&self) -> Vec<usize> {
		self.segments.iter().map(Segment::id).collect()
	}

	fn meta(&self) -> Meta {
		*self.meta.get_or_init(|| self.full_scan())
	}

	/// Scans once, counting code points and UTF-16 units and detecting pure
	/// ASCII. ASCII content short-circuits without decoding.
	fn full_scan(&self) -> Meta {
		let is_ascii = self.slices().all(|slice| slice.is_ascii());
		if is_ascii {
			let size = self.byte_size();
			return Meta { code_points: size, utf16_len: size, is_ascii: true };
		}
		let mut code_points = 0;
		let mut utf16_len = 0;
		for cp in self.code_points() {
			code_points += 1;
			utf16_len += cp.len_utf16();
		}
		Meta { code_points, utf16_len, is_ascii: false }
	}
}

impl Default for ByteString {
	fn default() -> Self { Self::empty() }
}

impl From<&[u8]> for ByteString {
	fn from(value: &[u8]) -> Self {
		let mut segments = Vec::new();
		let mut rest = value;
		while !rest.is_empty() {
			let mut seg = Segment::new();
			let written = seg.push_slice(rest);
			rest = &rest[written..];
			segments.push(seg);
		}
		Self::from_segments(segments)
	}
}

impl From<&str> for ByteString {
	fn from(value: &str) -> Self {
		value.as_bytes().into()
	}
}

impl fmt::Debug for ByteString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ByteString[{} bytes]", self.byte_size())
	}
}

impl PartialEq for ByteString {
	fn eq(&self, other: &Self) -> bool {
		self.byte_size() == other.byte_size() && self.bytes().eq(other.bytes())
	}
}

impl Eq for ByteString { }

impl PartialEq<[u8]> for ByteString {
	fn eq(&self, other: &[u8]) -> bool {
		self.byte_size() == other.len() && self.bytes().eq(other.iter().copied())
	}
}

impl PartialEq<&[u8]> for ByteString {
	fn eq(&self, other: &&[u8]) -> bool { *self == **other }
}

impl PartialOrd for ByteString {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ByteString {
	/// Lexicographic unsigned-byte order over the logical sequence.
	fn cmp(&self, other: &Self) -> Ordering {
		self.bytes().cmp(other.bytes())
	}
}

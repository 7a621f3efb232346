// SPDX-License-Identifier: Apache-2.0

use pretty_assertions::assert_eq;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use braid::{Buffer, ErrorKind, SEGMENT_SIZE};
use braid::streams::{Sink, Source};

#[test]
fn write_then_read_all_byte_values() {
	let mut buf = Buffer::new();
	let data: Vec<u8> = (0..=255u8).collect();
	buf.write_from_slice(&data).unwrap();
	assert_eq!(buf.size(), 256);

	let mut read = [0u8; 256];
	buf.read_into_slice_exact(&mut read).unwrap();
	assert_eq!(read.to_vec(), data);
	assert_eq!(buf.size(), 0);
}

macro_rules! int_round_trip {
	($($name:ident $write:ident $read:ident $write_le:ident $read_le:ident $ty:ident),+ $(,)?) => {
		$(
		#[quickcheck]
		fn $name(value: $ty) -> TestResult {
			let mut buf = Buffer::new();
			buf.$write(value).unwrap();
			buf.$write_le(value).unwrap();
			assert_eq!(buf.size(), 2 * std::mem::size_of::<$ty>());
			assert_eq!(buf.$read().unwrap(), value, "big-endian");
			assert_eq!(buf.$read_le().unwrap(), value, "little-endian");
			TestResult::from_bool(buf.size() == 0)
		}
		)+
	};
}

int_round_trip! {
	short   write_u16 read_u16 write_u16_le read_u16_le u16,
	s_short write_i16 read_i16 write_i16_le read_i16_le i16,
	int     write_u32 read_u32 write_u32_le read_u32_le u32,
	s_int   write_i32 read_i32 write_i32_le read_i32_le i32,
	long    write_u64 read_u64 write_u64_le read_u64_le u64,
	s_long  write_i64 read_i64 write_i64_le read_i64_le i64,
}

#[quickcheck]
fn byte_round_trip(value: u8) {
	let mut buf = Buffer::new();
	buf.write_u8(value).unwrap();
	assert_eq!(buf.read_u8().unwrap(), value);
}

#[test]
fn big_endian_layout() {
	let mut buf = Buffer::new();
	buf.write_u32(0x0102_0304).unwrap();
	let mut bytes = [0; 4];
	buf.read_into_slice_exact(&mut bytes).unwrap();
	assert_eq!(bytes, [1, 2, 3, 4]);
}

#[test]
fn exact_read_past_end_consumes_nothing() {
	let mut buf = Buffer::new();
	buf.write_from_slice(b"abc").unwrap();
	let mut dst = [0; 8];
	let err = buf.read_into_slice_exact(&mut dst).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Eos);
	assert_eq!(buf.size(), 3, "failed exact read must not consume");
}

#[test]
fn read_u64_across_segment_boundary() {
	let mut buf = Buffer::new();
	buf.write_from_slice(&vec![0; SEGMENT_SIZE - 4]).unwrap();
	buf.write_u64(0xDEAD_BEEF_CAFE_F00D).unwrap();
	assert_eq!(buf.skip(SEGMENT_SIZE - 4), SEGMENT_SIZE - 4);
	assert_eq!(buf.read_u64().unwrap(), 0xDEAD_BEEF_CAFE_F00D);
}

#[test]
fn skip_caps_at_size() {
	let mut buf = Buffer::new();
	buf.write_from_slice(b"0123456789").unwrap();
	assert_eq!(buf.skip(4), 4);
	assert_eq!(buf.skip(100), 6);
	assert_eq!(buf.size(), 0);
}

#[quickcheck]
fn slice_round_trip(data: Vec<u8>) {
	let mut buf = Buffer::new();
	buf.write_from_slice(&data).unwrap();
	assert_eq!(buf.size(), data.len());
	assert_eq!(buf.read_to_vec(), data);
}

#[quickcheck]
fn move_between_buffers_preserves_order(data: Vec<u8>, at: usize) -> TestResult {
	if data.is_empty() || at >= data.len() {
		return TestResult::discard();
	}
	let mut src = Buffer::new();
	src.write_from_slice(&data).unwrap();

	let mut dst = Buffer::new();
	dst.write(&mut src, at).unwrap();
	assert_eq!(dst.size(), at);
	assert_eq!(src.size(), data.len() - at);
	dst.write(&mut src, data.len() - at).unwrap();
	assert_eq!(dst.read_to_vec(), data);
	TestResult::passed()
}

#[test]
fn source_reports_end_of_stream() {
	let mut empty = Buffer::new();
	let mut sink = Buffer::new();
	assert_eq!(empty.read(&mut sink, 10).unwrap(), None);

	let mut slice: &[u8] = b"xy";
	assert_eq!(slice.read(&mut sink, 10).unwrap(), Some(2));
	assert_eq!(slice.read(&mut sink, 10).unwrap(), None);
}

#[test]
fn utf8_write_and_strict_read() {
	let mut buf = Buffer::new();
	buf.write_utf8("grüße, 世界").unwrap();
	let text = buf.decode_utf8(buf.size()).unwrap();
	assert_eq!(text, "grüße, 世界");
}

#[test]
fn strict_read_rejects_malformed() {
	let mut buf = Buffer::new();
	buf.write_from_slice(b"ok\xFFnot").unwrap();
	let err = buf.decode_utf8(6).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::InvalidUtf8);
}

#[test]
fn lossy_read_replaces_malformed() {
	let mut buf = Buffer::new();
	buf.write_from_slice(b"ok\xFFka").unwrap();
	assert_eq!(buf.read_utf8(5), "ok\u{FFFD}ka");
}

#[test]
fn writable_tail_capacity_is_validated() {
	let mut buf = Buffer::new();
	assert!(matches!(
		buf.writable_tail(0).unwrap_err().kind(),
		ErrorKind::IllegalArgument(_)
	));
	assert!(matches!(
		buf.writable_tail(SEGMENT_SIZE + 1).unwrap_err().kind(),
		ErrorKind::IllegalArgument(_)
	));
	assert!(buf.writable_tail(SEGMENT_SIZE).is_ok());
}

#[test]
fn byte_str_round_trip_through_buffer() {
	let mut buf = Buffer::new();
	buf.write_from_slice(b"snapshot me").unwrap();
	let snapshot = buf.to_byte_string();
	assert_eq!(buf.size(), 11, "snapshot does not consume");

	let mut copy = Buffer::new();
	copy.write_byte_str(&snapshot);
	assert_eq!(copy.read_to_vec(), b"snapshot me");
}

#[test]
fn read_byte_str_consumes() {
	let mut buf = Buffer::new();
	buf.write_from_slice(b"head tail").unwrap();
	let head = buf.read_byte_str(4);
	assert_eq!(head, b"head"[..]);
	assert_eq!(buf.size(), 5);
	assert_eq!(buf.read_to_vec(), b" tail");
}

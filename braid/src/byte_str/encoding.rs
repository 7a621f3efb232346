// SPDX-License-Identifier: Apache-2.0

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};
use super::ByteString;

impl ByteString {
	/// Encodes the bytes as padded standard Base64.
	pub fn base64(&self) -> String {
		STANDARD.encode(self.to_vec())
	}

	/// Encodes the bytes as padded URL-safe Base64.
	pub fn base64_url(&self) -> String {
		URL_SAFE.encode(self.to_vec())
	}

	/// Decodes Base64 leniently: the standard and URL-safe alphabets mix
	/// freely, ASCII whitespace is skipped, trailing padding is optional. Any
	/// other character, or a dangling single trailing character, returns
	/// `None`.
	pub fn from_base64(input: &str) -> Option<Self> {
		let mut normalized = Vec::with_capacity(input.len());
		for byte in input.bytes() {
			match byte {
				b' ' | b'\t' | b'\r' | b'\n' => continue,
				b'-' => normalized.push(b'+'),
				b'_' => normalized.push(b'/'),
				_ => normalized.push(byte),
			}
		}
		while normalized.last() == Some(&b'=') {
			normalized.pop();
		}
		let bytes = STANDARD_NO_PAD.decode(normalized).ok()?;
		Some(bytes.as_slice().into())
	}

	/// Encodes the bytes as lowercase hex.
	pub fn hex_lower(&self) -> String {
		base16ct::lower::encode_string(&self.to_vec())
	}

	/// Encodes the bytes as uppercase hex.
	pub fn hex_upper(&self) -> String {
		base16ct::upper::encode_string(&self.to_vec())
	}
}

#[cfg(test)]
mod test {
	use crate::ByteString;

	#[test]
	fn lenient_decode() {
		let decoded = ByteString::from_base64("Zm9v\nYmFy ").unwrap();
		assert_eq!(decoded, b"foobar"[..]);

		// Mixed standard and url-safe alphabets decode alike.
		assert_eq!(
			ByteString::from_base64("+/+/").unwrap(),
			ByteString::from_base64("-_-_").unwrap(),
		);

		assert!(ByteString::from_base64("Zg").is_some(), "missing padding tolerated");
		assert!(ByteString::from_base64("Z").is_none(), "dangling character fails");
		assert!(ByteString::from_base64("Zg=*").is_none(), "foreign character fails");
	}

	#[test]
	fn hex_cases() {
		let str = ByteString::from(&b"\x00\xABz"[..]);
		assert_eq!(str.hex_lower(), "00ab7a");
		assert_eq!(str.hex_upper(), "00AB7A");
	}
}

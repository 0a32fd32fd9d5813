//! Text encoding and decoding for the tag formats
//!
//! ID3v2 frames carry one of four encodings, picked per frame; ASF is always
//! UTF-16 LE without a byte order mark; APE and Vorbis comments are plain
//! UTF-8 and never come through here.

use crate::error::{ErrorKind, Result, TagError};
use crate::macros::err;

use std::io::Read;

use byteorder::ReadBytesExt;

/// The text encodings that appear in ID3v2 frames
#[derive(Debug, Clone, Eq, PartialEq, Copy, Hash)]
#[repr(u8)]
pub enum TextEncoding {
	/// ISO-8859-1
	Latin1 = 0,
	/// UTF-16 with a byte order mark
	Utf16 = 1,
	/// UTF-16 big endian
	Utf16Be = 2,
	/// UTF-8
	Utf8 = 3,
}

impl TextEncoding {
	/// Get a `TextEncoding` from a u8, must be 0-3 inclusive
	pub fn from_u8(byte: u8) -> Option<Self> {
		match byte {
			0 => Some(Self::Latin1),
			1 => Some(Self::Utf16),
			2 => Some(Self::Utf16Be),
			3 => Some(Self::Utf8),
			_ => None,
		}
	}

	fn name(self) -> &'static str {
		match self {
			Self::Latin1 => "Latin-1",
			Self::Utf16 => "UTF-16",
			Self::Utf16Be => "UTF-16 BE",
			Self::Utf8 => "UTF-8",
		}
	}

	pub(crate) fn encode(
		self,
		text: &str,
		terminated: bool,
		lossy: bool,
	) -> std::result::Result<Vec<u8>, TextEncodingError> {
		let mut out = match self {
			TextEncoding::Latin1 => latin1_encode(text, lossy)?,
			TextEncoding::Utf16 => {
				return Ok(utf16_encode(text, u16::to_le_bytes, true, terminated));
			},
			TextEncoding::Utf16Be => {
				return Ok(utf16_encode(text, u16::to_be_bytes, false, terminated));
			},
			TextEncoding::Utf8 => text.as_bytes().to_vec(),
		};

		if terminated {
			out.push(0);
		}

		Ok(out)
	}
}

/// Errors that can occur while encoding text
#[derive(Copy, Clone, Debug)]
pub struct TextEncodingError {
	encoding: TextEncoding,
	valid_up_to: usize,
}

impl TextEncodingError {
	/// The target text encoding
	pub fn encoding(&self) -> TextEncoding {
		self.encoding
	}

	/// The byte index in the provided string up to which the encoding was valid
	pub fn valid_up_to(&self) -> usize {
		self.valid_up_to
	}
}

impl core::fmt::Display for TextEncodingError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(
			f,
			"invalid {} sequence from index {}",
			self.encoding.name(),
			self.valid_up_to
		)
	}
}

impl core::error::Error for TextEncodingError {}

/// The outcome of a decode, with enough context to keep reading the frame
#[derive(Eq, PartialEq, Debug, Default)]
pub(crate) struct DecodedText {
	pub(crate) content: String,
	pub(crate) bytes_read: usize,
	pub(crate) bom: [u8; 2],
}

impl DecodedText {
	pub(crate) fn text_or_none(self) -> Option<String> {
		if self.content.is_empty() {
			return None;
		}

		Some(self.content)
	}
}

/// Decode everything left in `reader` as `encoding`
pub(crate) fn decode_text<R>(reader: &mut R, encoding: TextEncoding) -> Result<DecodedText>
where
	R: Read,
{
	decode(reader, encoding, false, [0, 0])
}

/// Decode up to a null terminator
///
/// The terminator is consumed and counted in `bytes_read`, but is not part of
/// the content.
pub(crate) fn decode_text_terminated<R>(
	reader: &mut R,
	encoding: TextEncoding,
) -> Result<DecodedText>
where
	R: Read,
{
	decode(reader, encoding, true, [0, 0])
}

/// Decode the remainder of a frame whose earlier string set the byte order
///
/// Some encoders only put a byte order mark on the first UTF-16 string of a
/// frame; the strings after it reuse that order.
pub(crate) fn decode_text_continued<R>(
	reader: &mut R,
	encoding: TextEncoding,
	earlier: &DecodedText,
) -> Result<DecodedText>
where
	R: Read,
{
	decode(reader, encoding, false, earlier.bom)
}

fn decode<R>(
	reader: &mut R,
	encoding: TextEncoding,
	terminated: bool,
	inherited_bom: [u8; 2],
) -> Result<DecodedText>
where
	R: Read,
{
	let (raw, bytes_read) = if terminated {
		let (body, terminator_len) = read_to_terminator(reader, encoding);
		let total = body.len() + terminator_len;
		(body, total)
	} else {
		let mut body = Vec::new();
		reader.read_to_end(&mut body)?;
		let total = body.len();
		(body, total)
	};

	if raw.is_empty() {
		return Ok(DecodedText {
			bytes_read,
			..DecodedText::default()
		});
	}

	let mut bom = [0, 0];
	let content = match encoding {
		TextEncoding::Latin1 => latin1_decode(&raw),
		TextEncoding::Utf16 => {
			if raw.len() < 2 {
				err!(TextDecode("UTF-16 string has an invalid length (< 2)"));
			}

			if raw.len() % 2 != 0 {
				err!(TextDecode("UTF-16 string has an odd length"));
			}

			// A string after the first in a frame may omit its byte order mark
			let body = match [raw[0], raw[1]] {
				mark @ ([0xFE, 0xFF] | [0xFF, 0xFE]) => {
					bom = mark;
					&raw[2..]
				},
				_ => {
					bom = inherited_bom;
					&raw[..]
				},
			};

			match bom {
				[0xFE, 0xFF] => utf16_decode_bytes(body, u16::from_be_bytes)?,
				[0xFF, 0xFE] => utf16_decode_bytes(body, u16::from_le_bytes)?,
				_ => err!(TextDecode("UTF-16 string has an invalid byte order mark")),
			}
		},
		TextEncoding::Utf16Be => utf16_decode_bytes(&raw, u16::from_be_bytes)?,
		TextEncoding::Utf8 => utf8_decode(raw)
			.map_err(|_| TagError::new(ErrorKind::TextDecode("Expected a UTF-8 string")))?,
	};

	Ok(DecodedText {
		content,
		bytes_read,
		bom,
	})
}

fn read_to_terminator<R>(reader: &mut R, encoding: TextEncoding) -> (Vec<u8>, usize)
where
	R: Read,
{
	let mut body = Vec::new();

	match encoding {
		TextEncoding::Latin1 | TextEncoding::Utf8 => {
			while let Ok(byte) = reader.read_u8() {
				if byte == 0 {
					return (body, 1);
				}

				body.push(byte);
			}
		},
		// UTF-16 terminates on an aligned pair of null bytes
		TextEncoding::Utf16 | TextEncoding::Utf16Be => {
			while let (Ok(b1), Ok(b2)) = (reader.read_u8(), reader.read_u8()) {
				if b1 == 0 && b2 == 0 {
					return (body, 2);
				}

				body.push(b1);
				body.push(b2);
			}
		},
	}

	// Ran off the end of the frame without a terminator
	(body, 0)
}

pub(crate) fn latin1_decode(bytes: &[u8]) -> String {
	// Every Latin-1 byte maps directly to the codepoint of the same value
	let mut text: String = bytes.iter().copied().map(char::from).collect();
	trim_end_nulls(&mut text);
	text
}

fn latin1_encode(text: &str, lossy: bool) -> std::result::Result<Vec<u8>, TextEncodingError> {
	let mut out = Vec::with_capacity(text.len());
	for (index, c) in text.chars().enumerate() {
		if (c as u32) <= 255 {
			out.push(c as u8);
		} else if lossy {
			out.push(b'?');
		} else {
			return Err(TextEncodingError {
				encoding: TextEncoding::Latin1,
				// All characters up to this point are single-byte
				valid_up_to: index,
			});
		}
	}

	Ok(out)
}

fn utf8_decode(bytes: Vec<u8>) -> Result<String> {
	let mut text = String::from_utf8(bytes)?;
	trim_end_nulls(&mut text);
	Ok(text)
}

pub(crate) fn utf16_decode(words: &[u16]) -> Result<String> {
	let mut text = String::from_utf16(words)
		.map_err(|_| TagError::new(ErrorKind::TextDecode("Given an invalid UTF-16 string")))?;
	trim_end_nulls(&mut text);
	Ok(text)
}

pub(crate) fn utf16_decode_bytes(bytes: &[u8], endianness: fn([u8; 2]) -> u16) -> Result<String> {
	if bytes.is_empty() {
		return Ok(String::new());
	}

	let mut words = Vec::with_capacity(bytes.len() / 2);
	for pair in bytes.chunks_exact(2) {
		// Multiple null-separated UTF-16 strings can carry a BOM each,
		// they must not leak into the decoded text.
		if pair != [0xFF, 0xFE] && pair != [0xFE, 0xFF] {
			words.push(endianness([pair[0], pair[1]]));
		}
	}

	utf16_decode(&words)
}

pub(crate) fn trim_end_nulls(text: &mut String) {
	while text.ends_with('\0') {
		text.pop();
	}
}

/// UTF-16 little endian with no byte order mark, as ASF stores strings
pub(crate) fn utf16le_encode(text: &str, terminated: bool) -> Vec<u8> {
	utf16_encode(text, u16::to_le_bytes, false, terminated)
}

fn utf16_encode(
	text: &str,
	endianness: fn(u16) -> [u8; 2],
	bom: bool,
	terminated: bool,
) -> Vec<u8> {
	let mut encoded = Vec::with_capacity(text.len() * 2 + 4);

	if bom {
		encoded.extend(endianness(0xFEFF_u16));
	}
	encoded.extend(text.encode_utf16().flat_map(endianness));
	if terminated {
		encoded.extend([0, 0]);
	}

	encoded
}

#[cfg(test)]
mod tests {
	use super::TextEncoding;
	use std::io::Cursor;

	const TEST_STRING: &str = "ta\u{00e9}gk\u{00ef}t";

	#[test_log::test]
	fn utf16_bom_decode() {
		let be = super::decode_text(
			&mut Cursor::new(&[
				0xFE, 0xFF, 0x00, b't', 0x00, b'a', 0x00, 0xE9, 0x00, b'g', 0x00, b'k', 0x00, 0xEF,
				0x00, b't',
			]),
			TextEncoding::Utf16,
		)
		.unwrap();
		let le = super::decode_text(
			&mut Cursor::new(&[
				0xFF, 0xFE, b't', 0x00, b'a', 0x00, 0xE9, 0x00, b'g', 0x00, b'k', 0x00, 0xEF, 0x00,
				b't', 0x00,
			]),
			TextEncoding::Utf16,
		)
		.unwrap();

		assert_eq!(be.content, TEST_STRING);
		assert_eq!(le.content, TEST_STRING);
		assert_eq!(be.bytes_read, le.bytes_read);
	}

	#[test_log::test]
	fn utf16_rejects_invalid() {
		assert!(super::decode_text(&mut Cursor::new(&[0xFE]), TextEncoding::Utf16).is_err());
		assert!(
			super::decode_text(&mut Cursor::new(&[0x01, 0x02, 0x03]), TextEncoding::Utf16)
				.is_err()
		);
	}

	#[test_log::test]
	fn latin1_round_trip() {
		let encoded = TextEncoding::Latin1.encode(TEST_STRING, false, false).unwrap();
		assert_eq!(super::latin1_decode(&encoded), TEST_STRING);

		// Codepoints above U+00FF cannot be represented
		assert!(TextEncoding::Latin1.encode("\u{2603}", false, false).is_err());
		let lossy = TextEncoding::Latin1.encode("\u{2603}", false, true).unwrap();
		assert_eq!(lossy, b"?");
	}

	#[test_log::test]
	fn terminated_read_stops_at_null() {
		let mut reader = Cursor::new(b"Hello\0World".as_slice());
		let decoded = super::decode_text_terminated(&mut reader, TextEncoding::Utf8).unwrap();

		assert_eq!(decoded.content, "Hello");
		assert_eq!(decoded.bytes_read, 6);

		let rest = super::decode_text(&mut reader, TextEncoding::Utf8).unwrap();
		assert_eq!(rest.content, "World");
	}

	#[test_log::test]
	fn byte_order_carries_to_the_next_string() {
		// A big endian string with a BOM, then one without
		let mut frame = vec![0xFE, 0xFF, 0x00, b'k', 0x00, b'e', 0x00, b'y', 0x00, 0x00];
		frame.extend_from_slice(&[0x00, b'v', 0x00, b'a', 0x00, b'l']);

		let mut reader = Cursor::new(frame);
		let first = super::decode_text_terminated(&mut reader, TextEncoding::Utf16).unwrap();
		assert_eq!(first.content, "key");
		assert_eq!(first.bom, [0xFE, 0xFF]);

		let second =
			super::decode_text_continued(&mut reader, TextEncoding::Utf16, &first).unwrap();
		assert_eq!(second.content, "val");
	}
}

use crate::error::Result;
use crate::id3::v2::synchsafe::SynchsafeInteger;
use crate::macros::decode_err;

use std::io::Read;
use std::ops::Range;

use byteorder::{BigEndian, ReadBytesExt};

/// The major version of an ID3v2 tag
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Id3v2Version {
	/// ID3v2.2
	V2,
	/// ID3v2.3
	V3,
	/// ID3v2.4
	V4,
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Id3v2TagFlags {
	pub unsynchronisation: bool,
	pub extended_header: bool,
	pub footer: bool,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Id3v2Header {
	pub version: Id3v2Version,
	pub flags: Id3v2TagFlags,
	/// The tag size, excluding the header and footer
	pub size: u32,
}

impl Id3v2Header {
	pub(crate) fn parse<R>(reader: &mut R) -> Result<Self>
	where
		R: Read,
	{
		let mut header = [0; 10];
		reader.read_exact(&mut header)?;

		if &header[..3] != b"ID3" {
			decode_err!(@BAIL "Expected \"ID3\" to start an ID3v2 tag");
		}

		let version = match header[3] {
			2 => Id3v2Version::V2,
			3 => Id3v2Version::V3,
			4 => Id3v2Version::V4,
			_ => decode_err!(@BAIL "Found an ID3v2 tag with an invalid major version"),
		};

		let flags_byte = header[5];
		let flags = Id3v2TagFlags {
			unsynchronisation: flags_byte & 0x80 == 0x80,
			extended_header: flags_byte & 0x40 == 0x40,
			footer: flags_byte & 0x10 == 0x10,
		};

		if header[6..10].iter().any(|b| b & 0x80 != 0) {
			decode_err!(@BAIL "Found an ID3v2 tag with a non-synchsafe size");
		}

		let size = u32::from_be_bytes([header[6], header[7], header[8], header[9]]).unsynch();

		Ok(Self {
			version,
			flags,
			size,
		})
	}

	/// The on-disk size of the whole tag, header and footer included
	pub(crate) fn full_tag_size(&self) -> u32 {
		10 + self.size + if self.flags.footer { 10 } else { 0 }
	}

	/// Skip past an extended header, returning the bytes consumed
	pub(crate) fn skip_extended_header<R>(&self, reader: &mut R) -> Result<u32>
	where
		R: Read,
	{
		if !self.flags.extended_header {
			return Ok(0);
		}

		let size = reader.read_u32::<BigEndian>()?;
		match self.version {
			// v2.4: a synchsafe size that includes its own four bytes
			Id3v2Version::V4 => {
				let size = size.unsynch();
				if size < 6 {
					decode_err!(@BAIL "Found an extended header with an invalid size");
				}

				std::io::copy(&mut reader.take(u64::from(size - 4)), &mut std::io::sink())?;
				Ok(size)
			},
			// v2.3: a plain size that excludes the four size bytes
			Id3v2Version::V3 => {
				std::io::copy(&mut reader.take(u64::from(size)), &mut std::io::sink())?;
				Ok(size + 4)
			},
			// v2.2 has no extended header; the flag bit means compression
			Id3v2Version::V2 => {
				decode_err!(@BAIL "Encountered a compressed ID3v2.2 tag")
			},
		}
	}
}

/// Locate a leading ID3v2 tag
pub(crate) fn find_id3v2(data: &[u8]) -> Option<Range<usize>> {
	if !data.starts_with(b"ID3") {
		return None;
	}

	let mut reader = &data[..];
	let header = Id3v2Header::parse(&mut reader).ok()?;

	let end = header.full_tag_size() as usize;
	if end > data.len() {
		log::warn!("ID3v2 tag claims to be larger than the file, ignoring it");
		return None;
	}

	Some(0..end)
}

#[cfg(test)]
mod tests {
	use super::{Id3v2Header, Id3v2Version};

	#[test_log::test]
	fn header_parse() {
		let bytes = [b'I', b'D', b'3', 4, 0, 0x80, 0, 0, 0x02, 0x01];
		let header = Id3v2Header::parse(&mut &bytes[..]).unwrap();
		assert_eq!(header.version, Id3v2Version::V4);
		assert!(header.flags.unsynchronisation);
		assert_eq!(header.size, 0x0101);
		assert_eq!(header.full_tag_size(), 0x010B);
	}

	#[test_log::test]
	fn rejects_bad_headers() {
		let not_id3 = [b'X', b'D', b'3', 4, 0, 0, 0, 0, 0, 0];
		assert!(Id3v2Header::parse(&mut &not_id3[..]).is_err());

		let bad_version = [b'I', b'D', b'3', 9, 0, 0, 0, 0, 0, 0];
		assert!(Id3v2Header::parse(&mut &bad_version[..]).is_err());

		let non_synchsafe = [b'I', b'D', b'3', 4, 0, 0, 0xFF, 0, 0, 0];
		assert!(Id3v2Header::parse(&mut &non_synchsafe[..]).is_err());
	}
}

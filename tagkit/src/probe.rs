//! Format detection
//!
//! Detection is signature-first: the file extension is only consulted when the
//! content itself is ambiguous. A renamed file therefore still resolves to its
//! real format.

use crate::id3::v2::header::Id3v2Header;
use crate::tag::TagType;

use std::io::Cursor;
use std::path::Path;

/// The formats the engine can read and write
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum FileFormat {
	/// ADTS AAC
	Aac,
	/// AIFF / AIFF-C
	Aiff,
	/// Monkey's Audio
	Ape,
	/// ASF (WMA)
	Asf,
	/// FLAC
	Flac,
	/// MP4 / M4A
	Mp4,
	/// Musepack
	Mpc,
	/// MPEG audio (MP3)
	Mpeg,
	/// Ogg Opus
	Opus,
	/// Ogg Speex
	Speex,
	/// True Audio
	Tta,
	/// Ogg Vorbis
	Vorbis,
	/// RIFF WAVE
	Wav,
}

// The 16-byte GUID that opens every ASF file
pub(crate) const ASF_HEADER_GUID: [u8; 16] = [
	0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];

impl FileFormat {
	/// The tag container this format is written with
	pub(crate) fn primary_tag_type(self) -> TagType {
		match self {
			FileFormat::Aac | FileFormat::Mpeg | FileFormat::Tta => TagType::Id3v2,
			FileFormat::Aiff | FileFormat::Wav => TagType::Id3v2,
			FileFormat::Ape | FileFormat::Mpc => TagType::Ape,
			FileFormat::Asf => TagType::Asf,
			FileFormat::Flac | FileFormat::Opus | FileFormat::Speex | FileFormat::Vorbis => {
				TagType::VorbisComments
			},
			FileFormat::Mp4 => TagType::Mp4Ilst,
		}
	}

	/// Guess the format from a path's extension
	pub fn from_path(path: &Path) -> Option<Self> {
		let ext = path.extension()?.to_str()?;
		Self::from_ext(ext)
	}

	/// Guess the format from an extension
	pub fn from_ext<E>(ext: E) -> Option<Self>
	where
		E: AsRef<str>,
	{
		match ext.as_ref().to_ascii_lowercase().as_str() {
			"aac" => Some(Self::Aac),
			"aif" | "aiff" | "aifc" => Some(Self::Aiff),
			"ape" => Some(Self::Ape),
			"wma" | "asf" => Some(Self::Asf),
			"flac" => Some(Self::Flac),
			"m4a" | "m4b" | "m4p" | "m4v" | "mp4" => Some(Self::Mp4),
			"mpc" | "mp+" | "mpp" | "musepack" => Some(Self::Mpc),
			"mp3" | "mp2" | "mp1" => Some(Self::Mpeg),
			"opus" => Some(Self::Opus),
			"spx" => Some(Self::Speex),
			"tta" => Some(Self::Tta),
			"ogg" | "oga" => Some(Self::Vorbis),
			"wav" | "wave" => Some(Self::Wav),
			_ => None,
		}
	}

	/// Guess the format from the file's leading bytes
	///
	/// A leading ID3v2 tag is skipped before sniffing, it says nothing about
	/// the audio that follows it.
	pub fn from_buffer(buf: &[u8]) -> Option<Self> {
		let mut data = buf;

		if data.starts_with(b"ID3") {
			let mut reader = Cursor::new(data);
			let header = Id3v2Header::parse(&mut reader).ok()?;
			let tag_end = header.full_tag_size() as usize;
			if tag_end >= data.len() {
				// Nothing but the tag, fall back to the extension
				return None;
			}

			log::debug!("skipping {tag_end} byte ID3v2 tag before sniffing");
			data = &data[tag_end..];
		}

		Self::from_signature(data)
	}

	fn from_signature(data: &[u8]) -> Option<Self> {
		if data.len() < 16 {
			return None;
		}

		match data {
			[b'M', b'A', b'C', b' ', ..] => Some(Self::Ape),
			[b'M', b'P', b'C', b'K', ..] | [b'M', b'P', b'+', ..] => Some(Self::Mpc),
			[b'f', b'L', b'a', b'C', ..] => Some(Self::Flac),
			[b'T', b'T', b'A', b'1', ..] => Some(Self::Tta),
			[b'O', b'g', b'g', b'S', ..] => Self::from_ogg_page(data),
			[b'R', b'I', b'F', b'F', ..] if &data[8..12] == b"WAVE" => Some(Self::Wav),
			[b'F', b'O', b'R', b'M', ..] if &data[8..12] == b"AIFF" || &data[8..12] == b"AIFC" => {
				Some(Self::Aiff)
			},
			_ if data[..16] == ASF_HEADER_GUID => Some(Self::Asf),
			_ if &data[4..8] == b"ftyp" => Some(Self::Mp4),
			[0xFF, b1, ..] if b1 & 0xE0 == 0xE0 => {
				// Frame sync. The layer bits separate an MPEG frame from an ADTS one.
				let layer = (b1 >> 1) & 0x3;
				if layer == 0 {
					Some(Self::Aac)
				} else {
					Some(Self::Mpeg)
				}
			},
			_ => None,
		}
	}

	// The codec of an Ogg stream is identified by the signature of the first
	// packet, which starts right after the 28 byte page header + segment table.
	fn from_ogg_page(data: &[u8]) -> Option<Self> {
		let window = &data[..data.len().min(128)];

		if memmem(window, b"\x01vorbis") {
			return Some(Self::Vorbis);
		}
		if memmem(window, b"OpusHead") {
			return Some(Self::Opus);
		}
		if memmem(window, b"Speex   ") {
			return Some(Self::Speex);
		}

		log::warn!("encountered an Ogg stream with an unknown codec");
		None
	}
}

fn memmem(haystack: &[u8], needle: &[u8]) -> bool {
	haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
	use super::FileFormat;

	#[test_log::test]
	fn signatures() {
		let mut flac = b"fLaC".to_vec();
		flac.resize(32, 0);
		assert_eq!(FileFormat::from_buffer(&flac), Some(FileFormat::Flac));

		let mut wav = b"RIFF\x24\x00\x00\x00WAVE".to_vec();
		wav.resize(32, 0);
		assert_eq!(FileFormat::from_buffer(&wav), Some(FileFormat::Wav));

		let mut mp4 = vec![0, 0, 0, 16];
		mp4.extend_from_slice(b"ftypM4A ");
		mp4.resize(32, 0);
		assert_eq!(FileFormat::from_buffer(&mp4), Some(FileFormat::Mp4));

		let mut asf = super::ASF_HEADER_GUID.to_vec();
		asf.resize(64, 0);
		assert_eq!(FileFormat::from_buffer(&asf), Some(FileFormat::Asf));
	}

	#[test_log::test]
	fn frame_sync_disambiguation() {
		// MPEG-1 layer III
		let mut mp3 = vec![0xFF, 0xFB, 0x90, 0x00];
		mp3.resize(32, 0);
		assert_eq!(FileFormat::from_buffer(&mp3), Some(FileFormat::Mpeg));

		// ADTS has the layer bits cleared
		let mut aac = vec![0xFF, 0xF1, 0x50, 0x80];
		aac.resize(32, 0);
		assert_eq!(FileFormat::from_buffer(&aac), Some(FileFormat::Aac));
	}

	#[test_log::test]
	fn id3v2_prefix_is_skipped() {
		// 10 byte header + 10 bytes of (empty) frame space
		let mut buf = vec![b'I', b'D', b'3', 4, 0, 0, 0, 0, 0, 10];
		buf.resize(20, 0);
		buf.extend_from_slice(b"fLaC");
		buf.resize(64, 0);

		assert_eq!(FileFormat::from_buffer(&buf), Some(FileFormat::Flac));
	}

	#[test_log::test]
	fn renamed_extension_is_ignored() {
		assert_eq!(FileFormat::from_ext("FLAC"), Some(FileFormat::Flac));
		assert_eq!(FileFormat::from_ext("xyz"), None);
	}

	#[test_log::test]
	fn garbage_is_rejected() {
		assert_eq!(FileFormat::from_buffer(&[0x55; 64]), None);
		assert_eq!(FileFormat::from_buffer(b"short"), None);
	}
}

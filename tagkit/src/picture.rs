//! Embedded pictures

use crate::error::{ErrorKind, Result, TagError};
use crate::macros::{err, try_vec};

use std::borrow::Cow;
use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use data_encoding::BASE64;

/// The picture classifications defined by ID3v2 APIC, shared by every other format
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PictureType {
	Other,
	Icon,
	OtherIcon,
	CoverFront,
	CoverBack,
	Leaflet,
	Media,
	LeadArtist,
	Artist,
	Conductor,
	Band,
	Composer,
	Lyricist,
	RecordingLocation,
	DuringRecording,
	DuringPerformance,
	ScreenCapture,
	BrightFish,
	Illustration,
	BandLogo,
	PublisherLogo,
	Undefined(u8),
}

impl PictureType {
	pub fn as_u8(self) -> u8 {
		match self {
			Self::Other => 0,
			Self::Icon => 1,
			Self::OtherIcon => 2,
			Self::CoverFront => 3,
			Self::CoverBack => 4,
			Self::Leaflet => 5,
			Self::Media => 6,
			Self::LeadArtist => 7,
			Self::Artist => 8,
			Self::Conductor => 9,
			Self::Band => 10,
			Self::Composer => 11,
			Self::Lyricist => 12,
			Self::RecordingLocation => 13,
			Self::DuringRecording => 14,
			Self::DuringPerformance => 15,
			Self::ScreenCapture => 16,
			Self::BrightFish => 17,
			Self::Illustration => 18,
			Self::BandLogo => 19,
			Self::PublisherLogo => 20,
			Self::Undefined(i) => i,
		}
	}

	pub fn from_u8(byte: u8) -> Self {
		match byte {
			0 => Self::Other,
			1 => Self::Icon,
			2 => Self::OtherIcon,
			3 => Self::CoverFront,
			4 => Self::CoverBack,
			5 => Self::Leaflet,
			6 => Self::Media,
			7 => Self::LeadArtist,
			8 => Self::Artist,
			9 => Self::Conductor,
			10 => Self::Band,
			11 => Self::Composer,
			12 => Self::Lyricist,
			13 => Self::RecordingLocation,
			14 => Self::DuringRecording,
			15 => Self::DuringPerformance,
			16 => Self::ScreenCapture,
			17 => Self::BrightFish,
			18 => Self::Illustration,
			19 => Self::BandLogo,
			20 => Self::PublisherLogo,
			i => Self::Undefined(i),
		}
	}
}

/// The MIME type of a [`Picture`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MimeType {
	Png,
	Jpeg,
	Tiff,
	Bmp,
	Gif,
	/// A MIME type not covered by a variant
	Unknown(String),
}

impl MimeType {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Png => "image/png",
			Self::Jpeg => "image/jpeg",
			Self::Tiff => "image/tiff",
			Self::Bmp => "image/bmp",
			Self::Gif => "image/gif",
			Self::Unknown(mime) => mime,
		}
	}

	pub fn from_str(mime: &str) -> Self {
		match &*mime.to_lowercase() {
			"image/png" => Self::Png,
			"image/jpeg" | "image/jpg" => Self::Jpeg,
			"image/tiff" => Self::Tiff,
			"image/bmp" => Self::Bmp,
			"image/gif" => Self::Gif,
			_ => Self::Unknown(mime.to_string()),
		}
	}

	/// Guess a MIME type from the first bytes of the image data
	pub fn from_signature(data: &[u8]) -> Option<Self> {
		match data {
			[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
			[0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
			[b'G', b'I', b'F', b'8', ..] => Some(Self::Gif),
			[b'B', b'M', ..] => Some(Self::Bmp),
			[b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(Self::Tiff),
			_ => None,
		}
	}
}

/// An embedded picture
///
/// `Picture` carries the image bytes plus the metadata every tag container
/// stores alongside them. The image dimensions are never retained; formats
/// that want them get zeroes, which every mainstream reader accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Picture {
	pub(crate) pic_type: PictureType,
	pub(crate) mime_type: Option<MimeType>,
	pub(crate) description: Option<Cow<'static, str>>,
	pub(crate) data: Cow<'static, [u8]>,
}

impl Picture {
	/// Create a new `Picture`
	///
	/// When `mime_type` is `None`, it is guessed from the data's signature on write.
	pub fn new(
		pic_type: PictureType,
		mime_type: Option<MimeType>,
		description: Option<String>,
		data: Vec<u8>,
	) -> Self {
		Self {
			pic_type,
			mime_type,
			description: description.map(Cow::Owned),
			data: Cow::Owned(data),
		}
	}

	pub fn pic_type(&self) -> PictureType {
		self.pic_type
	}

	pub fn mime_type(&self) -> Option<&MimeType> {
		self.mime_type.as_ref()
	}

	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// The size of the image data in bytes
	pub fn size(&self) -> usize {
		self.data.len()
	}

	pub(crate) fn mime_or_sniffed(&self) -> MimeType {
		if let Some(mime) = &self.mime_type {
			return mime.clone();
		}

		MimeType::from_signature(&self.data)
			.unwrap_or_else(|| MimeType::Unknown(String::from("application/octet-stream")))
	}

	/// Encode as a FLAC `PICTURE` metadata block body
	pub(crate) fn as_flac_bytes(&self, encode: bool) -> Vec<u8> {
		let mime = self.mime_or_sniffed();
		let mime = mime.as_str().as_bytes();
		let description = self.description.as_deref().unwrap_or_default().as_bytes();

		let mut content =
			Vec::with_capacity(32 + mime.len() + description.len() + self.data.len());

		// Unwraps are infallible, the writer is a Vec
		content
			.write_u32::<BigEndian>(u32::from(self.pic_type.as_u8()))
			.unwrap();
		content.write_u32::<BigEndian>(mime.len() as u32).unwrap();
		content.extend_from_slice(mime);
		content
			.write_u32::<BigEndian>(description.len() as u32)
			.unwrap();
		content.extend_from_slice(description);
		// Width, height, color depth, indexed color count
		content.extend_from_slice(&[0; 16]);
		content
			.write_u32::<BigEndian>(self.data.len() as u32)
			.unwrap();
		content.extend_from_slice(&self.data);

		if encode {
			BASE64.encode(&content).into_bytes()
		} else {
			content
		}
	}

	/// Decode a FLAC `PICTURE` metadata block body
	///
	/// `encoded` expects the BASE64 form used in `METADATA_BLOCK_PICTURE`
	/// Vorbis comments.
	pub(crate) fn from_flac_bytes(bytes: &[u8], encoded: bool) -> Result<Self> {
		if encoded {
			let decoded = BASE64
				.decode(bytes)
				.map_err(|_| TagError::new(ErrorKind::NotAPicture))?;
			Self::from_flac_bytes_inner(&decoded)
		} else {
			Self::from_flac_bytes_inner(bytes)
		}
	}

	fn from_flac_bytes_inner(content: &[u8]) -> Result<Self> {
		let mut reader = Cursor::new(content);

		let pic_type = PictureType::from_u8(reader.read_u32::<BigEndian>()? as u8);

		let mime_len = reader.read_u32::<BigEndian>()? as usize;
		let mut mime_bytes = try_vec![0; mime_len];
		reader.read_exact(&mut mime_bytes)?;
		let mime_str = std::str::from_utf8(&mime_bytes)
			.map_err(|_| TagError::new(ErrorKind::NotAPicture))?;
		let mime_type = (!mime_str.is_empty()).then(|| MimeType::from_str(mime_str));

		let description_len = reader.read_u32::<BigEndian>()? as usize;
		let mut description_bytes = try_vec![0; description_len];
		reader.read_exact(&mut description_bytes)?;
		let description = String::from_utf8(description_bytes)
			.map(|d| (!d.is_empty()).then(|| Cow::Owned(d)))
			.map_err(|_| TagError::new(ErrorKind::NotAPicture))?;

		// Width, height, color depth, indexed color count
		reader.set_position(reader.position() + 16);

		let data_len = reader.read_u32::<BigEndian>()? as usize;
		let mut data = try_vec![0; data_len];
		reader.read_exact(&mut data).map_err(|_| {
			log::warn!("picture block claims {data_len} bytes of image data, not all present");
			TagError::new(ErrorKind::NotAPicture)
		})?;

		Ok(Self {
			pic_type,
			mime_type,
			description,
			data: Cow::Owned(data),
		})
	}
}

//! The Content Description and Extended Content Description objects

use crate::error::Result;
use crate::macros::decode_err;
use crate::picture::{MimeType, Picture, PictureType};
use crate::tag::{ItemKey, Tag, TagType};
use crate::util::text::{utf16_decode_bytes, utf16le_encode};

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

// Extended Content Description value types
const TYPE_UNICODE: u16 = 0;
const TYPE_BINARY: u16 = 1;
const TYPE_BOOL: u16 = 2;
const TYPE_DWORD: u16 = 3;
const TYPE_QWORD: u16 = 4;
const TYPE_WORD: u16 = 5;

// The Content Description object covers these four; they never go into the
// extended object
const CONTENT_DESCRIPTION_KEYS: [ItemKey; 4] = [
	ItemKey::TrackTitle,
	ItemKey::TrackArtist,
	ItemKey::CopyrightMessage,
	ItemKey::Comment,
];

/// Parse a Content Description object's content
///
/// Five length-prefixed UTF-16 strings: title, author, copyright, description
/// and rating, in that order.
pub(super) fn parse_content_description(content: &[u8], tag: &mut Tag) -> Result<()> {
	let mut reader = Cursor::new(content);

	let mut lengths = [0usize; 5];
	for length in &mut lengths {
		*length = usize::from(reader.read_u16::<LittleEndian>()?);
	}

	let keys = [
		Some(ItemKey::TrackTitle),
		Some(ItemKey::TrackArtist),
		Some(ItemKey::CopyrightMessage),
		Some(ItemKey::Comment),
		// The rating has no unified counterpart
		None,
	];

	for (length, key) in lengths.into_iter().zip(keys) {
		let mut value = vec![0u8; length];
		reader.read_exact(&mut value)?;

		if let Some(key) = key {
			let text = utf16_decode_bytes(&value, u16::from_le_bytes)?;
			tag.push_text(key, text);
		}
	}

	Ok(())
}

/// Render a Content Description object's content, empty when no field is set
pub(super) fn render_content_description(tag: &Tag) -> Vec<u8> {
	let values: Vec<Option<&str>> = CONTENT_DESCRIPTION_KEYS
		.iter()
		.map(|key| tag.get_string(key))
		.collect();

	if values.iter().all(Option::is_none) {
		return Vec::new();
	}

	let encoded: Vec<Vec<u8>> = values
		.into_iter()
		.map(|v| v.map_or_else(Vec::new, |v| utf16le_encode(v, true)))
		.chain(std::iter::once(Vec::new())) // rating
		.collect();

	let mut out = Vec::new();
	for value in &encoded {
		out.write_u16::<LittleEndian>(value.len() as u16).unwrap();
	}
	for value in &encoded {
		out.extend_from_slice(value);
	}

	out
}

pub(super) fn parse_extended_content_description(content: &[u8], tag: &mut Tag) -> Result<()> {
	let mut reader = Cursor::new(content);

	let count = reader.read_u16::<LittleEndian>()?;
	for _ in 0..count {
		let name_len = usize::from(reader.read_u16::<LittleEndian>()?);
		let mut name = vec![0u8; name_len];
		reader.read_exact(&mut name)?;
		let name = utf16_decode_bytes(&name, u16::from_le_bytes)?;

		let value_type = reader.read_u16::<LittleEndian>()?;
		let value_len = usize::from(reader.read_u16::<LittleEndian>()?);
		let mut value = vec![0u8; value_len];
		reader.read_exact(&mut value)?;

		let text = match value_type {
			TYPE_UNICODE => utf16_decode_bytes(&value, u16::from_le_bytes)?,
			TYPE_BINARY => {
				if name == "WM/Picture" {
					match parse_picture(&value) {
						Ok(picture) => tag.push_picture(picture),
						Err(e) => log::warn!("skipping an unparsable WM/Picture: {e}"),
					}
				} else {
					log::debug!("skipping binary attribute `{name}`");
				}
				continue;
			},
			TYPE_BOOL => {
				if value.len() < 4 {
					continue;
				}
				u32::from_le_bytes([value[0], value[1], value[2], value[3]]).to_string()
			},
			TYPE_DWORD => {
				if value.len() < 4 {
					continue;
				}
				u32::from_le_bytes([value[0], value[1], value[2], value[3]]).to_string()
			},
			TYPE_QWORD => {
				if value.len() < 8 {
					continue;
				}
				u64::from_le_bytes(value[..8].try_into().unwrap()).to_string()
			},
			TYPE_WORD => {
				if value.len() < 2 {
					continue;
				}
				u16::from_le_bytes([value[0], value[1]]).to_string()
			},
			other => {
				log::warn!("skipping attribute `{name}` with unknown type {other}");
				continue;
			},
		};

		match ItemKey::from_key(TagType::Asf, &name) {
			// "n/t" in WM/PartOfSet splits into the disc pair
			ItemKey::DiscNumber | ItemKey::DiscTotal => {
				let mut split = text.splitn(2, '/');
				if let Some(number) = split.next().filter(|s| !s.is_empty()) {
					tag.push_text(ItemKey::DiscNumber, number.to_string());
				}
				if let Some(total) = split.next().filter(|s| !s.is_empty()) {
					tag.push_text(ItemKey::DiscTotal, total.to_string());
				}
			},
			key => tag.push_text(key, text),
		}
	}

	Ok(())
}

// A WM/Picture attribute: type, size, mime, description, image data
fn parse_picture(value: &[u8]) -> Result<Picture> {
	let mut reader = Cursor::new(value);

	let pic_type = PictureType::from_u8(reader.read_u8()?);
	let data_len = reader.read_u32::<LittleEndian>()? as usize;

	let mime = read_terminated_utf16le(&mut reader)?;
	let description = read_terminated_utf16le(&mut reader)?;

	let mut data = vec![0u8; data_len];
	reader.read_exact(&mut data)?;

	Ok(Picture::new(
		pic_type,
		(!mime.is_empty()).then(|| MimeType::from_str(&mime)),
		(!description.is_empty()).then_some(description),
		data,
	))
}

fn read_terminated_utf16le(reader: &mut Cursor<&[u8]>) -> Result<String> {
	let mut units = Vec::new();
	loop {
		let unit = reader.read_u16::<LittleEndian>()?;
		if unit == 0 {
			break;
		}
		units.push(unit);
	}

	crate::util::text::utf16_decode(&units)
}

pub(super) fn render_extended_content_description(tag: &Tag) -> Result<Vec<u8>> {
	let mut descriptors: Vec<Vec<u8>> = Vec::new();
	let mut seen: Vec<ItemKey> = Vec::new();

	for item in tag.items() {
		let key = item.key();
		if seen.contains(key) || CONTENT_DESCRIPTION_KEYS.contains(key) {
			continue;
		}
		seen.push(key.clone());

		match key {
			ItemKey::DiscNumber | ItemKey::DiscTotal => {
				seen.push(ItemKey::DiscNumber);
				seen.push(ItemKey::DiscTotal);
				let value = match (
					tag.get_string(&ItemKey::DiscNumber),
					tag.get_string(&ItemKey::DiscTotal),
				) {
					(Some(n), Some(t)) => format!("{n}/{t}"),
					(Some(n), None) => n.to_string(),
					(None, Some(t)) => format!("0/{t}"),
					(None, None) => continue,
				};
				descriptors.push(descriptor("WM/PartOfSet", &value));
			},
			ItemKey::Year | ItemKey::RecordingDate => {
				seen.push(ItemKey::Year);
				seen.push(ItemKey::RecordingDate);
				let value = tag
					.get_string(&ItemKey::RecordingDate)
					.or_else(|| tag.get_string(&ItemKey::Year));
				if let Some(value) = value {
					descriptors.push(descriptor("WM/Year", value));
				}
			},
			mapped => {
				let Some(name) = mapped.map_key(TagType::Asf) else {
					continue;
				};
				let name = name.to_string();

				for value in tag.get_strings(key) {
					descriptors.push(descriptor(&name, value));
				}
			},
		}
	}

	for picture in tag.pictures() {
		descriptors.push(binary_descriptor("WM/Picture", &render_picture(picture)));
	}

	if descriptors.is_empty() {
		return Ok(Vec::new());
	}

	let mut out = Vec::new();
	out.write_u16::<LittleEndian>(descriptors.len() as u16)
		.unwrap();
	for descriptor in descriptors {
		out.extend_from_slice(&descriptor);
	}

	Ok(out)
}

fn descriptor(name: &str, value: &str) -> Vec<u8> {
	descriptor_raw(name, TYPE_UNICODE, &utf16le_encode(value, true))
}

fn binary_descriptor(name: &str, value: &[u8]) -> Vec<u8> {
	descriptor_raw(name, TYPE_BINARY, value)
}

fn descriptor_raw(name: &str, value_type: u16, value: &[u8]) -> Vec<u8> {
	let name = utf16le_encode(name, true);

	let mut out = Vec::with_capacity(6 + name.len() + value.len());
	out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
	out.extend_from_slice(&name);
	out.write_u16::<LittleEndian>(value_type).unwrap();
	out.write_u16::<LittleEndian>(value.len() as u16).unwrap();
	out.extend_from_slice(value);
	out
}

fn render_picture(picture: &Picture) -> Vec<u8> {
	let mut out = Vec::new();
	out.push(picture.pic_type().as_u8());
	out.write_u32::<LittleEndian>(picture.data().len() as u32)
		.unwrap();
	out.extend_from_slice(&utf16le_encode(picture.mime_or_sniffed().as_str(), true));
	out.extend_from_slice(&utf16le_encode(
		picture.description().unwrap_or_default(),
		true,
	));
	out.extend_from_slice(picture.data());
	out
}

#[cfg(test)]
mod tests {
	use crate::tag::{ItemKey, Tag};

	#[test_log::test]
	fn content_description_round_trip() {
		let mut tag = Tag::new();
		tag.set_title(String::from("Title"));
		tag.set_comment(String::from("a comment"));

		let content = super::render_content_description(&tag);
		let mut parsed = Tag::new();
		super::parse_content_description(&content, &mut parsed).unwrap();

		assert_eq!(parsed.title(), Some("Title"));
		assert_eq!(parsed.comment(), Some("a comment"));
		assert!(parsed.artist().is_none());
	}

	#[test_log::test]
	fn disc_pair_round_trips_through_part_of_set() {
		let mut tag = Tag::new();
		tag.insert_text(ItemKey::DiscNumber, String::from("1"));
		tag.insert_text(ItemKey::DiscTotal, String::from("2"));

		let content = super::render_extended_content_description(&tag).unwrap();
		let mut parsed = Tag::new();
		super::parse_extended_content_description(&content, &mut parsed).unwrap();

		assert_eq!(parsed.get_string(&ItemKey::DiscNumber), Some("1"));
		assert_eq!(parsed.get_string(&ItemKey::DiscTotal), Some("2"));
	}

	#[test_log::test]
	fn content_description_fields_stay_out_of_the_extended_object() {
		let mut tag = Tag::new();
		tag.set_title(String::from("Title"));

		assert!(
			super::render_extended_content_description(&tag)
				.unwrap()
				.is_empty()
		);
	}
}

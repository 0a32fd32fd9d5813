//! The Vorbis comment key/value body
//!
//! FLAC embeds the same structure in its `VORBIS_COMMENT` metadata block, so
//! both container modules share this codec.

use crate::error::Result;
use crate::macros::try_vec;
use crate::picture::Picture;
use crate::tag::{ItemKey, Tag, TagType};

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Parse a comment body into `tag`, returning the vendor string
pub(crate) fn parse(data: &[u8], tag: &mut Tag) -> Result<String> {
	let mut reader = Cursor::new(data);

	let vendor_len = reader.read_u32::<LittleEndian>()? as usize;
	let mut vendor = try_vec![0; vendor_len];
	reader.read_exact(&mut vendor)?;
	// A non UTF-8 vendor is unusual but not worth failing the whole file over
	let vendor = String::from_utf8_lossy(&vendor).into_owned();

	let count = reader.read_u32::<LittleEndian>()?;
	for _ in 0..count {
		let Ok(len) = reader.read_u32::<LittleEndian>() else {
			log::warn!("comment count exceeds the actual comments, stopping early");
			break;
		};

		let mut comment = try_vec![0; len as usize];
		reader.read_exact(&mut comment)?;

		let Some(equals) = comment.iter().position(|&b| b == b'=') else {
			log::warn!("skipping a field with no '=' separator");
			continue;
		};

		let key = std::str::from_utf8(&comment[..equals])?;
		let value = std::str::from_utf8(&comment[equals + 1..])?;

		if key.eq_ignore_ascii_case("METADATA_BLOCK_PICTURE") {
			match Picture::from_flac_bytes(value.as_bytes(), true) {
				Ok(picture) => tag.push_picture(picture),
				Err(e) => log::warn!("skipping an unparsable picture block: {e}"),
			}
			continue;
		}

		tag.push_text(
			ItemKey::from_key(TagType::VorbisComments, key),
			value.to_string(),
		);
	}

	Ok(vendor)
}

/// Render `tag` as a comment body
///
/// Ogg streams carry their pictures inside the comment packet, so they pass
/// `include_pictures`; FLAC writes dedicated `PICTURE` blocks instead and
/// must leave them out here, or every save would double the picture count.
pub(crate) fn render(tag: &Tag, vendor: &str, include_pictures: bool) -> Vec<u8> {
	let mut fields: Vec<Vec<u8>> = Vec::new();

	for item in tag.items() {
		let Some(text) = item.value().text() else {
			continue;
		};
		let Some(key) = item.key().map_key(TagType::VorbisComments) else {
			continue;
		};

		let mut field = Vec::with_capacity(key.len() + 1 + text.len());
		field.extend_from_slice(key.as_bytes());
		field.push(b'=');
		field.extend_from_slice(text.as_bytes());
		fields.push(field);
	}

	if include_pictures {
		for picture in tag.pictures() {
			let mut field = b"METADATA_BLOCK_PICTURE=".to_vec();
			field.extend_from_slice(&picture.as_flac_bytes(true));
			fields.push(field);
		}
	}

	let mut out = Vec::new();
	out.write_u32::<LittleEndian>(vendor.len() as u32).unwrap();
	out.extend_from_slice(vendor.as_bytes());
	out.write_u32::<LittleEndian>(fields.len() as u32).unwrap();
	for field in fields {
		out.write_u32::<LittleEndian>(field.len() as u32).unwrap();
		out.extend_from_slice(&field);
	}

	out
}

#[cfg(test)]
mod tests {
	use crate::picture::{Picture, PictureType};
	use crate::tag::{ItemKey, Tag};

	#[test_log::test]
	fn round_trip() {
		let mut tag = Tag::new();
		tag.set_title(String::from("Title"));
		tag.set_artist(String::from("Artist"));
		tag.insert_text(ItemKey::TrackNumber, String::from("3"));
		tag.insert_text(ItemKey::TrackTotal, String::from("12"));
		tag.insert_text(
			ItemKey::Unknown(String::from("CATALOGNUMBER")),
			String::from("CAT-1"),
		);
		tag.push_picture(Picture::new(
			PictureType::CoverFront,
			None,
			None,
			vec![0xFF, 0xD8, 0xFF, 9],
		));

		let body = super::render(&tag, "test vendor", true);

		let mut parsed = Tag::new();
		let vendor = super::parse(&body, &mut parsed).unwrap();

		assert_eq!(vendor, "test vendor");
		assert_eq!(parsed.title(), Some("Title"));
		assert_eq!(parsed.artist(), Some("Artist"));
		assert_eq!(parsed.track(), Some(3));
		assert_eq!(parsed.get_string(&ItemKey::TrackTotal), Some("12"));
		assert_eq!(
			parsed.get_string(&ItemKey::Unknown(String::from("CATALOGNUMBER"))),
			Some("CAT-1")
		);
		assert_eq!(parsed.pictures().len(), 1);
		assert_eq!(parsed.pictures()[0].data(), &[0xFF, 0xD8, 0xFF, 9]);
	}

	#[test_log::test]
	fn pictures_can_be_left_out_of_the_body() {
		let mut tag = Tag::new();
		tag.set_title(String::from("Title"));
		tag.push_picture(Picture::new(
			PictureType::CoverFront,
			None,
			None,
			vec![0xFF, 0xD8, 0xFF, 9],
		));

		let body = super::render(&tag, "vendor", false);

		let mut parsed = Tag::new();
		super::parse(&body, &mut parsed).unwrap();
		assert_eq!(parsed.title(), Some("Title"));
		assert!(parsed.pictures().is_empty());
	}

	#[test_log::test]
	fn separator_free_fields_are_skipped() {
		let mut body = Vec::new();
		body.extend_from_slice(&6u32.to_le_bytes());
		body.extend_from_slice(b"vendor");
		body.extend_from_slice(&2u32.to_le_bytes());
		body.extend_from_slice(&7u32.to_le_bytes());
		body.extend_from_slice(b"no sign");
		body.extend_from_slice(&11u32.to_le_bytes());
		body.extend_from_slice(b"TITLE=Found");

		let mut tag = Tag::new();
		super::parse(&body, &mut tag).unwrap();
		assert_eq!(tag.title(), Some("Found"));
		assert_eq!(tag.items().count(), 1);
	}
}

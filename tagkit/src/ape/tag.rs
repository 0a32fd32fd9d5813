//! APEv2 tag reading and writing
//!
//! Tags are written at the end of the file with both a header and a footer,
//! the most interoperable layout. Reading accepts footer-only tags as well.

use crate::error::Result;
use crate::macros::{decode_err, try_vec};
use crate::picture::{Picture, PictureType};
use crate::tag::{ItemKey, ItemValue, Tag, TagItem, TagType};

use std::io::{Cursor, Read};
use std::ops::Range;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

const FOOTER_SIZE: usize = 32;
const VERSION_APEV2: u32 = 2000;

const FLAG_HAS_HEADER: u32 = 0x8000_0000;
const FLAG_IS_HEADER: u32 = 0x2000_0000;

const ITEM_TYPE_TEXT: u32 = 0;
const ITEM_TYPE_BINARY: u32 = 1;
const ITEM_TYPE_LOCATOR: u32 = 2;

/// Locate an APE tag ending at `end` (the file length, or the start of a
/// trailing ID3v1 tag)
pub(crate) fn find(data: &[u8], end: usize) -> Option<Range<usize>> {
	if end < FOOTER_SIZE || end > data.len() {
		return None;
	}

	let footer_start = end - FOOTER_SIZE;
	let footer = &data[footer_start..end];
	if footer[..8] != crate::ape::PREAMBLE {
		return None;
	}

	let size = u32::from_le_bytes([footer[12], footer[13], footer[14], footer[15]]) as usize;
	let flags = u32::from_le_bytes([footer[20], footer[21], footer[22], footer[23]]);

	// The size covers the items and the footer, the header is extra
	let mut start = end.checked_sub(size)?;
	if flags & FLAG_HAS_HEADER == FLAG_HAS_HEADER {
		start = start.checked_sub(FOOTER_SIZE)?;
	}

	if data[start..].len() < size {
		log::warn!("APE tag claims to be larger than the file, ignoring it");
		return None;
	}

	Some(start..end)
}

/// Parse an APE tag into `tag`, filling in only the keys that are missing
///
/// When the APE tag is the primary container `tag` starts out empty and the
/// fill-in rule is a no-op; when it coexists with ID3v2, ID3v2 wins.
pub(crate) fn parse_into(ape: &[u8], tag: &mut Tag) -> Result<()> {
	if ape.len() < FOOTER_SIZE {
		decode_err!(@BAIL Ape, "APE tag is too short to hold a footer");
	}

	let footer = &ape[ape.len() - FOOTER_SIZE..];
	if footer[..8] != crate::ape::PREAMBLE {
		decode_err!(@BAIL Ape, "APE tag is missing its footer preamble");
	}

	let item_count = u32::from_le_bytes([footer[16], footer[17], footer[18], footer[19]]);
	let flags = u32::from_le_bytes([footer[20], footer[21], footer[22], footer[23]]);

	let items_start = if flags & FLAG_HAS_HEADER == FLAG_HAS_HEADER {
		FOOTER_SIZE
	} else {
		0
	};

	let mut reader = Cursor::new(&ape[items_start..ape.len() - FOOTER_SIZE]);
	for _ in 0..item_count {
		if !parse_item(&mut reader, tag)? {
			break;
		}
	}

	Ok(())
}

fn parse_item(reader: &mut Cursor<&[u8]>, tag: &mut Tag) -> Result<bool> {
	let Ok(value_size) = reader.read_u32::<LittleEndian>() else {
		return Ok(false);
	};
	let flags = reader.read_u32::<LittleEndian>()?;

	let mut key_bytes = Vec::new();
	loop {
		let byte = reader.read_u8()?;
		if byte == 0 {
			break;
		}

		if !(0x20..=0x7E).contains(&byte) {
			decode_err!(@BAIL Ape, "APE item key contains an invalid character");
		}

		key_bytes.push(byte);
	}
	let key = String::from_utf8(key_bytes)?;

	let mut value = try_vec![0; value_size as usize];
	reader.read_exact(&mut value)?;

	match (flags >> 1) & 0x3 {
		ITEM_TYPE_BINARY => {
			if key.to_ascii_lowercase().starts_with("cover art") {
				if let Some(picture) = parse_cover_art(&key, &value) {
					tag.push_picture(picture);
				}
			} else {
				let item_key = ItemKey::from_key(TagType::Ape, &key);
				if tag.get(&item_key).is_none() {
					tag.push(TagItem::new(item_key, ItemValue::Binary(value)));
				}
			}
		},
		type_flag @ (ITEM_TYPE_TEXT | ITEM_TYPE_LOCATOR) => {
			let text = String::from_utf8(value)?;
			let item_key = ItemKey::from_key(TagType::Ape, &key);
			if tag.get(&item_key).is_some() {
				return Ok(true);
			}

			match &item_key {
				ItemKey::TrackNumber => push_pair(tag, &text, ItemKey::TrackNumber, ItemKey::TrackTotal),
				ItemKey::DiscNumber => push_pair(tag, &text, ItemKey::DiscNumber, ItemKey::DiscTotal),
				_ => {
					// APE multi-values are null-separated within one item
					for value in text.split('\0').filter(|s| !s.is_empty()) {
						if type_flag == ITEM_TYPE_LOCATOR {
							tag.push(TagItem::new(
								item_key.clone(),
								ItemValue::Locator(value.to_string()),
							));
						} else {
							tag.push_text(item_key.clone(), value.to_string());
						}
					}
				},
			}
		},
		_ => {
			log::warn!("skipping an APE item with a reserved type");
		},
	}

	Ok(true)
}

fn push_pair(tag: &mut Tag, text: &str, number: ItemKey, total: ItemKey) {
	let mut split = text.splitn(2, '/');
	if let Some(num) = split.next().filter(|s| !s.is_empty()) {
		tag.push_text(number, num.to_string());
	}
	if let Some(tot) = split.next().filter(|s| !s.is_empty()) {
		if tag.get(&total).is_none() {
			tag.push_text(total, tot.to_string());
		}
	}
}

// Cover art values are a null-terminated description followed by the image
fn parse_cover_art(key: &str, value: &[u8]) -> Option<Picture> {
	let null = value.iter().position(|b| *b == 0)?;
	let (description, data) = value.split_at(null);
	let data = &data[1..];
	if data.is_empty() {
		return None;
	}

	let pic_type = if key.to_ascii_lowercase().contains("back") {
		PictureType::CoverBack
	} else {
		PictureType::CoverFront
	};

	let description = String::from_utf8(description.to_vec()).ok().filter(|d| !d.is_empty());
	Some(Picture::new(pic_type, None, description, data.to_vec()))
}

/// Render `tag` as a full APEv2 tag (header + items + footer)
///
/// An empty tag renders as no bytes at all.
pub(crate) fn render(tag: &Tag) -> Result<Vec<u8>> {
	let mut items = Vec::new();
	let mut count = 0u32;

	let mut seen: Vec<ItemKey> = Vec::new();
	for item in tag.items() {
		let key = item.key();
		if seen.contains(key) {
			continue;
		}
		seen.push(key.clone());

		match key {
			ItemKey::TrackNumber | ItemKey::TrackTotal => {
				seen.push(ItemKey::TrackNumber);
				seen.push(ItemKey::TrackTotal);
				if let Some(value) = pair_value(tag, &ItemKey::TrackNumber, &ItemKey::TrackTotal) {
					write_text_item(&mut items, "Track", &value)?;
					count += 1;
				}
			},
			ItemKey::DiscNumber | ItemKey::DiscTotal => {
				seen.push(ItemKey::DiscNumber);
				seen.push(ItemKey::DiscTotal);
				if let Some(value) = pair_value(tag, &ItemKey::DiscNumber, &ItemKey::DiscTotal) {
					write_text_item(&mut items, "Disc", &value)?;
					count += 1;
				}
			},
			ItemKey::Year | ItemKey::RecordingDate => {
				seen.push(ItemKey::Year);
				seen.push(ItemKey::RecordingDate);
				let value = tag
					.get_string(&ItemKey::RecordingDate)
					.or_else(|| tag.get_string(&ItemKey::Year));
				if let Some(value) = value {
					write_text_item(&mut items, "Year", value)?;
					count += 1;
				}
			},
			ItemKey::Unknown(unknown) => match item.value() {
				// Preserved ID3v2 frames have no business in an APE tag
				ItemValue::Binary(_) if unknown.len() == 4 => {},
				ItemValue::Binary(binary) => {
					write_item(&mut items, unknown, ITEM_TYPE_BINARY, binary)?;
					count += 1;
				},
				ItemValue::Locator(locator) => {
					write_item(&mut items, unknown, ITEM_TYPE_LOCATOR, locator.as_bytes())?;
					count += 1;
				},
				ItemValue::Text(_) => {
					let joined = join_values(tag, key);
					write_text_item(&mut items, unknown, &joined)?;
					count += 1;
				},
			},
			mapped => {
				let Some(ape_key) = mapped.map_key(TagType::Ape) else {
					continue;
				};

				match item.value() {
					ItemValue::Text(_) | ItemValue::Locator(_) => {
						let joined = join_values(tag, key);
						write_text_item(&mut items, ape_key, &joined)?;
						count += 1;
					},
					ItemValue::Binary(_) => {},
				}
			},
		}
	}

	for picture in tag.pictures() {
		let key = match picture.pic_type() {
			PictureType::CoverBack => "Cover Art (Back)",
			PictureType::CoverFront => "Cover Art (Front)",
			_ => "Cover Art (Other)",
		};

		let mut value = picture
			.description()
			.unwrap_or("cover")
			.as_bytes()
			.to_vec();
		value.push(0);
		value.extend_from_slice(picture.data());

		write_item(&mut items, key, ITEM_TYPE_BINARY, &value)?;
		count += 1;
	}

	if count == 0 {
		return Ok(Vec::new());
	}

	let tag_size = (items.len() + FOOTER_SIZE) as u32;

	let mut out = Vec::with_capacity(items.len() + FOOTER_SIZE * 2);
	write_boundary(&mut out, tag_size, count, FLAG_HAS_HEADER | FLAG_IS_HEADER)?;
	out.extend_from_slice(&items);
	write_boundary(&mut out, tag_size, count, FLAG_HAS_HEADER)?;

	Ok(out)
}

fn join_values(tag: &Tag, key: &ItemKey) -> String {
	tag.get_strings(key).collect::<Vec<_>>().join("\0")
}

fn pair_value(tag: &Tag, number: &ItemKey, total: &ItemKey) -> Option<String> {
	match (tag.get_string(number), tag.get_string(total)) {
		(Some(n), Some(t)) => Some(format!("{n}/{t}")),
		(Some(n), None) => Some(n.to_string()),
		(None, Some(t)) => Some(format!("0/{t}")),
		(None, None) => None,
	}
}

fn write_text_item(out: &mut Vec<u8>, key: &str, value: &str) -> Result<()> {
	write_item(out, key, ITEM_TYPE_TEXT, value.as_bytes())
}

fn write_item(out: &mut Vec<u8>, key: &str, item_type: u32, value: &[u8]) -> Result<()> {
	// Unwraps are infallible, the writer is a Vec
	out.write_u32::<LittleEndian>(value.len() as u32).unwrap();
	out.write_u32::<LittleEndian>(item_type << 1).unwrap();
	out.extend_from_slice(key.as_bytes());
	out.push(0);
	out.extend_from_slice(value);

	Ok(())
}

fn write_boundary(out: &mut Vec<u8>, tag_size: u32, item_count: u32, flags: u32) -> Result<()> {
	out.extend_from_slice(&crate::ape::PREAMBLE);
	out.write_u32::<LittleEndian>(VERSION_APEV2).unwrap();
	out.write_u32::<LittleEndian>(tag_size).unwrap();
	out.write_u32::<LittleEndian>(item_count).unwrap();
	out.write_u32::<LittleEndian>(flags).unwrap();
	out.extend_from_slice(&[0; 8]);

	Ok(())
}

//! The `ilst` item list

use crate::error::Result;
use crate::macros::decode_err;
use crate::mp4::{atom, children};
use crate::picture::{MimeType, Picture, PictureType};
use crate::tag::{ItemKey, Tag, TagType};

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

// `data` atom type indicators
const TYPE_BINARY: u32 = 0;
const TYPE_UTF8: u32 = 1;
const TYPE_JPEG: u32 = 13;
const TYPE_PNG: u32 = 14;
const TYPE_SIGNED_INT: u32 = 21;

pub(super) fn parse(data: &[u8], content: Range<usize>, tag: &mut Tag) -> Result<()> {
	for item in children(data, content) {
		let item = item?;

		if &item.ident == b"----" {
			parse_freeform(data, item.content(), tag)?;
			continue;
		}

		let key = ident_to_key(&item.ident);
		for (type_indicator, payload) in data_atoms(data, item.content())? {
			handle_data_atom(tag, &item.ident, &key, type_indicator, payload);
		}
	}

	Ok(())
}

fn handle_data_atom(tag: &mut Tag, ident: &[u8; 4], key: &str, type_indicator: u32, payload: &[u8]) {
	match ident {
		b"covr" => {
			let mime = match type_indicator {
				TYPE_JPEG => Some(MimeType::Jpeg),
				TYPE_PNG => Some(MimeType::Png),
				_ => MimeType::from_signature(payload),
			};
			tag.push_picture(Picture::new(
				PictureType::CoverFront,
				mime,
				None,
				payload.to_vec(),
			));
		},
		b"trkn" | b"disk" => {
			if payload.len() < 6 {
				log::warn!("skipping a truncated `{key}` pair");
				return;
			}

			let (number_key, total_key) = if ident == b"trkn" {
				(ItemKey::TrackNumber, ItemKey::TrackTotal)
			} else {
				(ItemKey::DiscNumber, ItemKey::DiscTotal)
			};

			let number = BigEndian::read_u16(&payload[2..4]);
			let total = BigEndian::read_u16(&payload[4..6]);
			if number > 0 {
				tag.push_text(number_key, number.to_string());
			}
			if total > 0 {
				tag.push_text(total_key, total.to_string());
			}
		},
		// The pre-iTunes genre atom holds an ID3v1 genre index, one-based
		b"gnre" => {
			if payload.len() >= 2 {
				let index = usize::from(BigEndian::read_u16(payload));
				if let Some(genre) = index
					.checked_sub(1)
					.and_then(|i| crate::id3::v1::GENRES.get(i))
				{
					tag.push_text(ItemKey::Genre, (*genre).to_string());
				}
			}
		},
		_ => match type_indicator {
			TYPE_UTF8 => {
				if let Ok(text) = std::str::from_utf8(payload) {
					tag.push_text(
						ItemKey::from_key(TagType::Mp4Ilst, key),
						text.to_string(),
					);
				}
			},
			TYPE_SIGNED_INT => {
				if let Some(value) = parse_signed_int(payload) {
					tag.push_text(ItemKey::from_key(TagType::Mp4Ilst, key), value.to_string());
				}
			},
			other => {
				log::debug!("skipping a `{key}` data atom with type indicator {other}");
			},
		},
	}
}

fn parse_signed_int(payload: &[u8]) -> Option<i64> {
	match payload.len() {
		1 => Some(i64::from(payload[0] as i8)),
		2 => Some(i64::from(BigEndian::read_i16(payload))),
		4 => Some(i64::from(BigEndian::read_i32(payload))),
		8 => Some(BigEndian::read_i64(payload)),
		_ => None,
	}
}

// Freeform atoms carry their key in `mean` and `name` children
fn parse_freeform(data: &[u8], content: Range<usize>, tag: &mut Tag) -> Result<()> {
	let mut mean = None;
	let mut name = None;
	let mut values = Vec::new();

	for child in children(data, content) {
		let child = child?;
		let content = child.content();
		match &child.ident {
			// Both lead with four bytes of version and flags
			b"mean" => {
				mean = Some(String::from_utf8_lossy(&data[content][4..]).into_owned());
			},
			b"name" => {
				name = Some(String::from_utf8_lossy(&data[content][4..]).into_owned());
			},
			b"data" => {
				let (type_indicator, payload) = split_data_atom(&data[content])?;
				if type_indicator == TYPE_UTF8 {
					if let Ok(text) = std::str::from_utf8(payload) {
						values.push(text.to_string());
					}
				}
			},
			_ => {},
		}
	}

	if let (Some(mean), Some(name)) = (mean, name) {
		let key = format!("----:{mean}:{name}");
		let item_key = match ItemKey::from_key(TagType::Mp4Ilst, &key) {
			// An unrecognized freeform key travels by its property name alone
			ItemKey::Unknown(_) => ItemKey::Unknown(name.to_ascii_uppercase()),
			mapped => mapped,
		};
		for value in values {
			tag.push_text(item_key.clone(), value);
		}
	}

	Ok(())
}

fn data_atoms<'a>(
	data: &'a [u8],
	content: Range<usize>,
) -> Result<Vec<(u32, &'a [u8])>> {
	let mut atoms = Vec::new();
	for child in children(data, content) {
		let child = child?;
		if &child.ident == b"data" {
			atoms.push(split_data_atom(&data[child.content()])?);
		}
	}
	Ok(atoms)
}

// A data atom's content: type indicator, locale, payload
fn split_data_atom(content: &[u8]) -> Result<(u32, &[u8])> {
	if content.len() < 8 {
		decode_err!(@BAIL Mp4, "Data atom is too short");
	}

	let type_indicator = BigEndian::read_u32(&content[..4]) & 0x00FF_FFFF;
	Ok((type_indicator, &content[8..]))
}

fn ident_to_key(ident: &[u8; 4]) -> String {
	// The iTunes copyright symbol is a single byte, not valid UTF-8
	if ident[0] == 0xA9 {
		let mut key = String::from('\u{a9}');
		key.push_str(&String::from_utf8_lossy(&ident[1..]));
		return key;
	}

	String::from_utf8_lossy(ident).into_owned()
}

fn key_to_ident(key: &str) -> Option<[u8; 4]> {
	let mut ident = [0u8; 4];
	let mut pos = 0;

	for c in key.chars() {
		if c == '\u{a9}' {
			if pos >= 4 {
				return None;
			}
			ident[pos] = 0xA9;
			pos += 1;
			continue;
		}

		if !c.is_ascii() || pos >= 4 {
			return None;
		}
		ident[pos] = c as u8;
		pos += 1;
	}

	(pos == 4).then_some(ident)
}

pub(super) fn render(tag: &Tag) -> Result<Vec<u8>> {
	let mut items = Vec::new();
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
				write_pair(
					&mut items,
					b"trkn",
					tag.get_string(&ItemKey::TrackNumber),
					tag.get_string(&ItemKey::TrackTotal),
					// trkn carries a trailing reserved short
					true,
				);
			},
			ItemKey::DiscNumber | ItemKey::DiscTotal => {
				seen.push(ItemKey::DiscNumber);
				seen.push(ItemKey::DiscTotal);
				write_pair(
					&mut items,
					b"disk",
					tag.get_string(&ItemKey::DiscNumber),
					tag.get_string(&ItemKey::DiscTotal),
					false,
				);
			},
			ItemKey::Year | ItemKey::RecordingDate => {
				seen.push(ItemKey::Year);
				seen.push(ItemKey::RecordingDate);
				let value = tag
					.get_string(&ItemKey::RecordingDate)
					.or_else(|| tag.get_string(&ItemKey::Year));
				if let Some(value) = value {
					write_text_item(&mut items, "\u{a9}day", &[value]);
				}
			},
			mapped => {
				let Some(ilst_key) = mapped.map_key(TagType::Mp4Ilst) else {
					continue;
				};

				let values: Vec<&str> = tag.get_strings(mapped).collect();
				if !values.is_empty() {
					write_text_item(&mut items, ilst_key, &values);
				}
			},
		}
	}

	if !tag.pictures().is_empty() {
		let mut content = Vec::new();
		for picture in tag.pictures() {
			let type_indicator = match picture.mime_or_sniffed() {
				MimeType::Jpeg => TYPE_JPEG,
				MimeType::Png => TYPE_PNG,
				_ => TYPE_BINARY,
			};
			content.extend_from_slice(&data_atom(type_indicator, picture.data()));
		}
		items.extend_from_slice(&atom(b"covr", &content));
	}

	Ok(atom(b"ilst", &items))
}

fn write_text_item(out: &mut Vec<u8>, key: &str, values: &[&str]) {
	// Anything without a compact ident travels as a freeform atom
	let Some(ident) = key_to_ident(key) else {
		write_freeform(out, key, values);
		return;
	};

	let mut content = Vec::new();
	for value in values {
		content.extend_from_slice(&data_atom(TYPE_UTF8, value.as_bytes()));
	}
	out.extend_from_slice(&atom(&ident, &content));
}

fn write_freeform(out: &mut Vec<u8>, key: &str, values: &[&str]) {
	let mut parts = key.splitn(3, ':');
	let (mean, name) = match (parts.next(), parts.next(), parts.next()) {
		(Some("----"), Some(mean), Some(name)) => (mean.to_string(), name.to_string()),
		// A bare property name gets the iTunes namespace
		_ => (String::from("com.apple.iTunes"), key.to_string()),
	};

	let mut content = Vec::new();

	let mut mean_content = vec![0u8; 4];
	mean_content.extend_from_slice(mean.as_bytes());
	content.extend_from_slice(&atom(b"mean", &mean_content));

	let mut name_content = vec![0u8; 4];
	name_content.extend_from_slice(name.as_bytes());
	content.extend_from_slice(&atom(b"name", &name_content));

	for value in values {
		content.extend_from_slice(&data_atom(TYPE_UTF8, value.as_bytes()));
	}

	out.extend_from_slice(&atom(b"----", &content));
}

fn write_pair(
	out: &mut Vec<u8>,
	ident: &[u8; 4],
	number: Option<&str>,
	total: Option<&str>,
	trailing_short: bool,
) {
	let number: u16 = number.and_then(|n| n.parse().ok()).unwrap_or(0);
	let total: u16 = total.and_then(|t| t.parse().ok()).unwrap_or(0);
	if number == 0 && total == 0 {
		return;
	}

	let mut payload = Vec::with_capacity(8);
	payload.write_u16::<BigEndian>(0).unwrap();
	payload.write_u16::<BigEndian>(number).unwrap();
	payload.write_u16::<BigEndian>(total).unwrap();
	if trailing_short {
		payload.write_u16::<BigEndian>(0).unwrap();
	}

	out.extend_from_slice(&atom(ident, &data_atom(TYPE_BINARY, &payload)));
}

fn data_atom(type_indicator: u32, payload: &[u8]) -> Vec<u8> {
	let mut content = Vec::with_capacity(8 + payload.len());
	content.write_u32::<BigEndian>(type_indicator).unwrap();
	content.write_u32::<BigEndian>(0).unwrap(); // locale
	content.extend_from_slice(payload);
	atom(b"data", &content)
}

#[cfg(test)]
mod tests {
	use crate::picture::{MimeType, Picture, PictureType};
	use crate::tag::{ItemKey, Tag};

	#[test_log::test]
	fn ilst_round_trip() {
		let mut tag = Tag::new();
		tag.set_title(String::from("Title"));
		tag.set_album_artist(String::from("Band"));
		tag.set_track(7);
		tag.insert_text(ItemKey::TrackTotal, String::from("13"));
		tag.insert_text(ItemKey::RecordingDate, String::from("2011-05-01"));
		tag.insert_text(ItemKey::Conductor, String::from("Someone"));
		tag.insert_text(
			ItemKey::Unknown(String::from("CATALOGNUMBER")),
			String::from("CAT-1"),
		);
		tag.push_picture(Picture::new(
			PictureType::CoverFront,
			Some(MimeType::Png),
			None,
			vec![1, 2, 3],
		));

		let bytes = super::render(&tag).unwrap();

		let mut parsed = Tag::new();
		let ilst = super::super::parse_atom(&bytes, 0, bytes.len()).unwrap();
		super::parse(&bytes, ilst.content(), &mut parsed).unwrap();

		assert_eq!(parsed.title(), Some("Title"));
		assert_eq!(parsed.album_artist(), Some("Band"));
		assert_eq!(parsed.track(), Some(7));
		assert_eq!(parsed.get_string(&ItemKey::TrackTotal), Some("13"));
		assert_eq!(parsed.year(), Some(2011));
		assert_eq!(parsed.get_string(&ItemKey::Conductor), Some("Someone"));
		assert_eq!(
			parsed.get_string(&ItemKey::Unknown(String::from("CATALOGNUMBER"))),
			Some("CAT-1")
		);
		assert_eq!(parsed.pictures().len(), 1);
		assert_eq!(parsed.pictures()[0].mime_type(), Some(&MimeType::Png));
	}

	#[test_log::test]
	fn legacy_genre_index() {
		// gnre holds a one-based ID3v1 genre index; 18 is "Rock"
		let payload = [0u8, 18];
		let data_atom = super::data_atom(super::TYPE_BINARY, &payload);
		let gnre = super::super::atom(b"gnre", &data_atom);
		let ilst = super::super::atom(b"ilst", &gnre);

		let mut tag = Tag::new();
		let info = super::super::parse_atom(&ilst, 0, ilst.len()).unwrap();
		super::parse(&ilst, info.content(), &mut tag).unwrap();
		assert_eq!(tag.genre(), Some("Rock"));
	}
}

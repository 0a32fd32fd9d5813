use crate::error::Result;
use crate::id3::v1::GENRES;
use crate::id3::v2::header::{Id3v2Header, Id3v2Version};
use crate::id3::v2::synchsafe::{SynchsafeInteger, remove_unsynchronisation};
use crate::macros::decode_err;
use crate::picture::{MimeType, Picture, PictureType};
use crate::tag::{ItemKey, ItemValue, Tag, TagItem, TagType};
use crate::util::text::{
	TextEncoding, decode_text, decode_text_continued, decode_text_terminated,
};

use std::borrow::Cow;
use std::io::{Cursor, Read};

use byteorder::ReadBytesExt;

// v2.4 frame status/format flags
const FRAME_FLAG_COMPRESSION: u16 = 0x0008;
const FRAME_FLAG_ENCRYPTION: u16 = 0x0004;
const FRAME_FLAG_UNSYNCHRONISATION: u16 = 0x0002;
const FRAME_FLAG_DATA_LENGTH_INDICATOR: u16 = 0x0001;

/// Parse a full ID3v2 tag (header included) into `tag`
pub(crate) fn parse_id3v2(data: &[u8], tag: &mut Tag) -> Result<()> {
	let mut reader = &data[..];
	let header = Id3v2Header::parse(&mut reader)?;

	let content_len = (header.size as usize).min(data.len().saturating_sub(10));
	let mut content = Cow::Borrowed(&data[10..10 + content_len]);

	// Before v2.4, unsynchronisation covers the tag as a whole
	if header.flags.unsynchronisation && header.version != Id3v2Version::V4 {
		content = Cow::Owned(remove_unsynchronisation(&content));
	}

	let buf: &[u8] = &content;
	let mut pos = 0usize;

	if header.flags.extended_header {
		let mut ext_reader = &buf[..];
		pos = header.skip_extended_header(&mut ext_reader)? as usize;
	}

	let frame_header_len = match header.version {
		Id3v2Version::V2 => 6,
		Id3v2Version::V3 | Id3v2Version::V4 => 10,
	};

	while pos + frame_header_len <= buf.len() {
		if buf[pos] == 0 {
			// Padding
			break;
		}

		let (id, size, flags);
		match header.version {
			Id3v2Version::V2 => {
				id = upgrade_v2_id(&buf[pos..pos + 3]);
				size = u32::from_be_bytes([0, buf[pos + 3], buf[pos + 4], buf[pos + 5]]) as usize;
				flags = 0u16;
			},
			Id3v2Version::V3 => {
				id = frame_id(&buf[pos..pos + 4]);
				size =
					u32::from_be_bytes([buf[pos + 4], buf[pos + 5], buf[pos + 6], buf[pos + 7]])
						as usize;
				flags = u16::from_be_bytes([buf[pos + 8], buf[pos + 9]]);
			},
			Id3v2Version::V4 => {
				id = frame_id(&buf[pos..pos + 4]);
				let raw_size =
					u32::from_be_bytes([buf[pos + 4], buf[pos + 5], buf[pos + 6], buf[pos + 7]]);
				size = raw_size.unsynch() as usize;
				flags = u16::from_be_bytes([buf[pos + 8], buf[pos + 9]]);
			},
		}

		let Some(id) = id else {
			log::warn!("encountered an invalid frame ID, stopping the frame parse");
			break;
		};

		pos += frame_header_len;
		if size == 0 {
			continue;
		}

		if pos + size > buf.len() {
			log::warn!("frame `{id}` overflows the tag, stopping the frame parse");
			break;
		}

		let frame = &buf[pos..pos + size];
		pos += size;

		handle_frame(&id, flags, frame, header.version, tag)?;
	}

	Ok(())
}

fn frame_id(bytes: &[u8]) -> Option<String> {
	if bytes
		.iter()
		.all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
	{
		return Some(String::from_utf8(bytes.to_vec()).ok()?);
	}

	None
}

// v2.2 used 3-character frame IDs; only the ones with a v2.4 equivalent are
// carried over, the rest cannot survive a v2.4 rewrite and are dropped.
fn upgrade_v2_id(id: &[u8]) -> Option<String> {
	let upgraded = match id {
		b"TT2" => "TIT2",
		b"TP1" => "TPE1",
		b"TP2" => "TPE2",
		b"TP3" => "TPE3",
		b"TAL" => "TALB",
		b"TRK" => "TRCK",
		b"TPA" => "TPOS",
		b"TYE" => "TDRC",
		b"TCO" => "TCON",
		b"TCM" => "TCOM",
		b"TPB" => "TPUB",
		b"TCR" => "TCOP",
		b"TEN" => "TENC",
		b"TSS" => "TSSE",
		b"TXX" => "TXXX",
		b"COM" => "COMM",
		b"ULT" => "USLT",
		b"PIC" => "PIC",
		_ => {
			log::debug!("dropping ID3v2.2 frame {:?}, no v2.4 equivalent", id);
			return None;
		},
	};

	Some(upgraded.to_string())
}

fn handle_frame(
	id: &str,
	flags: u16,
	frame: &[u8],
	version: Id3v2Version,
	tag: &mut Tag,
) -> Result<()> {
	if version == Id3v2Version::V3 && flags & 0x00C0 != 0 {
		log::warn!("skipping compressed/encrypted ID3v2.3 frame `{id}`");
		return Ok(());
	}

	if version == Id3v2Version::V4
		&& flags & (FRAME_FLAG_COMPRESSION | FRAME_FLAG_ENCRYPTION) != 0
	{
		// Carried verbatim, flags first, so a rewrite can reproduce the frame
		log::debug!("preserving compressed/encrypted frame `{id}` without decoding");
		let mut preserved = flags.to_be_bytes().to_vec();
		preserved.extend_from_slice(frame);
		tag.push(TagItem::new(
			ItemKey::Unknown(id.to_string()),
			ItemValue::Binary(preserved),
		));
		return Ok(());
	}

	let mut frame = Cow::Borrowed(frame);
	if version == Id3v2Version::V4 && flags & FRAME_FLAG_UNSYNCHRONISATION != 0 {
		frame = Cow::Owned(remove_unsynchronisation(&frame));
	}

	if version == Id3v2Version::V4 && flags & FRAME_FLAG_DATA_LENGTH_INDICATOR != 0 {
		if frame.len() < 4 {
			decode_err!(@BAIL "Frame is too short to hold its data length indicator");
		}

		frame = Cow::Owned(frame[4..].to_vec());
	}
	let frame: &[u8] = &frame;

	match id {
		"PIC" => {
			if let Some(picture) = parse_pic_v2(frame) {
				tag.push_picture(picture);
			}
		},
		"APIC" => {
			if let Some(picture) = parse_apic(frame) {
				tag.push_picture(picture);
			}
		},
		"TXXX" => parse_user_text(frame, tag)?,
		"COMM" => parse_comment_like(frame, ItemKey::Comment, tag)?,
		"USLT" => parse_comment_like(frame, ItemKey::Lyrics, tag)?,
		"TRCK" => parse_pair(frame, ItemKey::TrackNumber, ItemKey::TrackTotal, tag)?,
		"TPOS" => parse_pair(frame, ItemKey::DiscNumber, ItemKey::DiscTotal, tag)?,
		"TCON" => {
			for value in parse_text_values(frame)? {
				tag.push_text(ItemKey::Genre, resolve_genre(value));
			}
		},
		_ if id.starts_with('T') => {
			let key = ItemKey::from_key(TagType::Id3v2, id);
			for value in parse_text_values(frame)? {
				tag.push_text(key.clone(), value);
			}
		},
		_ => {
			// Unmapped frame, carried verbatim for round-trip fidelity
			let mut preserved = flags.to_be_bytes().to_vec();
			preserved.extend_from_slice(frame);
			tag.push(TagItem::new(
				ItemKey::Unknown(id.to_string()),
				ItemValue::Binary(preserved),
			));
		},
	}

	Ok(())
}

fn parse_text_values(frame: &[u8]) -> Result<Vec<String>> {
	let Some((&encoding_byte, rest)) = frame.split_first() else {
		return Ok(Vec::new());
	};

	let Some(encoding) = TextEncoding::from_u8(encoding_byte) else {
		decode_err!(@BAIL "Text frame has an invalid encoding");
	};

	let decoded = decode_text(&mut Cursor::new(rest), encoding)?;

	Ok(decoded
		.content
		.split('\0')
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect())
}

fn parse_pair(frame: &[u8], number: ItemKey, total: ItemKey, tag: &mut Tag) -> Result<()> {
	if let Some(value) = parse_text_values(frame)?.into_iter().next() {
		let mut split = value.splitn(2, '/');
		if let Some(num) = split.next().filter(|s| !s.is_empty()) {
			tag.push_text(number, num.to_string());
		}
		if let Some(tot) = split.next().filter(|s| !s.is_empty()) {
			tag.push_text(total, tot.to_string());
		}
	}

	Ok(())
}

fn parse_user_text(frame: &[u8], tag: &mut Tag) -> Result<()> {
	let mut reader = Cursor::new(frame);
	let Some(encoding) = TextEncoding::from_u8(reader.read_u8()?) else {
		decode_err!(@BAIL "TXXX frame has an invalid encoding");
	};

	let description = decode_text_terminated(&mut reader, encoding)?;
	let value = decode_text_continued(&mut reader, encoding, &description)?;

	if description.content.is_empty() {
		log::warn!("skipping a TXXX frame with an empty description");
		return Ok(());
	}

	let key = ItemKey::Unknown(description.content.to_ascii_uppercase());
	for value in value.content.split('\0').filter(|s| !s.is_empty()) {
		tag.push_text(key.clone(), value.to_string());
	}

	Ok(())
}

// COMM and USLT share a layout: encoding, language, described text
fn parse_comment_like(frame: &[u8], key: ItemKey, tag: &mut Tag) -> Result<()> {
	let mut reader = Cursor::new(frame);
	let Some(encoding) = TextEncoding::from_u8(reader.read_u8()?) else {
		decode_err!(@BAIL "Comment frame has an invalid encoding");
	};

	// The language is not carried through the unified model
	let mut _language = [0; 3];
	reader.read_exact(&mut _language)?;

	let description = decode_text_terminated(&mut reader, encoding)?;
	let text = decode_text_continued(&mut reader, encoding, &description)?;

	if let Some(text) = text.text_or_none() {
		tag.push_text(key, text);
	}

	Ok(())
}

fn parse_apic(frame: &[u8]) -> Option<Picture> {
	let mut reader = Cursor::new(frame);
	let encoding = TextEncoding::from_u8(reader.read_u8().ok()?)?;

	let mime = decode_text_terminated(&mut reader, TextEncoding::Latin1).ok()?;
	let mime_type = (!mime.content.is_empty()).then(|| MimeType::from_str(&mime.content));

	let pic_type = PictureType::from_u8(reader.read_u8().ok()?);

	let description = decode_text_terminated(&mut reader, encoding)
		.ok()?
		.text_or_none();

	let mut data = Vec::new();
	reader.read_to_end(&mut data).ok()?;
	if data.is_empty() {
		log::warn!("skipping an APIC frame with no image data");
		return None;
	}

	Some(Picture::new(pic_type, mime_type, description, data))
}

// The v2.2 picture frame stores a 3-character image format instead of a MIME type
fn parse_pic_v2(frame: &[u8]) -> Option<Picture> {
	let mut reader = Cursor::new(frame);
	let encoding = TextEncoding::from_u8(reader.read_u8().ok()?)?;

	let mut format = [0; 3];
	reader.read_exact(&mut format).ok()?;
	let mime_type = match &format {
		b"PNG" => Some(MimeType::Png),
		b"JPG" => Some(MimeType::Jpeg),
		_ => {
			log::warn!("PIC frame has an unexpected image format {:?}", format);
			None
		},
	};

	let pic_type = PictureType::from_u8(reader.read_u8().ok()?);
	let description = decode_text_terminated(&mut reader, encoding)
		.ok()?
		.text_or_none();

	let mut data = Vec::new();
	reader.read_to_end(&mut data).ok()?;
	if data.is_empty() {
		return None;
	}

	Some(Picture::new(pic_type, mime_type, description, data))
}

// "(3)", "3", and "Dance" should all read back as the same genre
fn resolve_genre(value: String) -> String {
	let inner = value
		.strip_prefix('(')
		.and_then(|v| v.strip_suffix(')'))
		.unwrap_or(&value);

	match inner {
		"RX" => String::from("Remix"),
		"CR" => String::from("Cover"),
		_ => match inner.parse::<usize>() {
			Ok(index) => GENRES
				.get(index)
				.map_or(value.clone(), |genre| (*genre).to_string()),
			Err(_) => value,
		},
	}
}

#[cfg(test)]
mod tests {
	use crate::id3::v2::write;
	use crate::picture::{MimeType, Picture, PictureType};
	use crate::tag::{ItemKey, Tag};

	fn round_trip(tag: &Tag) -> Tag {
		let bytes = write::render(tag, None).unwrap();
		let mut parsed = Tag::new();
		super::parse_id3v2(&bytes, &mut parsed).unwrap();
		parsed
	}

	#[test_log::test]
	fn text_frames_round_trip() {
		let mut tag = Tag::new();
		tag.set_title(String::from("Sn\u{00f8}fall"));
		tag.set_artist(String::from("Artist"));
		tag.set_album(String::from("Album"));
		tag.set_genre(String::from("Darkwave"));
		tag.set_comment(String::from("a comment"));
		tag.set_track(3);
		tag.insert_text(ItemKey::TrackTotal, String::from("12"));
		tag.set_year(2011);

		let parsed = round_trip(&tag);
		assert_eq!(parsed.title(), Some("Sn\u{00f8}fall"));
		assert_eq!(parsed.artist(), Some("Artist"));
		assert_eq!(parsed.album(), Some("Album"));
		assert_eq!(parsed.genre(), Some("Darkwave"));
		assert_eq!(parsed.comment(), Some("a comment"));
		assert_eq!(parsed.track(), Some(3));
		assert_eq!(
			parsed.get_string(&ItemKey::TrackTotal),
			Some("12")
		);
		assert_eq!(parsed.year(), Some(2011));
	}

	#[test_log::test]
	fn user_text_round_trip() {
		let mut tag = Tag::new();
		tag.insert_text(
			ItemKey::Unknown(String::from("CATALOGNUMBER")),
			String::from("TK-001"),
		);

		let parsed = round_trip(&tag);
		assert_eq!(
			parsed.get_string(&ItemKey::Unknown(String::from("CATALOGNUMBER"))),
			Some("TK-001")
		);
	}

	#[test_log::test]
	fn apic_round_trip() {
		let mut tag = Tag::new();
		tag.push_picture(Picture::new(
			PictureType::CoverFront,
			Some(MimeType::Png),
			Some(String::from("front")),
			vec![0x89, b'P', b'N', b'G', 1, 2, 3],
		));

		let parsed = round_trip(&tag);
		assert_eq!(parsed.pictures().len(), 1);
		let picture = &parsed.pictures()[0];
		assert_eq!(picture.pic_type(), PictureType::CoverFront);
		assert_eq!(picture.mime_type(), Some(&MimeType::Png));
		assert_eq!(picture.description(), Some("front"));
		assert_eq!(picture.data(), &[0x89, b'P', b'N', b'G', 1, 2, 3]);
	}

	#[test_log::test]
	fn numeric_genre_is_resolved() {
		assert_eq!(super::resolve_genre(String::from("(8)")), "Jazz");
		assert_eq!(super::resolve_genre(String::from("17")), "Rock");
		assert_eq!(super::resolve_genre(String::from("Swing")), "Swing");
		assert_eq!(super::resolve_genre(String::from("(300)")), "(300)");
	}

	#[test_log::test]
	fn unknown_frames_survive() {
		let mut tag = Tag::new();
		tag.set_title(String::from("t"));

		let mut bytes = write::render(&tag, None).unwrap();
		// Append a POPM frame by hand: header + 6 content bytes
		let extra = [
			b'P', b'O', b'P', b'M', 0, 0, 0, 6, 0, 0, // header
			b'a', 0, 250, 0, 0, 1, // content
		];
		// Rebuild with enough room: strip padding down to the frames we control
		bytes.truncate(10);
		let mut frames = Vec::new();
		frames.extend_from_slice(&extra);
		let total = frames.len() as u32;
		bytes[6..10].copy_from_slice(&[
			0,
			0,
			((total >> 7) & 0x7F) as u8,
			(total & 0x7F) as u8,
		]);
		bytes.extend_from_slice(&frames);

		let mut parsed = Tag::new();
		super::parse_id3v2(&bytes, &mut parsed).unwrap();

		let item = parsed
			.get(&ItemKey::Unknown(String::from("POPM")))
			.expect("preserved frame");
		match item.value() {
			crate::tag::ItemValue::Binary(raw) => {
				// Two flag bytes, then the content
				assert_eq!(&raw[2..], &[b'a', 0, 250, 0, 0, 1]);
			},
			_ => panic!("expected a binary item"),
		}

		let rendered = write::render(&parsed, None).unwrap();
		let mut reparsed = Tag::new();
		super::parse_id3v2(&rendered, &mut reparsed).unwrap();
		assert!(
			reparsed
				.get(&ItemKey::Unknown(String::from("POPM")))
				.is_some()
		);
	}
}

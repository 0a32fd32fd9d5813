use crate::error::Result;
use crate::id3::v2::synchsafe::SynchsafeInteger;
use crate::macros::encode_err;
use crate::tag::{ItemKey, ItemValue, Tag};
use crate::util::text::TextEncoding;

// Room left after the frames so the next save of a similar-sized tag can
// happen in place.
const DEFAULT_PADDING: usize = 1024;

const UNKNOWN_LANGUAGE: [u8; 3] = *b"XXX";

/// Render `tag` as a complete ID3v2.4 tag
///
/// When `min_total_size` is given and the rendered tag is smaller, the
/// padding grows so the output occupies exactly that many bytes; the save
/// engine uses this to overwrite an existing tag region in place.
///
/// An empty tag renders as no bytes at all.
pub(crate) fn render(tag: &Tag, min_total_size: Option<usize>) -> Result<Vec<u8>> {
	let mut frames = Vec::new();
	render_frames(tag, &mut frames)?;

	if frames.is_empty() {
		return Ok(Vec::new());
	}

	let padding = match min_total_size {
		Some(min) if frames.len() + 10 < min => min - 10 - frames.len(),
		_ => DEFAULT_PADDING,
	};

	let content_size = frames.len() + padding;
	let mut out = Vec::with_capacity(10 + content_size);
	out.extend_from_slice(b"ID3\x04\x00\x00");
	out.extend_from_slice(&(content_size as u32).synch()?.to_be_bytes());
	out.extend_from_slice(&frames);
	out.resize(10 + content_size, 0);

	Ok(out)
}

fn render_frames(tag: &Tag, out: &mut Vec<u8>) -> Result<()> {
	let mut seen: Vec<ItemKey> = Vec::new();

	for item in tag.items() {
		let key = item.key();
		if seen.contains(key) {
			continue;
		}
		seen.push(key.clone());

		match key {
			// The pair renders once, whichever half shows up first
			ItemKey::TrackNumber | ItemKey::TrackTotal => {
				seen.push(ItemKey::TrackNumber);
				seen.push(ItemKey::TrackTotal);
				if let Some(value) =
					pair_value(tag, &ItemKey::TrackNumber, &ItemKey::TrackTotal)
				{
					write_text_frame(out, "TRCK", &[&value])?;
				}
			},
			ItemKey::DiscNumber | ItemKey::DiscTotal => {
				seen.push(ItemKey::DiscNumber);
				seen.push(ItemKey::DiscTotal);
				if let Some(value) = pair_value(tag, &ItemKey::DiscNumber, &ItemKey::DiscTotal) {
					write_text_frame(out, "TPOS", &[&value])?;
				}
			},
			// A full date wins over a bare year
			ItemKey::Year | ItemKey::RecordingDate => {
				seen.push(ItemKey::Year);
				seen.push(ItemKey::RecordingDate);
				let value = tag
					.get_string(&ItemKey::RecordingDate)
					.or_else(|| tag.get_string(&ItemKey::Year));
				if let Some(value) = value {
					write_text_frame(out, "TDRC", &[value])?;
				}
			},
			ItemKey::Comment => {
				for value in tag.get_strings(&ItemKey::Comment) {
					write_comment_like(out, "COMM", value)?;
				}
			},
			ItemKey::Lyrics => {
				for value in tag.get_strings(&ItemKey::Lyrics) {
					write_comment_like(out, "USLT", value)?;
				}
			},
			ItemKey::Unknown(unknown) => write_unknown(out, tag, unknown, item.value())?,
			mapped => {
				let Some(id) = mapped.map_key(crate::tag::TagType::Id3v2) else {
					continue;
				};

				let values: Vec<&str> = tag.get_strings(mapped).collect();
				if !values.is_empty() {
					write_text_frame(out, id, &values)?;
				}
			},
		}
	}

	for picture in tag.pictures() {
		write_apic(out, picture)?;
	}

	Ok(())
}

fn pair_value(tag: &Tag, number: &ItemKey, total: &ItemKey) -> Option<String> {
	match (tag.get_string(number), tag.get_string(total)) {
		(Some(n), Some(t)) => Some(format!("{n}/{t}")),
		(Some(n), None) => Some(n.to_string()),
		// A total with no number still needs a slot on the left
		(None, Some(t)) => Some(format!("0/{t}")),
		(None, None) => None,
	}
}

fn write_unknown(out: &mut Vec<u8>, tag: &Tag, key: &str, value: &ItemValue) -> Result<()> {
	match value {
		// A preserved frame: the original flags lead the content
		ItemValue::Binary(raw) if is_frame_id(key) => {
			if raw.len() < 2 {
				return Ok(());
			}

			let flags = u16::from_be_bytes([raw[0], raw[1]]);
			write_frame(out, key, flags, &raw[2..])
		},
		ItemValue::Binary(_) => {
			log::warn!("dropping binary item `{key}`, not a valid ID3v2 frame");
			Ok(())
		},
		// A bare text frame id round-trips as that frame, anything else is a TXXX
		ItemValue::Text(_) | ItemValue::Locator(_) => {
			let item_key = ItemKey::Unknown(key.to_string());
			let values: Vec<&str> = tag.get_strings(&item_key).collect();
			if values.is_empty() {
				return Ok(());
			}

			if key.starts_with('T') && key != "TXXX" && is_frame_id(key) {
				write_text_frame(out, key, &values)
			} else {
				write_user_text_frame(out, key, &values)
			}
		},
	}
}

fn is_frame_id(id: &str) -> bool {
	id.len() == 4
		&& id
			.bytes()
			.all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

fn write_text_frame(out: &mut Vec<u8>, id: &str, values: &[&str]) -> Result<()> {
	let mut content = vec![TextEncoding::Utf8 as u8];
	content.extend_from_slice(values.join("\0").as_bytes());
	write_frame(out, id, 0, &content)
}

fn write_user_text_frame(out: &mut Vec<u8>, description: &str, values: &[&str]) -> Result<()> {
	let mut content = vec![TextEncoding::Utf8 as u8];
	content.extend_from_slice(description.as_bytes());
	content.push(0);
	content.extend_from_slice(values.join("\0").as_bytes());
	write_frame(out, "TXXX", 0, &content)
}

fn write_comment_like(out: &mut Vec<u8>, id: &str, text: &str) -> Result<()> {
	let mut content = vec![TextEncoding::Utf8 as u8];
	content.extend_from_slice(&UNKNOWN_LANGUAGE);
	// Empty description
	content.push(0);
	content.extend_from_slice(text.as_bytes());
	write_frame(out, id, 0, &content)
}

fn write_apic(out: &mut Vec<u8>, picture: &crate::picture::Picture) -> Result<()> {
	let mime = picture.mime_or_sniffed();

	let mut content = vec![TextEncoding::Utf8 as u8];
	content.extend_from_slice(mime.as_str().as_bytes());
	content.push(0);
	content.push(picture.pic_type().as_u8());
	content.extend_from_slice(picture.description().unwrap_or_default().as_bytes());
	content.push(0);
	content.extend_from_slice(picture.data());

	write_frame(out, "APIC", 0, &content)
}

fn write_frame(out: &mut Vec<u8>, id: &str, flags: u16, content: &[u8]) -> Result<()> {
	if !is_frame_id(id) {
		return Err(encode_err!("Attempted to write an invalid ID3v2 frame ID"));
	}

	let size = (content.len() as u32).synch()?;

	out.extend_from_slice(id.as_bytes());
	out.extend_from_slice(&size.to_be_bytes());
	out.extend_from_slice(&flags.to_be_bytes());
	out.extend_from_slice(content);

	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::tag::Tag;

	#[test_log::test]
	fn empty_tag_renders_nothing() {
		assert!(super::render(&Tag::new(), None).unwrap().is_empty());
	}

	#[test_log::test]
	fn minimum_size_is_honoured() {
		let mut tag = Tag::new();
		tag.set_title(String::from("t"));

		let bytes = super::render(&tag, Some(4096)).unwrap();
		assert_eq!(bytes.len(), 4096);
		assert_eq!(&bytes[..3], b"ID3");

		// Smaller than the rendered tag: the default padding applies instead
		let bytes = super::render(&tag, Some(4)).unwrap();
		assert!(bytes.len() > 4);
	}
}

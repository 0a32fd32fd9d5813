//! FLAC metadata blocks

pub(crate) mod properties;

use crate::error::Result;
use crate::layout::{Layout, ParsedFile};
use crate::macros::{decode_err, encode_err, err};
use crate::ogg::comments;
use crate::picture::Picture;
use crate::tag::Tag;

use std::ops::Range;

const BLOCK_STREAMINFO: u8 = 0;
const BLOCK_PADDING: u8 = 1;
const BLOCK_VORBIS_COMMENT: u8 = 4;
const BLOCK_PICTURE: u8 = 6;

const LAST_BLOCK: u8 = 0x80;

// The padding block appended on every rewrite
const PADDING_SIZE: usize = 4096;

/// Where the FLAC metadata sat in the original file
pub(crate) struct FlacLayout {
	/// Length of a leading ID3v2 tag, stripped on write
	pub id3v2_len: usize,
	/// Blocks carried over verbatim on a rewrite, STREAMINFO first
	pub kept_blocks: Vec<(u8, Range<usize>)>,
	pub vendor: String,
	pub audio_start: usize,
}

pub(crate) fn read(data: &[u8]) -> Result<ParsedFile> {
	// Some taggers put an ID3v2 tag in front of the stream marker. Its
	// contents lose to the native metadata, so it is skipped and later
	// stripped on write.
	let id3v2_len = crate::id3::v2::header::find_id3v2(data).map_or(0, |r| {
		log::debug!("ignoring an ID3v2 tag in a FLAC file");
		r.len()
	});

	let stream = &data[id3v2_len..];
	if stream.len() < 8 || &stream[..4] != b"fLaC" {
		decode_err!(@BAIL Flac, "Expected a \"fLaC\" stream marker");
	}

	let mut tag = Tag::new();
	let mut vendor = String::new();
	let mut kept_blocks = Vec::new();
	let mut streaminfo: Option<Range<usize>> = None;

	let mut pos = id3v2_len + 4;
	loop {
		if pos + 4 > data.len() {
			decode_err!(@BAIL Flac, "Metadata block header runs past the end of the file");
		}

		let header = data[pos];
		let block_type = header & 0x7F;
		let length =
			usize::from(data[pos + 1]) << 16 | usize::from(data[pos + 2]) << 8 | usize::from(data[pos + 3]);

		let content = pos + 4..pos + 4 + length;
		if content.end > data.len() {
			decode_err!(@BAIL Flac, "Metadata block runs past the end of the file");
		}

		match block_type {
			BLOCK_STREAMINFO => {
				streaminfo = Some(content.clone());
				kept_blocks.push((block_type, content.clone()));
			},
			BLOCK_VORBIS_COMMENT => {
				vendor = comments::parse(&data[content.clone()], &mut tag)?;
			},
			BLOCK_PICTURE => match Picture::from_flac_bytes(&data[content.clone()], false) {
				Ok(picture) => tag.push_picture(picture),
				Err(e) => log::warn!("skipping an unparsable PICTURE block: {e}"),
			},
			// Padding is regenerated on write
			BLOCK_PADDING => {},
			_ => kept_blocks.push((block_type, content.clone())),
		}

		pos = content.end;
		if header & LAST_BLOCK == LAST_BLOCK {
			break;
		}
	}

	let Some(streaminfo) = streaminfo else {
		decode_err!(@BAIL Flac, "File has no STREAMINFO block");
	};

	let properties =
		properties::read_streaminfo(&data[streaminfo], (data.len() - pos) as u64)?;

	Ok(ParsedFile {
		tag,
		properties,
		layout: Layout::Flac(FlacLayout {
			id3v2_len,
			kept_blocks,
			vendor,
			audio_start: pos,
		}),
	})
}

/// Rebuild the whole file with fresh metadata blocks
///
/// An empty tag still gets a comment block carrying the vendor string, the
/// layout every FLAC tool produces.
pub(crate) fn render(data: &[u8], layout: &FlacLayout, tag: &Tag) -> Result<Vec<u8>> {
	let mut out = Vec::with_capacity(data.len());
	out.extend_from_slice(b"fLaC");

	for (block_type, range) in &layout.kept_blocks {
		write_block(&mut out, *block_type, &data[range.clone()], false)?;
	}

	// Pictures go in dedicated blocks below, never in the comment body
	let comment_body = comments::render(tag, &layout.vendor, false);
	write_block(&mut out, BLOCK_VORBIS_COMMENT, &comment_body, false)?;

	for picture in tag.pictures() {
		write_block(&mut out, BLOCK_PICTURE, &picture.as_flac_bytes(false), false)?;
	}

	write_block(&mut out, BLOCK_PADDING, &[0; PADDING_SIZE], true)?;

	out.extend_from_slice(&data[layout.audio_start..]);
	Ok(out)
}

fn write_block(out: &mut Vec<u8>, block_type: u8, content: &[u8], last: bool) -> Result<()> {
	if content.len() >= 1 << 24 {
		if block_type == BLOCK_PICTURE {
			err!(TooMuchData);
		}
		encode_err!(@BAIL Flac, "Metadata block content exceeds 16 MiB");
	}

	out.push(block_type | if last { LAST_BLOCK } else { 0 });
	out.extend_from_slice(&[
		(content.len() >> 16) as u8,
		(content.len() >> 8) as u8,
		content.len() as u8,
	]);
	out.extend_from_slice(content);

	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::layout::Layout;
	use crate::tag::Tag;

	// 44.1 kHz, 2 channels, 16 bps, 441000 samples
	const STREAMINFO: [u8; 34] = [
		0x10, 0x00, 0x10, 0x00, 0, 0, 0, 0, 0, 0, 0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x06, 0xBA, 0xA8,
		0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
	];

	fn flac_file() -> Vec<u8> {
		let mut data = b"fLaC".to_vec();
		data.push(0x80); // STREAMINFO, last block
		data.extend_from_slice(&[0, 0, 34]);
		data.extend_from_slice(&STREAMINFO);
		data.extend_from_slice(&[0xF8; 256]); // frames
		data
	}

	#[test_log::test]
	fn read_bare_file() {
		let parsed = super::read(&flac_file()).unwrap();
		assert!(parsed.tag.is_empty());
		assert_eq!(parsed.properties.sample_rate(), 44100);
		assert_eq!(parsed.properties.channels(), 2);
		assert_eq!(parsed.properties.duration().as_secs(), 10);
	}

	#[test_log::test]
	fn rewrite_round_trip() {
		let data = flac_file();
		let parsed = super::read(&data).unwrap();
		let Layout::Flac(layout) = &parsed.layout else {
			unreachable!()
		};

		let mut tag = Tag::new();
		tag.set_title(String::from("Title"));
		let rewritten = super::render(&data, layout, &tag).unwrap();

		let reparsed = super::read(&rewritten).unwrap();
		assert_eq!(reparsed.tag.title(), Some("Title"));
		assert_eq!(reparsed.properties.sample_rate(), 44100);

		// The audio is untouched
		assert!(rewritten.ends_with(&[0xF8; 256]));
	}

	#[test_log::test]
	fn pictures_stay_single_across_rewrites() {
		use crate::picture::{Picture, PictureType};

		let data = flac_file();
		let parsed = super::read(&data).unwrap();
		let Layout::Flac(layout) = &parsed.layout else {
			unreachable!()
		};

		let mut tag = parsed.tag.clone();
		tag.set_picture(Picture::new(
			PictureType::CoverFront,
			None,
			None,
			vec![0xFF, 0xD8, 0xFF, 9],
		));
		let rewritten = super::render(&data, layout, &tag).unwrap();

		let reparsed = super::read(&rewritten).unwrap();
		assert_eq!(reparsed.tag.pictures().len(), 1);

		// A second save of the re-read tag must not grow the count
		let Layout::Flac(layout) = &reparsed.layout else {
			unreachable!()
		};
		let again = super::render(&rewritten, layout, &reparsed.tag).unwrap();
		let final_parse = super::read(&again).unwrap();
		assert_eq!(final_parse.tag.pictures().len(), 1);
	}

	#[test_log::test]
	fn missing_streaminfo_is_an_error() {
		let mut data = b"fLaC".to_vec();
		data.push(0x81); // PADDING, last block
		data.extend_from_slice(&[0, 0, 4]);
		data.extend_from_slice(&[0; 4]);

		assert!(super::read(&data).is_err());
	}
}

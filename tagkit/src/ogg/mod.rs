//! Ogg containers (Vorbis, Opus, Speex)
//!
//! Metadata changes rebuild the header pages and renumber the untouched audio
//! pages behind them, fixing each page checksum along the way.

pub(crate) mod comments;
pub(crate) mod crc;
pub(crate) mod page;
mod properties;

use crate::error::Result;
use crate::layout::{Layout, ParsedFile};
use crate::macros::decode_err;
use crate::tag::Tag;

use std::ops::Range;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum OggCodec {
	Vorbis,
	Opus,
	Speex,
}

pub(crate) struct OggLayout {
	pub codec: OggCodec,
	pub serial: u32,
	pub vendor: String,
	/// The identification page, copied verbatim on write
	pub ident_page: Range<usize>,
	/// The Vorbis setup packet, re-emitted after the rebuilt comment packet
	pub setup_packet: Option<Vec<u8>>,
	pub audio_start: usize,
}

pub(crate) fn read(data: &[u8]) -> Result<ParsedFile> {
	let (ident_header, ident_content) = page::parse(data, 0)?;
	let serial = ident_header.serial;
	let ident = &data[ident_content.clone()];

	let codec = match ident {
		[0x01, b'v', b'o', b'r', b'b', b'i', b's', ..] => OggCodec::Vorbis,
		[b'O', b'p', b'u', b's', b'H', b'e', b'a', b'd', ..] => OggCodec::Opus,
		[b'S', b'p', b'e', b'e', b'x', b' ', b' ', b' ', ..] => OggCodec::Speex,
		_ => decode_err!(@BAIL "Ogg stream has an unrecognized codec"),
	};

	// Vorbis carries a setup packet after the comments, the others do not
	let packet_count = match codec {
		OggCodec::Vorbis => 2,
		OggCodec::Opus | OggCodec::Speex => 1,
	};

	let (mut packets, audio_start) = read_packets(data, ident_content.end, packet_count)?;
	let comment_packet = packets.remove(0);
	let setup_packet = packets.pop();

	let mut tag = Tag::new();
	let comment_body = strip_comment_signature(codec, &comment_packet)?;
	let vendor = comments::parse(comment_body, &mut tag)?;

	let last_granule = last_granule_position(data, audio_start, serial);
	let properties = properties::read_properties(
		codec,
		ident,
		last_granule,
		(data.len() - audio_start) as u64,
	)?;

	Ok(ParsedFile {
		tag,
		properties,
		layout: Layout::Ogg(OggLayout {
			codec,
			serial,
			vendor,
			ident_page: 0..ident_content.end,
			setup_packet,
			audio_start,
		}),
	})
}

/// Read `count` complete packets beginning at the page at `pos`
///
/// Returns the packets and the offset of the first page after them. Header
/// packets always end their page, so that offset is where the audio begins.
fn read_packets(data: &[u8], mut pos: usize, count: usize) -> Result<(Vec<Vec<u8>>, usize)> {
	let mut packets = Vec::with_capacity(count);
	let mut current = Vec::new();

	while packets.len() < count {
		let (header, content) = page::parse(data, pos)?;
		let mut offset = content.start;

		for &lacing in &header.segment_table {
			current.extend_from_slice(&data[offset..offset + usize::from(lacing)]);
			offset += usize::from(lacing);

			if lacing < 255 {
				packets.push(std::mem::take(&mut current));
				if packets.len() == count {
					break;
				}
			}
		}

		pos = content.end;
	}

	Ok((packets, pos))
}

fn strip_comment_signature(codec: OggCodec, packet: &[u8]) -> Result<&[u8]> {
	match codec {
		OggCodec::Vorbis => packet
			.strip_prefix(b"\x03vorbis")
			.ok_or_else(|| decode_err!(Vorbis, "Expected a Vorbis comment header packet")),
		OggCodec::Opus => packet
			.strip_prefix(b"OpusTags")
			.ok_or_else(|| decode_err!(Opus, "Expected an \"OpusTags\" packet")),
		OggCodec::Speex => Ok(packet),
	}
}

// The granule position of the last page with this serial
fn last_granule_position(data: &[u8], mut pos: usize, serial: u32) -> u64 {
	let mut last = 0;
	while let Ok((header, content)) = page::parse(data, pos) {
		if header.serial == serial && header.granule_position != u64::MAX {
			last = header.granule_position;
		}
		pos = content.end;
	}
	last
}

/// Rebuild the file with a fresh comment packet
///
/// The tag cannot be stripped entirely; an empty tag leaves a comment packet
/// holding just the vendor string, as the codecs require.
pub(crate) fn render(data: &[u8], layout: &OggLayout, tag: &Tag) -> Result<Vec<u8>> {
	let body = comments::render(tag, &layout.vendor, true);

	let comment_packet = match layout.codec {
		OggCodec::Vorbis => {
			let mut packet = b"\x03vorbis".to_vec();
			packet.extend_from_slice(&body);
			// Framing bit
			packet.push(1);
			packet
		},
		OggCodec::Opus => {
			let mut packet = b"OpusTags".to_vec();
			packet.extend_from_slice(&body);
			packet
		},
		OggCodec::Speex => body,
	};

	let mut packets: Vec<&[u8]> = vec![&comment_packet];
	if let Some(setup) = &layout.setup_packet {
		packets.push(setup);
	}

	let mut out = Vec::with_capacity(data.len());
	out.extend_from_slice(&data[layout.ident_page.clone()]);

	let (header_pages, mut sequence) = page::paginate_headers(&packets, layout.serial, 1);
	out.extend_from_slice(&header_pages);

	// Copy the audio pages, renumbering them to follow the new headers
	let mut pos = layout.audio_start;
	while pos < data.len() {
		let (_, content) = page::parse(data, pos)?;
		let page_start = out.len();
		out.extend_from_slice(&data[pos..content.end]);
		page::renumber(&mut out[page_start..], sequence);

		sequence += 1;
		pos = content.end;
	}

	Ok(out)
}

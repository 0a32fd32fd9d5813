//! RIFF/WAVE and FORM/AIFF chunks
//!
//! Both containers store an ID3v2 tag in an `ID3 ` chunk. A save replaces or
//! appends that chunk and fixes the outer size field; every other chunk stays
//! put.

mod aiff;
mod wav;

use crate::error::Result;
use crate::layout::{Layout, ParsedFile};
use crate::macros::decode_err;
use crate::tag::Tag;

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum IffKind {
	/// Little endian sizes, `RIFF`/`WAVE`
	Wav,
	/// Big endian sizes, `FORM`/`AIFF`
	Aiff,
}

pub(crate) struct IffLayout {
	pub kind: IffKind,
	/// The existing `ID3 ` chunk, header included
	pub tag_chunk: Option<Range<usize>>,
}

#[derive(Clone, Debug)]
struct ChunkInfo {
	id: [u8; 4],
	content: Range<usize>,
	/// Content plus the trailing pad byte, when the size is odd
	padded_end: usize,
}

fn read_chunk_size(kind: IffKind, bytes: &[u8]) -> u32 {
	match kind {
		IffKind::Wav => LittleEndian::read_u32(bytes),
		IffKind::Aiff => BigEndian::read_u32(bytes),
	}
}

fn write_chunk_size(kind: IffKind, bytes: &mut [u8], size: u32) {
	match kind {
		IffKind::Wav => LittleEndian::write_u32(bytes, size),
		IffKind::Aiff => BigEndian::write_u32(bytes, size),
	}
}

/// Iterate the chunks of the container's content area
fn chunks(
	data: &[u8],
	kind: IffKind,
	content: Range<usize>,
) -> impl Iterator<Item = Result<ChunkInfo>> + '_ {
	let mut pos = content.start;
	let end = content.end;

	std::iter::from_fn(move || {
		// A lone pad byte can trail the final chunk
		if pos + 8 > end {
			return None;
		}

		let id = [data[pos], data[pos + 1], data[pos + 2], data[pos + 3]];
		let size = read_chunk_size(kind, &data[pos + 4..pos + 8]) as usize;

		let content = pos + 8..pos + 8 + size;
		if content.end > end {
			pos = end;
			return Some(Err(decode_err!("Chunk runs past the end of the file")));
		}

		let padded_end = content.end + (size & 1);
		pos = padded_end.min(end);

		Some(Ok(ChunkInfo {
			id,
			content,
			padded_end,
		}))
	})
}

pub(crate) fn read(data: &[u8]) -> Result<ParsedFile> {
	let kind = match data {
		[b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => IffKind::Wav,
		[b'F', b'O', b'R', b'M', _, _, _, _, b'A', b'I', b'F', b'F' | b'C', ..] => IffKind::Aiff,
		_ => decode_err!(@BAIL "Expected a RIFF or FORM container"),
	};

	let outer_size = read_chunk_size(kind, &data[4..8]) as usize;
	let content_end = (8 + outer_size).min(data.len());

	let mut tag = Tag::new();
	let mut tag_chunk = None;

	for chunk in chunks(data, kind, 12..content_end) {
		let chunk = chunk?;
		if &chunk.id == b"ID3 " || &chunk.id == b"id3 " {
			crate::id3::v2::read::parse_id3v2(&data[chunk.content.clone()], &mut tag)?;
			tag_chunk = Some(chunk.content.start - 8..chunk.padded_end.min(data.len()));
		}
	}

	let properties = match kind {
		IffKind::Wav => wav::read_properties(data, content_end)?,
		IffKind::Aiff => aiff::read_properties(data, content_end)?,
	};

	Ok(ParsedFile {
		tag,
		properties,
		layout: Layout::Iff(IffLayout { kind, tag_chunk }),
	})
}

/// Rebuild the file with a fresh `ID3 ` chunk
///
/// An empty tag removes the chunk entirely.
pub(crate) fn render(data: &[u8], layout: &IffLayout, tag: &Tag) -> Result<Vec<u8>> {
	let id3 = crate::id3::v2::write::render(tag, None)?;

	let mut chunk = Vec::new();
	if !id3.is_empty() {
		chunk.extend_from_slice(b"ID3 ");
		chunk.extend_from_slice(&[0; 4]);
		write_chunk_size(layout.kind, &mut chunk[4..8], id3.len() as u32);
		chunk.extend_from_slice(&id3);
		if id3.len() & 1 == 1 {
			chunk.push(0);
		}
	}

	let splice = match &layout.tag_chunk {
		Some(range) => range.clone(),
		None => data.len()..data.len(),
	};

	let mut out = Vec::with_capacity(data.len() + chunk.len());
	out.extend_from_slice(&data[..splice.start]);
	out.extend_from_slice(&chunk);
	out.extend_from_slice(&data[splice.end..]);

	let outer_size = (out.len() - 8) as u32;
	write_chunk_size(layout.kind, &mut out[4..8], outer_size);

	Ok(out)
}

//! MP4 / iTunes-style metadata
//!
//! A save splices a fresh `ilst` atom into the `moov` tree, grows every
//! ancestor atom by the size delta and patches the `stco`/`co64` chunk offset
//! tables when the audio data shifts.

mod ilst;
mod properties;

use crate::error::Result;
use crate::layout::{Layout, ParsedFile};
use crate::macros::decode_err;
use crate::tag::Tag;

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder};

#[derive(Clone, Debug)]
pub(crate) struct AtomInfo {
	pub start: usize,
	pub ident: [u8; 4],
	pub header_len: usize,
	pub len: usize,
}

impl AtomInfo {
	pub(crate) fn content(&self) -> Range<usize> {
		self.start + self.header_len..self.start + self.len
	}

	pub(crate) fn range(&self) -> Range<usize> {
		self.start..self.start + self.len
	}
}

/// Parse the atom starting at `pos`, bounded by `end`
pub(crate) fn parse_atom(data: &[u8], pos: usize, end: usize) -> Result<AtomInfo> {
	if pos + 8 > end {
		decode_err!(@BAIL Mp4, "Atom header runs past its parent");
	}

	let size = BigEndian::read_u32(&data[pos..pos + 4]);
	let ident = [data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]];

	let (header_len, len) = match size {
		// Extends to the end of the enclosing container
		0 => (8, end - pos),
		// 64-bit size follows the ident
		1 => {
			if pos + 16 > end {
				decode_err!(@BAIL Mp4, "Atom header runs past its parent");
			}
			let size = BigEndian::read_u64(&data[pos + 8..pos + 16]);
			(16, size as usize)
		},
		_ => (8, size as usize),
	};

	if len < header_len || pos + len > end {
		decode_err!(@BAIL Mp4, "Atom size is out of bounds");
	}

	Ok(AtomInfo {
		start: pos,
		ident,
		header_len,
		len,
	})
}

/// Iterate the child atoms of a content range
pub(crate) fn children(
	data: &[u8],
	content: Range<usize>,
) -> impl Iterator<Item = Result<AtomInfo>> + '_ {
	let mut pos = content.start;
	let end = content.end;

	std::iter::from_fn(move || {
		if pos + 8 > end {
			return None;
		}

		match parse_atom(data, pos, end) {
			Ok(atom) => {
				pos = atom.start + atom.len;
				Some(Ok(atom))
			},
			Err(e) => {
				pos = end;
				Some(Err(e))
			},
		}
	})
}

/// The first child with the given ident
pub(crate) fn find_child(
	data: &[u8],
	content: Range<usize>,
	ident: &[u8; 4],
) -> Result<Option<AtomInfo>> {
	for atom in children(data, content) {
		let atom = atom?;
		if &atom.ident == ident {
			return Ok(Some(atom));
		}
	}

	Ok(None)
}

// `meta` is a full atom: four bytes of version and flags lead its children
fn meta_content(atom: &AtomInfo) -> Range<usize> {
	let content = atom.content();
	content.start + 4..content.end
}

pub(crate) struct Mp4Layout {
	pub moov: AtomInfo,
	pub udta: Option<AtomInfo>,
	pub meta: Option<AtomInfo>,
	pub ilst: Option<AtomInfo>,
	/// Entry tables of every `stco` (false) and `co64` (true) atom
	pub chunk_offsets: Vec<(bool, Range<usize>)>,
}

pub(crate) fn read(data: &[u8]) -> Result<ParsedFile> {
	let root = 0..data.len();

	let Some(moov) = find_child(data, root.clone(), b"moov")? else {
		decode_err!(@BAIL Mp4, "File has no \"moov\" atom");
	};

	let udta = find_child(data, moov.content(), b"udta")?;
	let meta = match &udta {
		Some(udta) => find_child(data, udta.content(), b"meta")?,
		None => None,
	};
	let ilst = match &meta {
		Some(meta) => find_child(data, meta_content(meta), b"ilst")?,
		None => None,
	};

	let mut tag = Tag::new();
	if let Some(ilst) = &ilst {
		ilst::parse(data, ilst.content(), &mut tag)?;
	}

	let properties = properties::read_properties(data, &moov, root.end)?;
	let chunk_offsets = find_chunk_offsets(data, &moov)?;

	Ok(ParsedFile {
		tag,
		properties,
		layout: Layout::Mp4(Mp4Layout {
			moov,
			udta,
			meta,
			ilst,
			chunk_offsets,
		}),
	})
}

fn find_chunk_offsets(data: &[u8], moov: &AtomInfo) -> Result<Vec<(bool, Range<usize>)>> {
	let mut offsets = Vec::new();

	for trak in children(data, moov.content()) {
		let trak = trak?;
		if &trak.ident != b"trak" {
			continue;
		}

		let Some(mdia) = find_child(data, trak.content(), b"mdia")? else {
			continue;
		};
		let Some(minf) = find_child(data, mdia.content(), b"minf")? else {
			continue;
		};
		let Some(stbl) = find_child(data, minf.content(), b"stbl")? else {
			continue;
		};

		for atom in children(data, stbl.content()) {
			let atom = atom?;
			let co64 = match &atom.ident {
				b"stco" => false,
				b"co64" => true,
				_ => continue,
			};

			let content = atom.content();
			if content.len() < 8 {
				decode_err!(@BAIL Mp4, "Chunk offset atom is too short");
			}

			let count = BigEndian::read_u32(&data[content.start + 4..content.start + 8]) as usize;
			let entry_size = if co64 { 8 } else { 4 };
			let entries = content.start + 8..content.start + 8 + count * entry_size;
			if entries.end > content.end {
				decode_err!(@BAIL Mp4, "Chunk offset table is out of bounds");
			}

			offsets.push((co64, entries));
		}
	}

	Ok(offsets)
}

fn atom(ident: &[u8; 4], content: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(8 + content.len());
	out.extend_from_slice(&((content.len() + 8) as u32).to_be_bytes());
	out.extend_from_slice(ident);
	out.extend_from_slice(content);
	out
}

// moov/udta/meta/hdlr, the handler reference iTunes expects
fn hdlr_atom() -> Vec<u8> {
	let mut content = vec![0u8; 8];
	content.extend_from_slice(b"mdir");
	content.extend_from_slice(b"appl");
	content.extend_from_slice(&[0; 9]);
	atom(b"hdlr", &content)
}

/// Rebuild the file with a fresh `ilst`
///
/// An empty tag writes an empty `ilst`, leaving the surrounding chain in
/// place.
pub(crate) fn render(data: &[u8], layout: &Mp4Layout, tag: &Tag) -> Result<Vec<u8>> {
	let new_ilst = ilst::render(tag)?;

	// Work out what is being replaced and what must be built around it
	let (splice, replacement): (Range<usize>, Vec<u8>) = match (&layout.ilst, &layout.meta, &layout.udta) {
		(Some(ilst), ..) => (ilst.range(), new_ilst),
		(None, Some(meta), _) => {
			let end = meta.range().end;
			(end..end, new_ilst)
		},
		(None, None, Some(udta)) => {
			let mut content = vec![0u8; 4];
			content.extend_from_slice(&hdlr_atom());
			content.extend_from_slice(&new_ilst);
			let end = udta.range().end;
			(end..end, atom(b"meta", &content))
		},
		(None, None, None) => {
			let mut meta_content = vec![0u8; 4];
			meta_content.extend_from_slice(&hdlr_atom());
			meta_content.extend_from_slice(&new_ilst);
			let end = layout.moov.range().end;
			(end..end, atom(b"udta", &atom(b"meta", &meta_content)))
		},
	};

	let delta = replacement.len() as i64 - splice.len() as i64;

	let mut out = Vec::with_capacity((data.len() as i64 + delta) as usize);
	out.extend_from_slice(&data[..splice.start]);
	out.extend_from_slice(&replacement);
	out.extend_from_slice(&data[splice.end..]);

	if delta != 0 {
		// Every ancestor that contains the splice grows by the delta
		let mut ancestors = vec![layout.moov.start];
		if let Some(udta) = &layout.udta {
			ancestors.push(udta.start);
		}
		if let Some(meta) = &layout.meta {
			ancestors.push(meta.start);
		}

		for start in ancestors {
			let start = shifted(start, &splice, delta);
			let size = BigEndian::read_u32(&out[start..start + 4]);
			let size = (i64::from(size) + delta) as u32;
			BigEndian::write_u32(&mut out[start..start + 4], size);
		}

		// Chunk offsets pointing past the splice move with the data
		for (co64, entries) in &layout.chunk_offsets {
			let start = shifted(entries.start, &splice, delta);
			let table = start..start + entries.len();

			patch_chunk_offsets(&mut out[table], *co64, splice.start, delta);
		}
	}

	Ok(out)
}

// Translate a pre-splice offset into the rebuilt file
fn shifted(offset: usize, splice: &Range<usize>, delta: i64) -> usize {
	if offset >= splice.end {
		(offset as i64 + delta) as usize
	} else {
		offset
	}
}

fn patch_chunk_offsets(table: &mut [u8], co64: bool, splice_start: usize, delta: i64) {
	let entry_size = if co64 { 8 } else { 4 };
	for entry in table.chunks_exact_mut(entry_size) {
		if co64 {
			let offset = BigEndian::read_u64(entry);
			if offset as usize >= splice_start {
				BigEndian::write_u64(entry, (offset as i64 + delta) as u64);
			}
		} else {
			let offset = BigEndian::read_u32(entry);
			if offset as usize >= splice_start {
				BigEndian::write_u32(entry, (i64::from(offset) + delta) as u32);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::atom;
	use crate::layout::Layout;
	use crate::tag::Tag;

	use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

	fn mvhd_atom() -> Vec<u8> {
		let mut content = vec![0u8; 12]; // version/flags, creation, modification
		content.write_u32::<BigEndian>(44100).unwrap(); // timescale
		content.write_u32::<BigEndian>(441_000).unwrap(); // duration
		content.extend_from_slice(&[0; 80]);
		atom(b"mvhd", &content)
	}

	fn stsd_atom() -> Vec<u8> {
		// One mp4a entry: 16.16 sample rate, two channels
		let mut mp4a = vec![0u8; 8]; // reserved + data reference index
		mp4a.write_u16::<BigEndian>(0).unwrap(); // version
		mp4a.write_u16::<BigEndian>(0).unwrap(); // revision
		mp4a.write_u32::<BigEndian>(0).unwrap(); // vendor
		mp4a.write_u16::<BigEndian>(2).unwrap(); // channels
		mp4a.write_u16::<BigEndian>(16).unwrap(); // sample size
		mp4a.write_u32::<BigEndian>(0).unwrap(); // compression + packet size
		mp4a.write_u32::<BigEndian>(44100 << 16).unwrap();

		let mut content = vec![0u8; 4];
		content.write_u32::<BigEndian>(1).unwrap(); // entry count
		content.extend_from_slice(&atom(b"mp4a", &mp4a));
		atom(b"stsd", &content)
	}

	fn stco_atom(offsets: &[u32]) -> Vec<u8> {
		let mut content = vec![0u8; 4];
		content
			.write_u32::<BigEndian>(offsets.len() as u32)
			.unwrap();
		for offset in offsets {
			content.write_u32::<BigEndian>(*offset).unwrap();
		}
		atom(b"stco", &content)
	}

	fn m4a_file(mdat_offset_entries: &[u32]) -> Vec<u8> {
		let stbl = atom(
			b"stbl",
			&[stsd_atom(), stco_atom(mdat_offset_entries)].concat(),
		);
		let minf = atom(b"minf", &stbl);
		let mdia = atom(b"mdia", &minf);
		let trak = atom(b"trak", &mdia);
		let moov = atom(b"moov", &[mvhd_atom(), trak].concat());

		let ftyp = atom(b"ftyp", b"M4A \x00\x00\x00\x00");
		let mdat = atom(b"mdat", &[0x11; 64]);

		[ftyp, moov, mdat].concat()
	}

	#[test_log::test]
	fn read_bare_file() {
		let parsed = super::read(&m4a_file(&[0])).unwrap();
		assert!(parsed.tag.is_empty());
		assert_eq!(parsed.properties.sample_rate(), 44100);
		assert_eq!(parsed.properties.channels(), 2);
		assert_eq!(parsed.properties.duration().as_secs(), 10);
	}

	#[test_log::test]
	fn tag_chain_is_created_and_round_trips() {
		let data = m4a_file(&[0]);
		let parsed = super::read(&data).unwrap();
		let Layout::Mp4(layout) = &parsed.layout else {
			unreachable!()
		};

		let mut tag = Tag::new();
		tag.set_title(String::from("M4A Title"));
		tag.set_track(5);
		let rewritten = super::render(&data, layout, &tag).unwrap();

		let reparsed = super::read(&rewritten).unwrap();
		assert_eq!(reparsed.tag.title(), Some("M4A Title"));
		assert_eq!(reparsed.tag.track(), Some(5));
		assert_eq!(reparsed.properties.sample_rate(), 44100);
	}

	#[test_log::test]
	fn chunk_offsets_follow_the_audio() {
		let mut data = m4a_file(&[0]);

		// Point the single stco entry at the start of the mdat content
		let mdat_content = data.len() - 64;
		let parsed = super::read(&data).unwrap();
		let Layout::Mp4(layout) = &parsed.layout else {
			unreachable!()
		};
		let entries = layout.chunk_offsets[0].1.clone();
		BigEndian::write_u32(&mut data[entries], mdat_content as u32);

		// Re-read so the layout sees the patched table, then grow the tree
		let parsed = super::read(&data).unwrap();
		let Layout::Mp4(layout) = &parsed.layout else {
			unreachable!()
		};

		let mut tag = Tag::new();
		tag.set_album(String::from("Album"));
		let rewritten = super::render(&data, layout, &tag).unwrap();
		let delta = rewritten.len() - data.len();

		let reparsed = super::read(&rewritten).unwrap();
		let Layout::Mp4(new_layout) = &reparsed.layout else {
			unreachable!()
		};
		let new_entries = new_layout.chunk_offsets[0].1.clone();
		let patched = BigEndian::read_u32(&rewritten[new_entries]);
		assert_eq!(patched as usize, mdat_content + delta);
	}
}

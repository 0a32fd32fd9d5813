//! Parsed file structure shared across formats
//!
//! Every reader produces a [`ParsedFile`]; the layout half records where the
//! metadata sat in the original bytes so a save can rebuild the file without
//! touching the audio.

use crate::error::Result;
use crate::properties::AudioProperties;
use crate::tag::{Tag, TagType};
use crate::{ape, id3};

use std::ops::Range;

/// Everything a reader extracts from a file
pub(crate) struct ParsedFile {
	pub tag: Tag,
	pub properties: AudioProperties,
	pub layout: Layout,
}

/// Where the metadata lives, per container family
pub(crate) enum Layout {
	/// Tags at the edges of a raw stream (MPEG, AAC, Monkey's Audio, Musepack, TTA)
	Edge(EdgeLayout),
	Flac(crate::flac::FlacLayout),
	Ogg(crate::ogg::OggLayout),
	Mp4(crate::mp4::Mp4Layout),
	Asf(crate::asf::AsfLayout),
	Iff(crate::iff::IffLayout),
}

/// Tag regions hugging an otherwise opaque audio stream
///
/// ID3v2 leads the file; APE and ID3v1 trail it, in that order.
#[derive(Debug, Default, Clone)]
pub(crate) struct EdgeLayout {
	pub id3v2: Option<Range<usize>>,
	pub ape: Option<Range<usize>>,
	pub id3v1: Option<Range<usize>>,
}

impl EdgeLayout {
	/// The region holding the audio stream itself
	pub(crate) fn audio_span(&self, file_len: usize) -> Range<usize> {
		let start = self.id3v2.as_ref().map_or(0, |r| r.end);
		let end = self
			.ape
			.as_ref()
			.map(|r| r.start)
			.or_else(|| self.id3v1.as_ref().map(|r| r.start))
			.unwrap_or(file_len);

		start..end.max(start)
	}
}

/// Locate the tag regions at the edges of `data`
pub(crate) fn scan_edges(data: &[u8]) -> EdgeLayout {
	let id3v2 = id3::v2::header::find_id3v2(data);
	let id3v1 = id3::v1::find(data);

	let ape_end = id3v1.as_ref().map_or(data.len(), |r| r.start);
	let ape = ape::tag::find(data, ape_end);

	EdgeLayout { id3v2, ape, id3v1 }
}

/// Parse every tag region found by [`scan_edges`] into one [`Tag`]
///
/// ID3v2 is parsed first and wins conflicts; APE and ID3v1 only fill in
/// fields the richer containers left empty.
pub(crate) fn read_edge_tags(data: &[u8], edges: &EdgeLayout, tag: &mut Tag) -> Result<()> {
	if let Some(region) = &edges.id3v2 {
		id3::v2::read::parse_id3v2(&data[region.clone()], tag)?;
	}

	if let Some(region) = &edges.ape {
		ape::tag::parse_into(&data[region.clone()], tag)?;
	}

	if let Some(region) = &edges.id3v1 {
		id3::v1::merge_into(&data[region.clone()], tag);
	}

	Ok(())
}

/// Rebuild a whole edge-tagged file around its untouched audio span
///
/// The primary container is always rendered; secondary containers are only
/// refreshed when the original file carried them. An existing ID3v2 region is
/// padded back to its old size so the save engine can overwrite in place. An
/// empty tag strips every region.
pub(crate) fn render_edges(
	data: &[u8],
	edges: &EdgeLayout,
	tag: &Tag,
	primary: TagType,
) -> Result<Vec<u8>> {
	let audio = &data[edges.audio_span(data.len())];

	let mut out = Vec::with_capacity(data.len());

	if primary == TagType::Id3v2 || edges.id3v2.is_some() {
		let min_total_size = edges.id3v2.as_ref().map(|r| r.len());
		out.extend_from_slice(&id3::v2::write::render(tag, min_total_size)?);
	}

	out.extend_from_slice(audio);

	if primary == TagType::Ape || edges.ape.is_some() {
		out.extend_from_slice(&ape::tag::render(tag)?);
	}

	if edges.id3v1.is_some() && !tag.is_empty() {
		out.extend_from_slice(&id3::v1::render(tag));
	}

	Ok(out)
}

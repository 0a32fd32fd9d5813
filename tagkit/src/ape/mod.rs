//! APE tags and Monkey's Audio

pub(crate) mod properties;
pub(crate) mod tag;

use crate::error::Result;
use crate::layout::{self, Layout, ParsedFile};
use crate::tag::Tag;

pub(crate) const PREAMBLE: [u8; 8] = *b"APETAGEX";

pub(crate) fn read(data: &[u8]) -> Result<ParsedFile> {
	let edges = layout::scan_edges(data);

	let mut tag = Tag::new();
	layout::read_edge_tags(data, &edges, &mut tag)?;

	let audio = &data[edges.audio_span(data.len())];
	let properties = properties::read_properties(audio)?;

	Ok(ParsedFile {
		tag,
		properties,
		layout: Layout::Edge(edges),
	})
}

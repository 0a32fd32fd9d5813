//! ASF (WMA) header objects
//!
//! A save rebuilds the Header Object, replacing the Content Description and
//! Extended Content Description objects and patching the file size recorded
//! in the File Properties object. The Data Object is never touched.

mod properties;
mod tag;

use crate::error::Result;
use crate::layout::{Layout, ParsedFile};
use crate::macros::decode_err;
use crate::tag::Tag;

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

pub(crate) const HEADER_GUID: [u8; 16] = crate::probe::ASF_HEADER_GUID;

pub(crate) const FILE_PROPERTIES_GUID: [u8; 16] = [
	0xA1, 0xDC, 0xAB, 0x8C, 0x47, 0xA9, 0xCF, 0x11, 0x8E, 0xE4, 0x00, 0xC0, 0x0C, 0x20, 0x53,
	0x65,
];

pub(crate) const STREAM_PROPERTIES_GUID: [u8; 16] = [
	0x91, 0x07, 0xDC, 0xB7, 0xB7, 0xA9, 0xCF, 0x11, 0x8E, 0xE6, 0x00, 0xC0, 0x0C, 0x20, 0x53,
	0x65,
];

pub(crate) const CONTENT_DESCRIPTION_GUID: [u8; 16] = [
	0x33, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE,
	0x6C,
];

pub(crate) const EXTENDED_CONTENT_DESCRIPTION_GUID: [u8; 16] = [
	0x40, 0xA4, 0xD0, 0xD2, 0x07, 0xE3, 0xD2, 0x11, 0x97, 0xF0, 0x00, 0xA0, 0xC9, 0x5E, 0xA8,
	0x50,
];

pub(crate) const AUDIO_MEDIA_GUID: [u8; 16] = [
	0x40, 0x9E, 0x69, 0xF8, 0x4D, 0x5B, 0xCF, 0x11, 0xA8, 0xFD, 0x00, 0x80, 0x5F, 0x5C, 0x44,
	0x2B,
];

struct ObjectInfo {
	guid: [u8; 16],
	range: Range<usize>,
}

impl ObjectInfo {
	fn content(&self) -> Range<usize> {
		self.range.start + 24..self.range.end
	}
}

fn parse_object(data: &[u8], pos: usize, end: usize) -> Result<ObjectInfo> {
	if pos + 24 > end {
		decode_err!(@BAIL Asf, "Object header runs past its parent");
	}

	let mut guid = [0u8; 16];
	guid.copy_from_slice(&data[pos..pos + 16]);
	let size = LittleEndian::read_u64(&data[pos + 16..pos + 24]) as usize;

	if size < 24 || pos + size > end {
		decode_err!(@BAIL Asf, "Object size is out of bounds");
	}

	Ok(ObjectInfo {
		guid,
		range: pos..pos + size,
	})
}

pub(crate) struct AsfLayout {
	/// Header Object children carried over verbatim on a rewrite
	kept_objects: Vec<Range<usize>>,
	/// Offset of the u64 file size inside the File Properties object
	file_size_field: Option<usize>,
	/// Where the Data Object (and everything after it) begins
	header_end: usize,
}

pub(crate) fn read(data: &[u8]) -> Result<ParsedFile> {
	let header = parse_object(data, 0, data.len())?;
	if header.guid != HEADER_GUID {
		decode_err!(@BAIL Asf, "Expected an ASF Header Object");
	}

	// The header content leads with a child count and two reserved bytes
	let content = header.content();
	if content.len() < 6 {
		decode_err!(@BAIL Asf, "ASF Header Object is too short");
	}
	let object_count = LittleEndian::read_u32(&data[content.start..content.start + 4]);

	let mut tag = Tag::new();
	let mut kept_objects = Vec::new();
	let mut file_size_field = None;
	let mut file_properties: Option<Range<usize>> = None;
	let mut stream_properties: Option<Range<usize>> = None;

	let mut pos = content.start + 6;
	for _ in 0..object_count {
		let object = parse_object(data, pos, content.end)?;
		pos = object.range.end;

		match object.guid {
			CONTENT_DESCRIPTION_GUID => {
				tag::parse_content_description(&data[object.content()], &mut tag)?;
			},
			EXTENDED_CONTENT_DESCRIPTION_GUID => {
				tag::parse_extended_content_description(&data[object.content()], &mut tag)?;
			},
			FILE_PROPERTIES_GUID => {
				file_size_field = Some(object.content().start + 16);
				file_properties = Some(object.content());
				kept_objects.push(object.range);
			},
			STREAM_PROPERTIES_GUID => {
				stream_properties = Some(object.content());
				kept_objects.push(object.range);
			},
			_ => kept_objects.push(object.range),
		}
	}

	let Some(file_properties) = file_properties else {
		decode_err!(@BAIL Asf, "File has no File Properties object");
	};

	let properties = properties::read_properties(
		data,
		file_properties,
		stream_properties,
	)?;

	Ok(ParsedFile {
		tag,
		properties,
		layout: Layout::Asf(AsfLayout {
			kept_objects,
			file_size_field,
			header_end: header.range.end,
		}),
	})
}

/// Rebuild the Header Object with fresh description objects
pub(crate) fn render(data: &[u8], layout: &AsfLayout, tag: &Tag) -> Result<Vec<u8>> {
	let mut objects: Vec<(Option<usize>, Vec<u8>)> = Vec::new();

	for range in &layout.kept_objects {
		// Remember where the file size field lands in the copied object
		let size_field = layout
			.file_size_field
			.filter(|f| range.contains(f))
			.map(|f| f - range.start);
		objects.push((size_field, data[range.clone()].to_vec()));
	}

	let content_description = tag::render_content_description(tag);
	if !content_description.is_empty() {
		objects.push((
			None,
			object(&CONTENT_DESCRIPTION_GUID, &content_description),
		));
	}

	let extended = tag::render_extended_content_description(tag)?;
	if !extended.is_empty() {
		objects.push((None, object(&EXTENDED_CONTENT_DESCRIPTION_GUID, &extended)));
	}

	let children_len: usize = objects.iter().map(|(_, o)| o.len()).sum();
	let header_size = 24 + 6 + children_len;
	let tail = &data[layout.header_end..];
	let file_size = (header_size + tail.len()) as u64;

	let mut out = Vec::with_capacity(header_size + tail.len());
	out.extend_from_slice(&HEADER_GUID);
	out.write_u64::<LittleEndian>(header_size as u64).unwrap();
	out.write_u32::<LittleEndian>(objects.len() as u32).unwrap();
	out.push(0x01);
	out.push(0x02);

	for (size_field, mut object) in objects {
		if let Some(offset) = size_field {
			LittleEndian::write_u64(&mut object[offset..offset + 8], file_size);
		}
		out.extend_from_slice(&object);
	}

	out.extend_from_slice(tail);
	Ok(out)
}

fn object(guid: &[u8; 16], content: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(24 + content.len());
	out.extend_from_slice(guid);
	out.write_u64::<LittleEndian>((24 + content.len()) as u64)
		.unwrap();
	out.extend_from_slice(content);
	out
}

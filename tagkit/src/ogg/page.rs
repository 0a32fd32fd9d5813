//! Ogg page parsing and rendering

use crate::error::Result;
use crate::macros::decode_err;
use crate::ogg::crc;

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

/// The most content a single page can carry (255 segments of 255 bytes)
pub(crate) const MAX_CONTENT_SIZE: usize = 65025;

pub(crate) const CONTINUED_PACKET: u8 = 0x01;
pub(crate) const FIRST_PAGE: u8 = 0x02;
pub(crate) const LAST_PAGE: u8 = 0x04;

#[derive(Clone, Debug)]
pub(crate) struct PageHeader {
	pub header_type: u8,
	pub granule_position: u64,
	pub serial: u32,
	pub sequence_number: u32,
	pub segment_table: Vec<u8>,
}

impl PageHeader {
	pub(crate) fn content_len(&self) -> usize {
		self.segment_table.iter().map(|&s| usize::from(s)).sum()
	}
}

/// Parse the page starting at `pos`, returning its header and the range of
/// its content within `data`
pub(crate) fn parse(data: &[u8], pos: usize) -> Result<(PageHeader, Range<usize>)> {
	let page = &data[pos.min(data.len())..];
	if page.len() < 27 || &page[..4] != b"OggS" {
		decode_err!(@BAIL "Expected an \"OggS\" page header");
	}

	if page[4] != 0 {
		decode_err!(@BAIL "Found an Ogg page with an unknown version");
	}

	let header_type = page[5];
	let granule_position = LittleEndian::read_u64(&page[6..14]);
	let serial = LittleEndian::read_u32(&page[14..18]);
	let sequence_number = LittleEndian::read_u32(&page[18..22]);
	let segment_count = usize::from(page[26]);

	if page.len() < 27 + segment_count {
		decode_err!(@BAIL "Ogg page segment table is truncated");
	}

	let segment_table = page[27..27 + segment_count].to_vec();
	let header = PageHeader {
		header_type,
		granule_position,
		serial,
		sequence_number,
		segment_table,
	};

	let content_start = pos + 27 + segment_count;
	let content_end = content_start + header.content_len();
	if content_end > data.len() {
		decode_err!(@BAIL "Ogg page content runs past the end of the file");
	}

	Ok((header, content_start..content_end))
}

/// Render one page with a correct checksum
///
/// `content` must fit in a single page.
pub(crate) fn render(
	header_type: u8,
	granule_position: u64,
	serial: u32,
	sequence_number: u32,
	content: &[u8],
	end_of_packet: bool,
) -> Vec<u8> {
	debug_assert!(content.len() <= MAX_CONTENT_SIZE);

	let mut segment_table = vec![0xFF; content.len() / 255];
	// A terminating short segment, absent when the packet spills over
	if end_of_packet || content.len() % 255 != 0 {
		segment_table.push((content.len() % 255) as u8);
	}

	let mut page = Vec::with_capacity(27 + segment_table.len() + content.len());
	page.extend_from_slice(b"OggS");
	page.push(0);
	page.push(header_type);
	page.write_u64::<LittleEndian>(granule_position).unwrap();
	page.write_u32::<LittleEndian>(serial).unwrap();
	page.write_u32::<LittleEndian>(sequence_number).unwrap();
	page.write_u32::<LittleEndian>(0).unwrap(); // checksum, fixed up below
	page.push(segment_table.len() as u8);
	page.extend_from_slice(&segment_table);
	page.extend_from_slice(content);

	let checksum = crc::crc32(&page);
	LittleEndian::write_u32(&mut page[22..26], checksum);

	page
}

/// Split `packets` across as many pages as they need
///
/// The pages are numbered starting at `first_sequence` with a granule
/// position of zero, the layout Ogg prescribes for header packets. Returns
/// the rendered pages and the sequence number the next page should carry.
pub(crate) fn paginate_headers(
	packets: &[&[u8]],
	serial: u32,
	first_sequence: u32,
) -> (Vec<u8>, u32) {
	let mut out = Vec::new();
	let mut sequence = first_sequence;

	for packet in packets {
		let mut chunks = packet.chunks(MAX_CONTENT_SIZE).peekable();
		let mut continued = false;

		// An empty packet still needs a zero lacing value
		if packet.is_empty() {
			out.extend_from_slice(&render(0, 0, serial, sequence, &[], true));
			sequence += 1;
			continue;
		}

		while let Some(chunk) = chunks.next() {
			let header_type = if continued { CONTINUED_PACKET } else { 0 };
			let last_chunk = chunks.peek().is_none();

			out.extend_from_slice(&render(
				header_type,
				0,
				serial,
				sequence,
				chunk,
				last_chunk,
			));

			sequence += 1;
			continued = true;
		}
	}

	(out, sequence)
}

/// Overwrite a page's sequence number in place and fix its checksum
pub(crate) fn renumber(page: &mut [u8], sequence_number: u32) {
	LittleEndian::write_u32(&mut page[18..22], sequence_number);
	LittleEndian::write_u32(&mut page[22..26], 0);
	let checksum = crc::crc32(page);
	LittleEndian::write_u32(&mut page[22..26], checksum);
}

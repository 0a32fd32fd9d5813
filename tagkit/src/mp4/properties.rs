//! MP4 stream properties, from `mvhd` and the sample description

use crate::error::Result;
use crate::macros::decode_err;
use crate::mp4::{AtomInfo, children, find_child};
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

pub(super) fn read_properties(
	data: &[u8],
	moov: &AtomInfo,
	file_len: usize,
) -> Result<AudioProperties> {
	let Some(mvhd) = find_child(data, moov.content(), b"mvhd")? else {
		decode_err!(@BAIL Mp4, "File has no \"mvhd\" atom");
	};

	let duration_ms = read_mvhd(&data[mvhd.content()])?;

	let (sample_rate, channels) = read_sample_entry(data, moov)?;

	// Rough but serviceable: the average rate over the media data
	let mdat_len = find_child(data, 0..file_len, b"mdat")?.map_or(0, |a| a.len as u64);
	let bitrate = if duration_ms > 0 {
		((mdat_len * 8).div_round(duration_ms)) as u32
	} else {
		0
	};

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate,
		sample_rate,
		channels,
	})
}

fn read_mvhd(content: &[u8]) -> Result<u64> {
	if content.is_empty() {
		decode_err!(@BAIL Mp4, "\"mvhd\" atom is empty");
	}

	let (timescale, duration) = match content[0] {
		0 if content.len() >= 20 => (
			u64::from(BigEndian::read_u32(&content[12..16])),
			u64::from(BigEndian::read_u32(&content[16..20])),
		),
		1 if content.len() >= 32 => (
			u64::from(BigEndian::read_u32(&content[20..24])),
			BigEndian::read_u64(&content[24..32]),
		),
		_ => decode_err!(@BAIL Mp4, "\"mvhd\" atom is malformed"),
	};

	if timescale == 0 {
		decode_err!(@BAIL Mp4, "\"mvhd\" atom has a timescale of zero");
	}

	Ok((duration * 1000).div_round(timescale))
}

// Walk to the first audio sample entry and pull the rate and channel count
fn read_sample_entry(data: &[u8], moov: &AtomInfo) -> Result<(u32, u8)> {
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
		let Some(stsd) = find_child(data, stbl.content(), b"stsd")? else {
			continue;
		};

		let content = stsd.content();
		if content.len() < 8 {
			continue;
		}

		// Version, flags and entry count lead the first sample entry
		let entry = super::parse_atom(data, content.start + 8, content.end)?;
		let body = &data[entry.content()];

		// Reserved fields, data reference index, version, revision and
		// vendor come before the channel count
		if body.len() < 28 {
			continue;
		}

		let channels = BigEndian::read_u16(&body[16..18]) as u8;
		// A 16.16 fixed point rate
		let sample_rate = BigEndian::read_u32(&body[24..28]) >> 16;

		return Ok((sample_rate, channels));
	}

	decode_err!(@BAIL Mp4, "File has no audio sample description")
}

//! ASF stream properties

use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::ops::Range;
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};

pub(super) fn read_properties(
	data: &[u8],
	file_properties: Range<usize>,
	stream_properties: Option<Range<usize>>,
) -> Result<AudioProperties> {
	let content = &data[file_properties];
	if content.len() < 80 {
		decode_err!(@BAIL Asf, "File Properties object is too short");
	}

	// The play duration includes the preroll, both must be read
	let play_duration = LittleEndian::read_u64(&content[40..48]);
	let preroll_ms = LittleEndian::read_u64(&content[56..64]);
	let max_bitrate = LittleEndian::read_u32(&content[76..80]);

	let duration_ms = (play_duration / 10_000).saturating_sub(preroll_ms);
	let bitrate = max_bitrate.div_round(1000);

	let (sample_rate, channels) = match stream_properties {
		Some(range) => read_stream_properties(&data[range])?,
		None => (0, 0),
	};

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate,
		sample_rate,
		channels,
	})
}

fn read_stream_properties(content: &[u8]) -> Result<(u32, u8)> {
	if content.len() < 54 {
		decode_err!(@BAIL Asf, "Stream Properties object is too short");
	}

	if content[..16] != super::AUDIO_MEDIA_GUID {
		// A video or command stream, nothing to report
		return Ok((0, 0));
	}

	let type_specific_len = LittleEndian::read_u32(&content[40..44]) as usize;
	let type_specific = &content[54..];
	if type_specific.len() < type_specific_len || type_specific_len < 8 {
		decode_err!(@BAIL Asf, "Stream Properties type-specific data is truncated");
	}

	// WAVEFORMATEX
	let channels = LittleEndian::read_u16(&type_specific[2..4]) as u8;
	let sample_rate = LittleEndian::read_u32(&type_specific[4..8]);

	Ok((sample_rate, channels))
}

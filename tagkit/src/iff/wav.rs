//! WAVE format chunk properties

use crate::error::Result;
use crate::iff::{IffKind, chunks};
use crate::macros::decode_err;
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};

pub(super) fn read_properties(data: &[u8], content_end: usize) -> Result<AudioProperties> {
	let mut fmt = None;
	let mut data_len = 0u64;

	for chunk in chunks(data, IffKind::Wav, 12..content_end) {
		let chunk = chunk?;
		match &chunk.id {
			b"fmt " => fmt = Some(chunk.content.clone()),
			b"data" => data_len = chunk.content.len() as u64,
			_ => {},
		}
	}

	let Some(fmt) = fmt else {
		decode_err!(@BAIL Wav, "File has no \"fmt \" chunk");
	};

	let fmt = &data[fmt];
	if fmt.len() < 16 {
		decode_err!(@BAIL Wav, "\"fmt \" chunk is too short");
	}

	let channels = LittleEndian::read_u16(&fmt[2..4]) as u8;
	let sample_rate = LittleEndian::read_u32(&fmt[4..8]);
	let avg_bytes_per_sec = u64::from(LittleEndian::read_u32(&fmt[8..12]));

	if avg_bytes_per_sec == 0 {
		decode_err!(@BAIL Wav, "\"fmt \" chunk has a byte rate of zero");
	}

	let duration_ms = (data_len * 1000).div_round(avg_bytes_per_sec);
	let bitrate = ((avg_bytes_per_sec * 8).div_round(1000)) as u32;

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate,
		sample_rate,
		channels,
	})
}

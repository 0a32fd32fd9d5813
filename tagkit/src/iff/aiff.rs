//! AIFF COMM chunk properties

use crate::error::Result;
use crate::iff::{IffKind, chunks};
use crate::macros::decode_err;
use crate::properties::AudioProperties;
use crate::util::math::{F80, RoundedDivision};

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

pub(super) fn read_properties(data: &[u8], content_end: usize) -> Result<AudioProperties> {
	let mut comm = None;

	for chunk in chunks(data, IffKind::Aiff, 12..content_end) {
		let chunk = chunk?;
		if &chunk.id == b"COMM" {
			comm = Some(chunk.content.clone());
			break;
		}
	}

	let Some(comm) = comm else {
		decode_err!(@BAIL Aiff, "File has no \"COMM\" chunk");
	};

	let comm = &data[comm];
	if comm.len() < 18 {
		decode_err!(@BAIL Aiff, "\"COMM\" chunk is too short");
	}

	let channels = BigEndian::read_u16(&comm[..2]) as u8;
	let sample_frames = u64::from(BigEndian::read_u32(&comm[2..6]));
	let bits_per_sample = u32::from(BigEndian::read_u16(&comm[6..8]));

	// The sample rate is an 80-bit extended float
	let sample_rate = F80::from_be_bytes(comm[8..18].try_into().unwrap()).as_f64();
	if !(sample_rate.is_finite() && sample_rate >= 1.0) {
		decode_err!(@BAIL Aiff, "\"COMM\" chunk has an invalid sample rate");
	}
	let sample_rate = sample_rate as u32;

	let duration_ms = (sample_frames * 1000).div_round(u64::from(sample_rate));
	let bitrate =
		(u64::from(sample_rate) * u64::from(channels) * u64::from(bits_per_sample)).div_round(1000);

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate: bitrate as u32,
		sample_rate,
		channels,
	})
}

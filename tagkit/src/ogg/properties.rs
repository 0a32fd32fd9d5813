//! Per-codec stream properties, read from the identification packet

use crate::error::Result;
use crate::macros::decode_err;
use crate::ogg::OggCodec;
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};

// Opus granule positions always count 48 kHz samples
const OPUS_GRANULE_RATE: u64 = 48000;

pub(crate) fn read_properties(
	codec: OggCodec,
	ident: &[u8],
	last_granule: u64,
	stream_len: u64,
) -> Result<AudioProperties> {
	match codec {
		OggCodec::Vorbis => read_vorbis(ident, last_granule, stream_len),
		OggCodec::Opus => read_opus(ident, last_granule, stream_len),
		OggCodec::Speex => read_speex(ident, last_granule, stream_len),
	}
}

fn read_vorbis(ident: &[u8], last_granule: u64, stream_len: u64) -> Result<AudioProperties> {
	if ident.len() < 28 {
		decode_err!(@BAIL Vorbis, "Vorbis identification header is too short");
	}

	let channels = ident[11];
	let sample_rate = LittleEndian::read_u32(&ident[12..16]);
	let nominal_bitrate = LittleEndian::read_i32(&ident[20..24]);

	if sample_rate == 0 {
		decode_err!(@BAIL Vorbis, "Vorbis identification header has a sample rate of zero");
	}

	let duration_ms = (last_granule * 1000).div_round(u64::from(sample_rate));
	let bitrate = if nominal_bitrate > 0 {
		(nominal_bitrate as u32).div_round(1000)
	} else {
		bitrate_from_size(stream_len, duration_ms)
	};

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate,
		sample_rate,
		channels,
	})
}

fn read_opus(ident: &[u8], last_granule: u64, stream_len: u64) -> Result<AudioProperties> {
	if ident.len() < 19 {
		decode_err!(@BAIL Opus, "Opus identification header is too short");
	}

	let channels = ident[9];
	let pre_skip = u64::from(LittleEndian::read_u16(&ident[10..12]));
	let input_sample_rate = LittleEndian::read_u32(&ident[12..16]);

	let samples = last_granule.saturating_sub(pre_skip);
	let duration_ms = (samples * 1000).div_round(OPUS_GRANULE_RATE);

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate: bitrate_from_size(stream_len, duration_ms),
		sample_rate: input_sample_rate,
		channels,
	})
}

fn read_speex(ident: &[u8], last_granule: u64, stream_len: u64) -> Result<AudioProperties> {
	if ident.len() < 56 {
		decode_err!(@BAIL Speex, "Speex identification header is too short");
	}

	let sample_rate = LittleEndian::read_u32(&ident[36..40]);
	let channels = LittleEndian::read_u32(&ident[48..52]) as u8;
	let header_bitrate = LittleEndian::read_i32(&ident[52..56]);

	if sample_rate == 0 {
		decode_err!(@BAIL Speex, "Speex identification header has a sample rate of zero");
	}

	let duration_ms = (last_granule * 1000).div_round(u64::from(sample_rate));
	let bitrate = if header_bitrate > 0 {
		(header_bitrate as u32).div_round(1000)
	} else {
		bitrate_from_size(stream_len, duration_ms)
	};

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate,
		sample_rate,
		channels,
	})
}

fn bitrate_from_size(stream_len: u64, duration_ms: u64) -> u32 {
	if duration_ms == 0 {
		return 0;
	}

	((stream_len * 8).div_round(duration_ms)) as u32
}

#[cfg(test)]
mod tests {
	use super::OggCodec;

	use byteorder::{LittleEndian, WriteBytesExt};

	#[test_log::test]
	fn opus_pre_skip_is_subtracted() {
		let mut ident = b"OpusHead".to_vec();
		ident.push(1); // version
		ident.push(2); // channels
		ident.write_u16::<LittleEndian>(312).unwrap(); // pre-skip
		ident.write_u32::<LittleEndian>(44100).unwrap();
		ident.write_i16::<LittleEndian>(0).unwrap();
		ident.push(0);

		let properties =
			super::read_properties(OggCodec::Opus, &ident, 48000 + 312, 10_000).unwrap();
		assert_eq!(properties.duration().as_secs(), 1);
		assert_eq!(properties.sample_rate(), 44100);
		assert_eq!(properties.channels(), 2);
	}

	#[test_log::test]
	fn truncated_ident_is_rejected() {
		assert!(super::read_properties(OggCodec::Vorbis, b"\x01vorbis", 0, 0).is_err());
	}
}

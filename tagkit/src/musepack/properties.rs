//! Musepack stream properties

use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};

const SAMPLE_RATES: [u32; 4] = [44100, 48000, 37800, 32000];
const SAMPLES_PER_FRAME: u64 = 1152;

/// Read the properties of a Musepack stream
///
/// `data` is the audio region of the file, tags excluded.
pub(crate) fn read_properties(data: &[u8]) -> Result<AudioProperties> {
	match data {
		[b'M', b'P', b'C', b'K', ..] => read_sv8(data),
		[b'M', b'P', b'+', version, ..] if version & 0x0F == 7 => read_sv7(data),
		_ => decode_err!(@BAIL Mpc, "Expected a Musepack stream header"),
	}
}

fn read_sv7(data: &[u8]) -> Result<AudioProperties> {
	if data.len() < 12 {
		decode_err!(@BAIL Mpc, "SV7 header is too short");
	}

	let frame_count = LittleEndian::read_u32(&data[4..8]);
	let flags = LittleEndian::read_u32(&data[8..12]);
	let sample_rate = SAMPLE_RATES[((flags >> 16) & 0x3) as usize];

	let samples = u64::from(frame_count) * SAMPLES_PER_FRAME;
	let duration_ms = (samples * 1000).div_round(u64::from(sample_rate));
	let bitrate = if duration_ms > 0 {
		((data.len() as u64 * 8).div_round(duration_ms)) as u32
	} else {
		0
	};

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate,
		sample_rate,
		// SV7 is always two channels
		channels: 2,
	})
}

fn read_sv8(data: &[u8]) -> Result<AudioProperties> {
	let mut pos = 4;

	// Packets are a two character key followed by a size that counts the
	// key and the size field itself
	while pos + 3 <= data.len() {
		let key = &data[pos..pos + 2];
		let (size, size_len) = read_varint(&data[pos + 2..])?;

		let payload_start = pos + 2 + size_len;
		let payload_end = pos + size as usize;
		if payload_end > data.len() || payload_end < payload_start {
			decode_err!(@BAIL Mpc, "SV8 packet size is out of bounds");
		}

		if key == b"SH" {
			return read_stream_header(&data[payload_start..payload_end], data.len());
		}

		// Audio packets follow the stream header, no point scanning further
		if key == b"AP" || key == b"SE" {
			break;
		}

		pos = payload_end;
	}

	decode_err!(@BAIL Mpc, "SV8 stream has no stream header packet")
}

fn read_stream_header(payload: &[u8], stream_len: usize) -> Result<AudioProperties> {
	if payload.len() < 5 {
		decode_err!(@BAIL Mpc, "SV8 stream header is too short");
	}

	// CRC and stream version
	let mut pos = 5;

	let (samples, len) = read_varint(&payload[pos..])?;
	pos += len;
	let (_beginning_silence, len) = read_varint(&payload[pos..])?;
	pos += len;

	if payload.len() < pos + 2 {
		decode_err!(@BAIL Mpc, "SV8 stream header is too short");
	}

	let sample_rate = SAMPLE_RATES[((payload[pos] >> 5) & 0x7) as usize & 0x3];
	let channels = ((payload[pos + 1] >> 4) & 0xF) + 1;

	let duration_ms = (samples * 1000).div_round(u64::from(sample_rate));
	let bitrate = if duration_ms > 0 {
		((stream_len as u64 * 8).div_round(duration_ms)) as u32
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

// Seven bits per byte, high bit set on all but the last
fn read_varint(data: &[u8]) -> Result<(u64, usize)> {
	let mut value = 0u64;
	for (i, byte) in data.iter().take(9).enumerate() {
		value = (value << 7) | u64::from(byte & 0x7F);
		if byte & 0x80 == 0 {
			return Ok((value, i + 1));
		}
	}

	decode_err!(@BAIL Mpc, "SV8 size field does not terminate")
}

#[cfg(test)]
mod tests {
	use byteorder::{ByteOrder, LittleEndian};

	#[test_log::test]
	fn sv7_properties() {
		let mut data = vec![0u8; 32];
		data[..3].copy_from_slice(b"MP+");
		data[3] = 7;
		// 1000 frames at 48 kHz
		LittleEndian::write_u32(&mut data[4..8], 1000);
		LittleEndian::write_u32(&mut data[8..12], 1 << 16);

		let properties = super::read_properties(&data).unwrap();
		assert_eq!(properties.sample_rate(), 48000);
		assert_eq!(properties.channels(), 2);
		assert_eq!(properties.duration().as_millis(), 24000);
	}

	#[test_log::test]
	fn sv8_properties() {
		let mut data = b"MPCK".to_vec();

		// SH packet: crc, version, sample count, silence, rate and channel bytes
		let mut payload = vec![0, 0, 0, 0, 8];
		// 441000 samples, ten seconds at 44.1 kHz
		payload.push(0x9A);
		payload.push(0xF5);
		payload.push(0x28);
		payload.push(0); // beginning silence
		payload.push(0 << 5); // 44.1 kHz
		payload.push(1 << 4); // two channels

		data.extend_from_slice(b"SH");
		data.push((2 + 1 + payload.len()) as u8);
		data.extend_from_slice(&payload);

		let properties = super::read_properties(&data).unwrap();
		assert_eq!(properties.sample_rate(), 44100);
		assert_eq!(properties.channels(), 2);
		assert_eq!(properties.duration().as_secs(), 10);
	}

	#[test_log::test]
	fn garbage_is_rejected() {
		assert!(super::read_properties(b"nonsense").is_err());
	}
}

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Write `data` to `name` inside a fresh temporary directory
///
/// The directory handle keeps the file alive for the duration of the test.
pub(crate) fn temp_file(name: &str, data: &[u8]) -> (TempDir, PathBuf) {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join(name);
	fs::write(&path, data).unwrap();
	(dir, path)
}

/// A CBR MPEG-1 layer III stream: 128 kbps, 44.1 kHz, stereo
pub(crate) fn mp3(frames: usize) -> Vec<u8> {
	let mut data = Vec::with_capacity(frames * 417);
	for _ in 0..frames {
		data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
		data.resize(data.len() + 413, 0);
	}
	data
}

/// A bare FLAC stream: 44.1 kHz, 2 channels, 441000 samples
pub(crate) fn flac() -> Vec<u8> {
	// STREAMINFO content
	let streaminfo: [u8; 34] = [
		0x10, 0x00, 0x10, 0x00, 0, 0, 0, 0, 0, 0, 0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x06, 0xBA, 0xA8,
		0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
	];

	let mut data = b"fLaC".to_vec();
	data.push(0x80); // STREAMINFO, last block
	data.extend_from_slice(&[0, 0, 34]);
	data.extend_from_slice(&streaminfo);
	data.extend_from_slice(&[0xF8; 256]);
	data
}

/// A one second PCM WAV: 44.1 kHz, stereo, 16-bit
pub(crate) fn wav() -> Vec<u8> {
	let mut fmt = Vec::new();
	fmt.extend_from_slice(&1u16.to_le_bytes()); // PCM
	fmt.extend_from_slice(&2u16.to_le_bytes());
	fmt.extend_from_slice(&44100u32.to_le_bytes());
	fmt.extend_from_slice(&176_400u32.to_le_bytes()); // avg bytes/sec
	fmt.extend_from_slice(&4u16.to_le_bytes());
	fmt.extend_from_slice(&16u16.to_le_bytes());

	let pcm = vec![0u8; 176_400];

	let mut data = b"RIFF\0\0\0\0WAVE".to_vec();
	data.extend_from_slice(b"fmt ");
	data.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
	data.extend_from_slice(&fmt);
	data.extend_from_slice(b"data");
	data.extend_from_slice(&(pcm.len() as u32).to_le_bytes());
	data.extend_from_slice(&pcm);

	let size = (data.len() - 8) as u32;
	data[4..8].copy_from_slice(&size.to_le_bytes());
	data
}

fn atom(ident: &[u8; 4], content: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(8 + content.len());
	out.extend_from_slice(&((content.len() + 8) as u32).to_be_bytes());
	out.extend_from_slice(ident);
	out.extend_from_slice(content);
	out
}

/// A bare M4A: 44.1 kHz, stereo, ten seconds, no `udta`
pub(crate) fn m4a() -> Vec<u8> {
	let mut mvhd = vec![0u8; 12]; // version/flags, creation, modification
	mvhd.extend_from_slice(&44100u32.to_be_bytes()); // timescale
	mvhd.extend_from_slice(&441_000u32.to_be_bytes()); // duration
	mvhd.resize(mvhd.len() + 80, 0);

	let mut mp4a = vec![0u8; 8]; // reserved + data reference index
	mp4a.extend_from_slice(&[0; 8]); // version, revision, vendor
	mp4a.extend_from_slice(&2u16.to_be_bytes()); // channels
	mp4a.extend_from_slice(&16u16.to_be_bytes()); // sample size
	mp4a.extend_from_slice(&[0; 4]); // compression + packet size
	mp4a.extend_from_slice(&(44100u32 << 16).to_be_bytes());

	let mut stsd = vec![0u8; 4];
	stsd.extend_from_slice(&1u32.to_be_bytes());
	stsd.extend_from_slice(&atom(b"mp4a", &mp4a));

	let mut stco = vec![0u8; 4];
	stco.extend_from_slice(&1u32.to_be_bytes());
	stco.extend_from_slice(&0u32.to_be_bytes());

	let stbl = atom(b"stbl", &[atom(b"stsd", &stsd), atom(b"stco", &stco)].concat());
	let minf = atom(b"minf", &stbl);
	let mdia = atom(b"mdia", &minf);
	let trak = atom(b"trak", &mdia);
	let moov = atom(b"moov", &[atom(b"mvhd", &mvhd), trak].concat());

	let ftyp = atom(b"ftyp", b"M4A \x00\x00\x00\x00");
	let mdat = atom(b"mdat", &[0x11; 64]);

	[ftyp, moov, mdat].concat()
}

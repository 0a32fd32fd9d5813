use crate::util;

use tagkit::{Tag, TaggedFile};

use std::fs;

#[test_log::test]
fn round_trip() {
	let original = util::wav();
	let (_dir, path) = util::temp_file("audio.wav", &original);

	let mut file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.bitrate(), 1411);
	assert_eq!(file.length().as_secs(), 1);

	file.set_title(String::from("Wave Title"));
	file.set_track(3);
	file.save().unwrap();

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.title(), "Wave Title");
	assert_eq!(file.track(), 3);
	assert_eq!(file.sample_rate(), 44100);
}

#[test_log::test]
fn stripping_the_tag_restores_the_original_bytes() {
	let original = util::wav();
	let (_dir, path) = util::temp_file("audio.wav", &original);

	let mut file = TaggedFile::read(&path).unwrap();
	file.set_artist(String::from("Someone"));
	file.save().unwrap();
	assert_ne!(fs::read(&path).unwrap(), original);

	let mut file = TaggedFile::read(&path).unwrap();
	file.set_tag_contents(Tag::new());
	file.save().unwrap();
	assert_eq!(fs::read(&path).unwrap(), original);
}

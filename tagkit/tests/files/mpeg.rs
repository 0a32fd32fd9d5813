use crate::util;

use tagkit::{FileFormat, TaggedFile};

use std::fs;

#[test_log::test]
fn round_trip() {
	let (_dir, path) = util::temp_file("audio.mp3", &util::mp3(38));

	let mut file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.format(), FileFormat::Mpeg);
	assert_eq!(file.title(), "");
	assert_eq!(file.year(), 0);
	assert_eq!(file.bitrate(), 128);
	assert_eq!(file.sample_rate(), 44100);
	assert_eq!(file.channels(), 2);

	file.set_title(String::from("New Title"));
	file.set_artist(String::from("Someone"));
	file.set_year(2024);
	file.save().unwrap();
	file.close();

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.title(), "New Title");
	assert_eq!(file.artist(), "Someone");
	assert_eq!(file.year(), 2024);
	// The audio survives untouched
	assert_eq!(file.bitrate(), 128);
}

#[test_log::test]
fn unchanged_save_is_byte_identical() {
	let (_dir, path) = util::temp_file("audio.mp3", &util::mp3(8));

	let mut file = TaggedFile::read(&path).unwrap();
	file.set_album(String::from("Album"));
	file.save().unwrap();
	let after_first = fs::read(&path).unwrap();

	// No mutations between the saves
	file.save().unwrap();
	assert_eq!(fs::read(&path).unwrap(), after_first);
}

#[test_log::test]
fn unknown_keys_survive_a_rewrite() {
	let (_dir, path) = util::temp_file("audio.mp3", &util::mp3(8));

	let mut file = TaggedFile::read(&path).unwrap();
	file.set_tag("CATALOGNUMBER", String::from("CAT-001"));
	file.save().unwrap();

	let mut file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.get_tag("CATALOGNUMBER"), "CAT-001");

	// Saving without touching the key keeps it
	file.set_comment(String::from("hi"));
	file.save().unwrap();

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.get_tag("CATALOGNUMBER"), "CAT-001");
	assert_eq!(file.comment(), "hi");
}

#[test_log::test]
fn empty_value_removes_the_field() {
	let (_dir, path) = util::temp_file("audio.mp3", &util::mp3(8));

	let mut file = TaggedFile::read(&path).unwrap();
	file.set_title(String::from("Title"));
	file.set_genre(String::from("Rock"));
	file.save().unwrap();

	let mut file = TaggedFile::read(&path).unwrap();
	file.set_genre(String::new());
	file.save().unwrap();

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.title(), "Title");
	assert_eq!(file.genre(), "");
}

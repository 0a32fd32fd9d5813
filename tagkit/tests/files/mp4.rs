use crate::util;

use tagkit::{FileFormat, TaggedFile};

#[test_log::test]
fn tag_chain_is_created_on_first_save() {
	let (_dir, path) = util::temp_file("audio.m4a", &util::m4a());

	let mut file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.format(), FileFormat::Mp4);
	assert!(file.tag().is_empty());
	assert_eq!(file.length().as_secs(), 10);

	file.set_title(String::from("M4A Title"));
	file.set_track(5);
	file.save().unwrap();

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.title(), "M4A Title");
	assert_eq!(file.track(), 5);
	assert_eq!(file.sample_rate(), 44100);
	assert_eq!(file.channels(), 2);
}

#[test_log::test]
fn freeform_keys_round_trip() {
	let (_dir, path) = util::temp_file("audio.m4a", &util::m4a());

	let mut file = TaggedFile::read(&path).unwrap();
	file.set_tag("CATALOGNUMBER", String::from("CAT-001"));
	file.save().unwrap();

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.get_tag("CATALOGNUMBER"), "CAT-001");
}

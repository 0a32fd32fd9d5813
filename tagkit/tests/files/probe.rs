use crate::util;

use tagkit::{ErrorKind, FileFormat, TaggedFile};

#[test_log::test]
fn garbage_is_rejected() {
	let (_dir, path) = util::temp_file("audio.bin", &[0x55; 10]);

	let err = TaggedFile::read(&path).unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::InvalidFile(_)));
}

#[test_log::test]
fn renamed_files_detect_by_content() {
	// An MP3 wearing a WAV extension still parses as MPEG
	let (_dir, path) = util::temp_file("audio.wav", &util::mp3(8));

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.format(), FileFormat::Mpeg);
}

#[test_log::test]
fn missing_file_is_invalid() {
	let err = TaggedFile::read("does/not/exist.mp3").unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::InvalidFile(_)));
}

//! Parse and write metadata across the common audio formats.
//!
//! # Supported formats
//!
//! | Format         | Tag container        | Properties        |
//! |----------------|----------------------|-------------------|
//! | AAC (ADTS)     | ID3v2, ID3v1, APE    | ADTS headers      |
//! | AIFF / AIFF-C  | ID3v2 (`ID3 ` chunk) | COMM chunk        |
//! | ASF / WMA      | ASF descriptors      | File/Stream props |
//! | FLAC           | Vorbis Comments      | STREAMINFO        |
//! | Monkey's Audio | APEv2, ID3v1         | MAC headers       |
//! | MP4 / M4A      | `ilst` atoms         | `moov` atoms      |
//! | MPEG (MP3)     | ID3v2, ID3v1, APE    | Frame headers     |
//! | Musepack       | APEv2, ID3v1         | SV7/SV8 headers   |
//! | Ogg Opus       | Vorbis Comments      | OpusHead          |
//! | Ogg Speex      | Vorbis Comments      | Speex header      |
//! | Ogg Vorbis     | Vorbis Comments      | Ident header      |
//! | TTA            | ID3v2, ID3v1, APE    | TTA1 header       |
//! | WAV            | ID3v2 (`ID3 ` chunk) | `fmt ` chunk      |
//!
//! # Examples
//!
//! ```rust,no_run
//! # fn main() -> tagkit::Result<()> {
//! use tagkit::TaggedFile;
//!
//! // The format is sniffed from the content, not the extension
//! let mut file = TaggedFile::read("music.mp3")?;
//!
//! println!("{} - {}", file.artist(), file.title());
//! println!("{} kbps, {:?}", file.bitrate(), file.length());
//!
//! // Nothing touches the disk until `save`
//! file.set_album(String::from("New Album"));
//! file.set_tag("CATALOGNUMBER", String::from("CAT-001"));
//! file.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! A save either fully succeeds or leaves the original file untouched; size
//! changes go through a temporary file that is renamed into place.

pub mod error;
pub mod file;
pub mod picture;
pub mod probe;
pub mod properties;
pub mod tag;

pub(crate) mod layout;
pub(crate) mod macros;
pub(crate) mod save;
mod util;

pub(crate) mod aac;
pub(crate) mod ape;
pub(crate) mod asf;
pub(crate) mod flac;
pub(crate) mod id3;
pub(crate) mod iff;
pub(crate) mod mp4;
pub(crate) mod mpeg;
pub(crate) mod musepack;
pub(crate) mod ogg;
pub(crate) mod tta;

pub use error::{ErrorKind, Result, TagError};
pub use file::TaggedFile;
pub use picture::{MimeType, Picture, PictureType};
pub use probe::FileFormat;
pub use properties::AudioProperties;
pub use tag::{ItemKey, ItemValue, Tag, TagItem, TagType};

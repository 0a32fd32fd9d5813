//! Error types returned throughout the crate
//!
//! The primary error is [`TagError`]. The type of error is determined by [`ErrorKind`].
//! At the two public boundaries, everything a parser can produce collapses into
//! [`ErrorKind::InvalidFile`] (while reading) or [`ErrorKind::SaveFailed`] (while saving),
//! so callers only ever need to match on a small set of kinds.

use crate::probe::FileFormat;
pub use crate::util::text::TextEncodingError;

use std::collections::TryReserveError;
use std::fmt::{Debug, Display, Formatter};

/// Alias for `Result<T, TagError>`
pub type Result<T> = std::result::Result<T, TagError>;

/// The types of errors that can occur
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
	/// The file is unreadable, unrecognizable, or not the format it claims to be
	InvalidFile(FileDecodingError),
	/// A save could not be completed; the file on disk is untouched
	SaveFailed(FileEncodingError),
	/// The file has no embedded picture
	NoPicture,

	/// Attempting to read/write an abnormally large amount of data
	TooMuchData,
	/// An item's claimed size contradicts the data that is actually available
	SizeMismatch,
	/// Provided an invalid picture
	NotAPicture,
	/// Errors that arise while decoding text
	TextDecode(&'static str),
	/// Errors that arise while encoding text
	TextEncode(TextEncodingError),
	/// Arises when an MP4 atom contains invalid data
	BadAtom(&'static str),

	/// Unable to convert bytes to a String
	StringFromUtf8(std::string::FromUtf8Error),
	/// Unable to convert bytes to a str
	StrFromUtf8(std::str::Utf8Error),
	/// Represents all cases of [`std::io::Error`].
	Io(std::io::Error),
	/// Failure to allocate enough memory
	Alloc(TryReserveError),
}

/// An error that arises while decoding a file
pub struct FileDecodingError {
	format: Option<FileFormat>,
	description: &'static str,
}

impl FileDecodingError {
	/// Create a `FileDecodingError` from a [`FileFormat`] and description
	#[must_use]
	pub const fn new(format: FileFormat, description: &'static str) -> Self {
		Self {
			format: Some(format),
			description,
		}
	}

	/// Create a `FileDecodingError` without binding it to a [`FileFormat`]
	pub fn from_description(description: &'static str) -> Self {
		Self {
			format: None,
			description,
		}
	}

	/// Returns the associated [`FileFormat`], if one exists
	pub fn format(&self) -> Option<FileFormat> {
		self.format
	}

	/// Returns the error description
	pub fn description(&self) -> &str {
		self.description
	}
}

impl Debug for FileDecodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(format) = self.format {
			write!(f, "{:?}: {:?}", format, self.description)
		} else {
			write!(f, "{:?}", self.description)
		}
	}
}

impl Display for FileDecodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(format) = self.format {
			write!(f, "{:?}: {}", format, self.description)
		} else {
			write!(f, "{}", self.description)
		}
	}
}

/// An error that arises while encoding and saving a file
pub struct FileEncodingError {
	format: Option<FileFormat>,
	description: &'static str,
}

impl FileEncodingError {
	/// Create a `FileEncodingError` from a [`FileFormat`] and description
	#[must_use]
	pub const fn new(format: FileFormat, description: &'static str) -> Self {
		Self {
			format: Some(format),
			description,
		}
	}

	/// Create a `FileEncodingError` without binding it to a [`FileFormat`]
	pub fn from_description(description: &'static str) -> Self {
		Self {
			format: None,
			description,
		}
	}

	/// Returns the associated [`FileFormat`], if one exists
	pub fn format(&self) -> Option<FileFormat> {
		self.format
	}

	/// Returns the error description
	pub fn description(&self) -> &str {
		self.description
	}
}

impl Debug for FileEncodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(format) = self.format {
			write!(f, "{:?}: {:?}", format, self.description)
		} else {
			write!(f, "{:?}", self.description)
		}
	}
}

impl Display for FileEncodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(format) = self.format {
			write!(f, "{:?}: {}", format, self.description)
		} else {
			write!(f, "{}", self.description)
		}
	}
}

/// Errors that can occur within the crate
pub struct TagError {
	pub(crate) kind: ErrorKind,
}

impl TagError {
	/// Create a `TagError` from an [`ErrorKind`]
	#[must_use]
	pub const fn new(kind: ErrorKind) -> Self {
		Self { kind }
	}

	/// Returns the [`ErrorKind`]
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	/// Collapse any reader-side error into [`ErrorKind::InvalidFile`]
	///
	/// A short read inside a parser is a truncated file, so I/O errors
	/// coarsen along with everything else.
	pub(crate) fn into_invalid_file(self, format: FileFormat) -> Self {
		match self.kind {
			ErrorKind::InvalidFile(_) => self,
			other => {
				log::debug!("coercing {other:?} into an invalid {format:?} file error");
				Self::new(ErrorKind::InvalidFile(FileDecodingError::new(
					format,
					"File contains malformed or truncated data",
				)))
			},
		}
	}

	/// Collapse any writer-side error into [`ErrorKind::SaveFailed`]
	pub(crate) fn into_save_failed(self, format: FileFormat) -> Self {
		match self.kind {
			ErrorKind::SaveFailed(_) => self,
			other => {
				log::debug!("coercing {other:?} into a {format:?} save failure");
				Self::new(ErrorKind::SaveFailed(FileEncodingError::new(
					format,
					"Unable to rewrite the file",
				)))
			},
		}
	}
}

impl std::error::Error for TagError {}

impl Debug for TagError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}", self.kind)
	}
}

impl From<FileDecodingError> for TagError {
	fn from(input: FileDecodingError) -> Self {
		Self {
			kind: ErrorKind::InvalidFile(input),
		}
	}
}

impl From<FileEncodingError> for TagError {
	fn from(input: FileEncodingError) -> Self {
		Self {
			kind: ErrorKind::SaveFailed(input),
		}
	}
}

impl From<TextEncodingError> for TagError {
	fn from(input: TextEncodingError) -> Self {
		Self {
			kind: ErrorKind::TextEncode(input),
		}
	}
}

impl From<std::io::Error> for TagError {
	fn from(input: std::io::Error) -> Self {
		Self {
			kind: ErrorKind::Io(input),
		}
	}
}

impl From<std::string::FromUtf8Error> for TagError {
	fn from(input: std::string::FromUtf8Error) -> Self {
		Self {
			kind: ErrorKind::StringFromUtf8(input),
		}
	}
}

impl From<std::str::Utf8Error> for TagError {
	fn from(input: std::str::Utf8Error) -> Self {
		Self {
			kind: ErrorKind::StrFromUtf8(input),
		}
	}
}

impl From<TryReserveError> for TagError {
	fn from(input: TryReserveError) -> Self {
		Self {
			kind: ErrorKind::Alloc(input),
		}
	}
}

impl Display for TagError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.kind {
			ErrorKind::StringFromUtf8(ref err) => write!(f, "{err}"),
			ErrorKind::StrFromUtf8(ref err) => write!(f, "{err}"),
			ErrorKind::Io(ref err) => write!(f, "{err}"),
			ErrorKind::Alloc(ref err) => write!(f, "{err}"),

			ErrorKind::InvalidFile(ref err) => write!(f, "{err}"),
			ErrorKind::SaveFailed(ref err) => write!(f, "{err}"),
			ErrorKind::NoPicture => write!(f, "The file has no embedded picture"),

			ErrorKind::TooMuchData => write!(
				f,
				"Attempted to read/write an abnormally large amount of data"
			),
			ErrorKind::SizeMismatch => write!(
				f,
				"Encountered an invalid item size, either too big or too small to be valid"
			),
			ErrorKind::NotAPicture => write!(f, "Picture: Encountered invalid data"),
			ErrorKind::TextDecode(message) => write!(f, "Text decoding: {message}"),
			ErrorKind::TextEncode(message) => write!(f, "Text encoding: {message}"),
			ErrorKind::BadAtom(message) => write!(f, "MP4 Atom: {message}"),
		}
	}
}

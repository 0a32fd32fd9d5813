macro_rules! try_vec {
	($elem:expr; $size:expr) => {{ $crate::util::alloc::fallible_vec_from_element($elem, $size)? }};
}

// Shorthand for return Err(TagError::new(ErrorKind::Foo))
//
// Usage:
// - err!(Variant)          -> return Err(TagError::new(ErrorKind::Variant))
// - err!(Variant(Message)) -> return Err(TagError::new(ErrorKind::Variant(Message)))
macro_rules! err {
	($variant:ident) => {
		return Err(crate::error::TagError::new(
			crate::error::ErrorKind::$variant,
		))
	};
	($variant:ident($reason:literal)) => {
		return Err(crate::error::TagError::new(
			crate::error::ErrorKind::$variant($reason),
		))
	};
}

// Shorthand for FileDecodingError::new(FileFormat::Foo, "Message")
//
// Usage:
//
// - decode_err!(Variant, Message)
// - decode_err!(Message)
//
// or bail:
//
// - decode_err!(@BAIL Variant, Message)
// - decode_err!(@BAIL Message)
macro_rules! decode_err {
	($format:ident, $reason:literal) => {
		Into::<crate::error::TagError>::into(crate::error::FileDecodingError::new(
			crate::probe::FileFormat::$format,
			$reason,
		))
	};
	($reason:literal) => {
		Into::<crate::error::TagError>::into(crate::error::FileDecodingError::from_description(
			$reason,
		))
	};
	(@BAIL $($format:ident,)? $reason:literal) => {
		return Err(decode_err!($($format,)? $reason))
	};
}

// The encoding-side counterpart of decode_err!
macro_rules! encode_err {
	($format:ident, $reason:literal) => {
		Into::<crate::error::TagError>::into(crate::error::FileEncodingError::new(
			crate::probe::FileFormat::$format,
			$reason,
		))
	};
	($reason:literal) => {
		Into::<crate::error::TagError>::into(crate::error::FileEncodingError::from_description(
			$reason,
		))
	};
	(@BAIL $($format:ident,)? $reason:literal) => {
		return Err(encode_err!($($format,)? $reason))
	};
}

pub(crate) use {decode_err, encode_err, err, try_vec};

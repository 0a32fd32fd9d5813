use crate::error::Result;
use crate::macros::err;

// Caps any single allocation driven by an untrusted length field.
pub(crate) const ALLOCATION_LIMIT: usize = 16 * 1024 * 1024;

/// **DO NOT USE DIRECTLY**
///
/// Creates a `Vec` of the specified length, containing copies of `element`.
///
/// This should be used through [`try_vec!`](crate::macros::try_vec)
pub(crate) fn fallible_vec_from_element<T>(element: T, expected_size: usize) -> Result<Vec<T>>
where
	T: Clone,
{
	if expected_size > ALLOCATION_LIMIT {
		err!(TooMuchData);
	}

	let mut v = Vec::new();
	v.try_reserve_exact(expected_size)?;
	v.resize(expected_size, element);

	Ok(v)
}

#[cfg(test)]
mod tests {
	use super::fallible_vec_from_element;

	#[test_log::test]
	fn fallible_vec() {
		let zeroed = fallible_vec_from_element(0u8, 64).unwrap();
		assert_eq!(zeroed.len(), 64);
		assert!(zeroed.iter().all(|b| *b == 0));

		// A length field claiming 4GiB must never be trusted
		assert!(fallible_vec_from_element(0u8, u32::MAX as usize).is_err());
	}
}

/// Perform a rounded division.
///
/// Implemented for the unsigned integers used by the property readers.
pub(crate) trait RoundedDivision<Rhs = Self> {
	type Output;

	fn div_round(self, rhs: Rhs) -> Self::Output;
}

macro_rules! unsigned_rounded_division {
	($($t:ty),*) => {
		$(
			impl RoundedDivision for $t {
				type Output = $t;

				fn div_round(self, rhs: Self) -> Self::Output {
					(self + (rhs >> 1)) / rhs
				}
			}
		)*
	};
}

unsigned_rounded_division!(u32, u64, u128, usize);

/// An 80-bit extended precision floating-point number.
///
/// AIFF stores the sample rate in this format.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub(crate) struct F80 {
	signed: bool,
	// 15-bit exponent with a bias of 16383
	exponent: u16,
	fraction: u64,
}

impl F80 {
	pub fn from_be_bytes(bytes: [u8; 10]) -> Self {
		let signed = bytes[0] & 0x80 != 0;
		let exponent = (u16::from(bytes[0] & 0x7F) << 8) | u16::from(bytes[1]);

		let mut fraction_bytes = [0; 8];
		fraction_bytes.copy_from_slice(&bytes[2..]);
		let fraction = u64::from_be_bytes(fraction_bytes);

		Self {
			signed,
			exponent,
			fraction,
		}
	}

	pub fn as_f64(&self) -> f64 {
		let sign = u64::from(self.signed);

		// e = 32767: infinity when the fraction is zero, NaN otherwise
		if self.exponent == 32767 {
			if self.fraction == 0 {
				return f64::from_bits((sign << 63) | f64::INFINITY.to_bits());
			}

			return f64::from_bits((sign << 63) | f64::NAN.to_bits());
		}

		// Zero (or a denormal too small to matter for a sample rate)
		if self.fraction == 0 {
			return f64::from_bits(sign << 63);
		}

		// Strip the explicit integer bit and rebias the exponent for f64
		let fraction = self.fraction & 0x7FFF_FFFF_FFFF_FFFF;
		let exponent = self.exponent as i16 - 16383 + 1023;
		let bits = (sign << 63) | ((exponent as u64) << 52) | (fraction >> 11);

		f64::from_bits(bits)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test_log::test]
	fn div_round() {
		assert_eq!(3u32.div_round(2), 2);
		assert_eq!(4u32.div_round(2), 2);
		assert_eq!(5u32.div_round(2), 3);
		assert_eq!(0u32.div_round(4000), 0);
		assert_eq!(1500u32.div_round(4000), 0);
		assert_eq!(800u32.div_round(1500), 1);
	}

	#[test_log::test]
	fn f80_sample_rates() {
		fn rate(bytes: [u8; 10]) -> f64 {
			F80::from_be_bytes(bytes).as_f64()
		}

		assert!((rate([0x40, 0x0E, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]) - 44100.0).abs() < f64::EPSILON);
		assert!((rate([0x40, 0x0E, 0xBB, 0x80, 0, 0, 0, 0, 0, 0]) - 48000.0).abs() < f64::EPSILON);
		assert!((rate([0x40, 0x0B, 0xFA, 0x00, 0, 0, 0, 0, 0, 0]) - 8000.0).abs() < f64::EPSILON);
		assert!((rate([0; 10]) - 0.0).abs() < f64::EPSILON);
	}
}

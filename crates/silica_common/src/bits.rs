//! Bit-arithmetic helpers shared by width inference, memory sizing, and
//! FSM state encoding.

use thiserror::Error;

/// Errors from bit-arithmetic helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitsError {
    /// A value required to be an exact power of two was not.
    #[error("expected a power of two, got {0}")]
    NotPowerOfTwo(u64),
}

/// Returns the base-2 logarithm of `n`, rounded up.
///
/// With `need_pow2` set, `n` must be an exact power of two or
/// [`BitsError::NotPowerOfTwo`] is returned with the actual value.
pub fn log2_int(n: u64, need_pow2: bool) -> Result<u32, BitsError> {
    let mut l: u64 = 1;
    let mut r: u32 = 0;
    while l < n {
        l *= 2;
        r += 1;
    }
    if need_pow2 && l != n {
        return Err(BitsError::NotPowerOfTwo(n));
    }
    Ok(r)
}

/// Returns the number of bits needed to store `n`.
///
/// For negative `n` (and whenever `require_sign_bit` is set) the count
/// includes a sign bit.
pub fn bits_for(n: i64, require_sign_bit: bool) -> u32 {
    if n > 0 {
        let r = log2_int(n as u64 + 1, false).unwrap_or(0);
        if require_sign_bit {
            r + 1
        } else {
            r
        }
    } else {
        log2_int(n.unsigned_abs(), false).unwrap_or(0) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log2_exact_powers() {
        assert_eq!(log2_int(1, true), Ok(0));
        assert_eq!(log2_int(2, true), Ok(1));
        assert_eq!(log2_int(8, true), Ok(3));
        assert_eq!(log2_int(1024, true), Ok(10));
    }

    #[test]
    fn log2_non_power_rejected() {
        assert_eq!(log2_int(3, true), Err(BitsError::NotPowerOfTwo(3)));
        assert_eq!(log2_int(1000, true), Err(BitsError::NotPowerOfTwo(1000)));
    }

    #[test]
    fn log2_rounds_up_when_allowed() {
        assert_eq!(log2_int(3, false), Ok(2));
        assert_eq!(log2_int(5, false), Ok(3));
        assert_eq!(log2_int(1000, false), Ok(10));
    }

    #[test]
    fn bits_for_positive() {
        assert_eq!(bits_for(0, false), 1);
        assert_eq!(bits_for(1, false), 1);
        assert_eq!(bits_for(2, false), 2);
        assert_eq!(bits_for(3, false), 2);
        assert_eq!(bits_for(255, false), 8);
        assert_eq!(bits_for(256, false), 9);
    }

    #[test]
    fn bits_for_with_sign_bit() {
        assert_eq!(bits_for(3, true), 3);
        assert_eq!(bits_for(255, true), 9);
    }

    #[test]
    fn bits_for_negative() {
        assert_eq!(bits_for(-1, false), 1);
        assert_eq!(bits_for(-2, false), 2);
        assert_eq!(bits_for(-128, false), 8);
        assert_eq!(bits_for(-129, false), 9);
    }
}

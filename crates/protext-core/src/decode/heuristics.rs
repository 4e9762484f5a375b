//! Guesses for what a schema-less value most likely is.
//!
//! Fixed-width values are ambiguous between integers and IEEE-754 floats.
//! A bit pattern is called float-like when the magnitude of its unbiased
//! exponent is below the format's maximum exponent. This rejects zero,
//! subnormals, infinities and NaN, and accepts every normal number.
//!
//! False positives are inherent: an integer whose bits happen to form a
//! normal float (for example `4607182418800017408`, the bits of `1.0`)
//! is reported as a double. Small integers have a zero exponent field and
//! are never misread.

/// Fraction of non-printable characters above which a payload is binary
pub const BINARY_THRESHOLD: f64 = 0.3;

const DOUBLE_EXPONENT_BIAS: i64 = 1023;
const FLOAT_EXPONENT_BIAS: i32 = 127;

/// Returns true if a 64-bit pattern looks like a double.
pub fn looks_like_double(bits: u64) -> bool {
    let exponent = ((bits >> 52) & 0x7FF) as i64;
    (exponent - DOUBLE_EXPONENT_BIAS).abs() < DOUBLE_EXPONENT_BIAS
}

/// Returns true if a 32-bit pattern looks like a float.
pub fn looks_like_float(bits: u32) -> bool {
    let exponent = ((bits >> 23) & 0xFF) as i32;
    (exponent - FLOAT_EXPONENT_BIAS).abs() < FLOAT_EXPONENT_BIAS
}

/// A character counts as printable when its code point lies in 33..=255,
/// is not DEL, and is not whitespace.
fn is_printable(c: char) -> bool {
    let code = u32::from(c);
    (33..=255).contains(&code) && code != 127 && !c.is_whitespace()
}

/// Returns true if more than 30% of the characters are non-printable.
///
/// An empty string is not binary.
pub fn is_mostly_binary(s: &str) -> bool {
    let (total, non_printable) = s.chars().fold((0usize, 0usize), |(total, bad), c| {
        (total + 1, bad + usize::from(!is_printable(c)))
    });
    if total == 0 {
        return false;
    }
    non_printable as f64 / total as f64 > BINARY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_classification() {
        assert!(looks_like_double(1.5f64.to_bits()));
        assert!(looks_like_double((-123.25f64).to_bits()));
        assert!(looks_like_double(1e300f64.to_bits()));
        assert!(!looks_like_double(0));
        assert!(!looks_like_double(42));
        assert!(!looks_like_double(f64::NAN.to_bits()));
        assert!(!looks_like_double(f64::INFINITY.to_bits()));
        assert!(!looks_like_double(f64::MIN_POSITIVE.to_bits() >> 1));
    }

    #[test]
    fn test_double_false_positive_is_kept() {
        // An integer that aliases 1.0 reads as a double
        assert!(looks_like_double(4_607_182_418_800_017_408));
    }

    #[test]
    fn test_float_classification() {
        assert!(looks_like_float(3.25f32.to_bits()));
        assert!(looks_like_float((-0.5f32).to_bits()));
        assert!(!looks_like_float(0));
        assert!(!looks_like_float(7));
        assert!(!looks_like_float(f32::NAN.to_bits()));
        assert!(!looks_like_float(f32::NEG_INFINITY.to_bits()));
    }

    #[test]
    fn test_printable_threshold() {
        // 4 of 13 non-printable is just over 30%
        assert!(is_mostly_binary("abcdefghi\t\t\t\t"));
        // 3 of 12 is 25%
        assert!(!is_mostly_binary("abcdefghi\t\t\t"));
        assert!(!is_mostly_binary(""));
        assert!(!is_mostly_binary("hello world"));
        assert!(is_mostly_binary("\u{1}\u{2}\u{3}a"));
    }

    #[test]
    fn test_wide_characters_count_as_non_printable() {
        assert!(is_mostly_binary("日本語"));
        assert!(!is_mostly_binary("café"));
    }
}

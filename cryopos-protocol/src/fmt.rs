//! Number formatting for response messages
//!
//! Speeds are reported with six significant digits in the style of C's
//! `%.6g`: fixed notation for moderate magnitudes, exponent notation
//! otherwise, trailing zeros removed.

use core::fmt;

/// Significant digits printed by [`Sig6`]
const PRECISION: i32 = 6;

/// Display adapter printing a float with six significant digits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sig6(pub f32);

impl fmt::Display for Sig6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0 as f64;
        if value == 0.0 {
            return f.write_str("0");
        }
        if !value.is_finite() {
            return write!(f, "{}", value);
        }
        if value < 0.0 {
            f.write_str("-")?;
        }
        let magnitude = if value < 0.0 { -value } else { value };

        let mut exponent = decimal_exponent(magnitude);
        let mut digits = round_digits(magnitude, exponent);
        if digits >= pow10(PRECISION) {
            // Rounding carried into a new decade (e.g. 999999.5)
            exponent += 1;
            digits = round_digits(magnitude, exponent);
        }

        if (-4..PRECISION).contains(&exponent) {
            let decimals = (PRECISION - 1 - exponent) as u32;
            write_fixed(f, digits, decimals)
        } else {
            write_fixed(f, digits, (PRECISION - 1) as u32)?;
            let sign = if exponent < 0 { '-' } else { '+' };
            write!(f, "e{}{:02}", sign, exponent.unsigned_abs())
        }
    }
}

/// Power of ten of the leading digit of a positive finite value
fn decimal_exponent(mut magnitude: f64) -> i32 {
    let mut exponent = 0;
    while magnitude >= 10.0 {
        magnitude /= 10.0;
        exponent += 1;
    }
    while magnitude < 1.0 {
        magnitude *= 10.0;
        exponent -= 1;
    }
    exponent
}

/// Value scaled to exactly [`PRECISION`] integer digits, rounded half up
fn round_digits(magnitude: f64, exponent: i32) -> u64 {
    let shift = PRECISION - 1 - exponent;
    let scaled = if shift >= 0 {
        magnitude * pow10(shift) as f64
    } else {
        magnitude / pow10(-shift) as f64
    };
    (scaled + 0.5) as u64
}

fn pow10(n: i32) -> u64 {
    (0..n).fold(1u64, |acc, _| acc * 10)
}

/// Write `digits / 10^decimals` with trailing fractional zeros removed
fn write_fixed(f: &mut fmt::Formatter<'_>, digits: u64, decimals: u32) -> fmt::Result {
    let scale = pow10(decimals as i32);
    let whole = digits / scale;
    let mut frac = digits % scale;
    let mut width = decimals as usize;
    while width > 0 && frac % 10 == 0 {
        frac /= 10;
        width -= 1;
    }

    write!(f, "{}", whole)?;
    if width > 0 {
        write!(f, ".{:0width$}", frac, width = width)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(value: f32) -> String {
        format!("{}", Sig6(value))
    }

    #[test]
    fn test_integers() {
        assert_eq!(g(0.0), "0");
        assert_eq!(g(100.0), "100");
        assert_eq!(g(25.0), "25");
        assert_eq!(g(150000.0), "150000");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(g(0.5), "0.5");
        assert_eq!(g(1499.25), "1499.25");
        assert_eq!(g(-2.5), "-2.5");
        assert_eq!(g(0.000125), "0.000125");
    }

    #[test]
    fn test_rounding() {
        // 1.5 MHz / 7 counts
        assert_eq!(g(1_500_000.0 / 7.0), "214286");
        assert_eq!(g(1_500_000.0 / 60_000.0), "25");
        assert_eq!(g(32768.0 / 3.0), "10922.7");
    }

    #[test]
    fn test_exponent_form() {
        assert_eq!(g(1_200_000.0), "1.2e+06");
        assert_eq!(g(6_000_000.0), "6e+06");
        assert_eq!(g(0.00001), "1e-05");
        assert_eq!(g(999_999.6), "1e+06");
    }
}

//! ADC code to charge conversion.
//!
//! The digitizer compresses charge into an 8-bit code split into four ranges:
//! a 2-bit range selector and a 6-bit mantissa. Within one range the response
//! is linear; the step size doubles from range to range, and each range
//! starts where the previous one ended, so the full transfer curve is
//! monotone and piecewise linear.

/// Codes per range (6-bit mantissa).
const CODES_PER_RANGE: usize = 64;

/// Charge step per count in the lowest range, in fC.
const BASE_LSB_FC: f32 = 0.3125;

/// Converts one raw ADC code to charge in fC.
///
/// The mid-step convention (`mantissa + 0.5`) assigns each code the center of
/// the charge bin it quantizes.
#[must_use]
pub fn adc_to_fc(adc: u8) -> f32 {
    let range = (adc >> 6) as u32;
    let mantissa = (adc & 0x3f) as f32;
    let lsb = BASE_LSB_FC * (1 << range) as f32;
    range_offset(range) + (mantissa + 0.5) * lsb
}

/// Charge at which the given range begins.
fn range_offset(range: u32) -> f32 {
    let mut offset = 0.0;
    for r in 0..range {
        offset += CODES_PER_RANGE as f32 * BASE_LSB_FC * (1 << r) as f32;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_code_is_half_lsb() {
        assert!((adc_to_fc(0) - 0.5 * BASE_LSB_FC).abs() < 1e-6);
    }

    #[test]
    fn test_monotone_over_full_code_space() {
        let mut prev = f32::NEG_INFINITY;
        for code in 0..=255u8 {
            let fc = adc_to_fc(code);
            assert!(
                fc > prev,
                "code {code} not monotone: {fc} <= {prev}"
            );
            prev = fc;
        }
    }

    #[test]
    fn test_range_boundaries_are_contiguous() {
        // The first code of a range must continue past the last code of the
        // previous range by exactly half of each range's step.
        for boundary in [64u8, 128, 192] {
            let below = adc_to_fc(boundary - 1);
            let above = adc_to_fc(boundary);
            assert!(above > below);
            let gap = above - below;
            let lsb_below = BASE_LSB_FC * (1 << ((boundary - 1) >> 6)) as f32;
            let lsb_above = BASE_LSB_FC * (1 << (boundary >> 6)) as f32;
            let expected = 0.5 * lsb_below + 0.5 * lsb_above;
            assert!(
                (gap - expected).abs() < 1e-4,
                "gap at {boundary}: {gap} vs {expected}"
            );
        }
    }

    #[test]
    fn test_step_doubles_per_range() {
        let step_r0 = adc_to_fc(1) - adc_to_fc(0);
        let step_r1 = adc_to_fc(65) - adc_to_fc(64);
        let step_r2 = adc_to_fc(129) - adc_to_fc(128);
        assert!((step_r1 - 2.0 * step_r0).abs() < 1e-5);
        assert!((step_r2 - 4.0 * step_r0).abs() < 1e-5);
    }
}

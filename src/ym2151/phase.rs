//! Phase generator
//!
//! Operators advance by their cached increment every sample. When the LFO
//! modulates pitch, the increment is recomputed from a shifted frequency
//! table index instead.

use super::operator::Operator;
use super::tables::ClockTables;

/// Frequency table offset produced by the LFO phase output for a PMS setting
///
/// PMS 1..=5 divide the LFO output, 6 and 7 multiply it.
#[inline]
pub fn modulation_index(lfp: i32, pms: u8) -> i32 {
    match pms {
        0 => 0,
        1..=5 => lfp >> (6 - pms),
        _ => lfp << (pms - 5),
    }
}

/// Advance the four operators of one channel by one sample
#[inline]
pub fn advance_channel(operators: &mut [Operator], mod_index: i32, tables: &ClockTables) {
    if mod_index != 0 {
        for op in operators.iter_mut() {
            let index = (op.key_index as i32 + mod_index) as u32 + op.dt2;
            let increment = op.increment_at(index, tables);
            op.phase = op.phase.wrapping_add(increment);
        }
    } else {
        for op in operators.iter_mut() {
            op.phase = op.phase.wrapping_add(op.freq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulation_index_scaling() {
        assert_eq!(modulation_index(100, 0), 0);
        assert_eq!(modulation_index(128, 1), 128 >> 5);
        assert_eq!(modulation_index(128, 5), 128 >> 1);
        assert_eq!(modulation_index(128, 6), 256);
        assert_eq!(modulation_index(-128, 7), -512);
        assert_eq!(modulation_index(3, 1), 0);
    }

    #[test]
    fn test_unmodulated_advance_uses_cached_freq() {
        let tables = ClockTables::new(4_000_000, 44_100);
        let mut ops = vec![Operator::new(); 4];
        for op in ops.iter_mut() {
            op.set_dt1_mul(0x01, &tables);
            op.set_key_code(0x4a, &tables);
        }
        advance_channel(&mut ops, 0, &tables);
        advance_channel(&mut ops, 0, &tables);
        for op in &ops {
            assert_eq!(op.phase, op.freq.wrapping_mul(2));
        }
    }

    #[test]
    fn test_positive_modulation_raises_increment() {
        let tables = ClockTables::new(4_000_000, 44_100);
        let mut plain = vec![Operator::new(); 1];
        plain[0].set_dt1_mul(0x01, &tables);
        plain[0].set_key_code(0x4a, &tables);
        let mut vibrato = plain.clone();

        advance_channel(&mut plain, 0, &tables);
        advance_channel(&mut vibrato, 64, &tables);
        assert!(vibrato[0].phase > plain[0].phase);

        let mut flat = plain.clone();
        flat[0].phase = 0;
        plain[0].phase = 0;
        advance_channel(&mut plain, 0, &tables);
        advance_channel(&mut flat, -64, &tables);
        assert!(flat[0].phase < plain[0].phase);
    }
}

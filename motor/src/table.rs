use crate::Error;

/// One entry per percent from 0 to 100.
pub const TABLE_LEN: usize = 101;

/// Precomputed mapping from throttle percent to pulse width.
///
/// Entry 0 is always the literal 0 (disarmed, no signal) and is distinct from
/// the configured minimum; entries 1 to 100 interpolate linearly from `min`
/// to `max`. Built once per motor, immutable afterwards.
#[derive(Debug, Clone)]
pub struct ThrottleTable {
    entries: [u16; TABLE_LEN],
}

impl ThrottleTable {
    pub fn build(min: u16, max: u16) -> Result<Self, Error> {
        if max <= min {
            return Err(Error::InvalidBounds { min, max });
        }

        // 99 intervals between 1% and 100%; max > min keeps the step positive.
        let step = f32::from(max - min) / 99.0;
        let mut entries = [0u16; TABLE_LEN];
        for i in 0..=99usize {
            entries[i + 1] = (f32::from(min) + step * i as f32).round() as u16;
        }

        Ok(ThrottleTable { entries })
    }

    /// Resolves a throttle percent to its pulse width. Only values above 100
    /// are rejected; every entry from 0 to 100 exists once the table is built.
    pub fn translate(&self, percent: u8) -> Result<u16, Error> {
        if percent > 100 {
            return Err(Error::OutOfRange(percent));
        }
        Ok(self.entries[usize::from(percent)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_spans_bounds() {
        let table = ThrottleTable::build(1100, 1900).unwrap();

        assert_eq!(table.translate(0).unwrap(), 0);
        assert_eq!(table.translate(1).unwrap(), 1100);
        assert_eq!(table.translate(100).unwrap(), 1900);
    }

    #[test]
    fn test_build_is_monotonic() {
        let table = ThrottleTable::build(1068, 1890).unwrap();

        let mut last = table.translate(1).unwrap();
        for percent in 2..=100 {
            let pulse = table.translate(percent).unwrap();
            assert!(pulse >= last, "table decreases at {}%", percent);
            last = pulse;
        }
        assert_eq!(last, 1890);
    }

    #[test]
    fn test_build_rejects_bad_bounds() {
        assert!(matches!(
            ThrottleTable::build(1900, 1100),
            Err(Error::InvalidBounds { min: 1900, max: 1100 })
        ));
        assert!(matches!(
            ThrottleTable::build(1500, 1500),
            Err(Error::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_translate_interpolates() {
        // round(1100 + (800 / 99) * 49) = 1496
        let table = ThrottleTable::build(1100, 1900).unwrap();
        assert_eq!(table.translate(50).unwrap(), 1496);
    }

    #[test]
    fn test_translate_rejects_out_of_range() {
        let table = ThrottleTable::build(1100, 1900).unwrap();

        assert!(matches!(table.translate(101), Err(Error::OutOfRange(101))));
        assert!(matches!(table.translate(255), Err(Error::OutOfRange(255))));
        for percent in 0..=100 {
            assert!(table.translate(percent).is_ok());
        }
    }
}

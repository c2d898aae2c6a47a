/// `round(done / total * 100)` as an integer percentage, clamped to 100.
///
/// An empty total counts as finished.
pub fn round_percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u128;
    let total = total as u128;
    ((done * 200 + total) / (2 * total)) as u8
}

/// Turns unit counts into a non-decreasing 0-100 percentage stream.
///
/// `advance` only yields a value when the rounded percentage moves
/// forward, so callbacks never see a repeat or a step backwards.
#[derive(Debug)]
pub struct ProgressScale {
    total: u64,
    done: u64,
    last: Option<u8>,
}

impl ProgressScale {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            done: 0,
            last: None,
        }
    }

    /// Record `units` of work; returns the new percentage if it increased.
    pub fn advance(&mut self, units: u64) -> Option<u8> {
        self.done = self.done.saturating_add(units);
        let pct = self.percent();
        match self.last {
            Some(last) if pct <= last => None,
            _ => {
                self.last = Some(pct);
                Some(pct)
            }
        }
    }

    pub fn percent(&self) -> u8 {
        round_percent(self.done, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_percent(1, 3), 33);
        assert_eq!(round_percent(2, 3), 67);
        assert_eq!(round_percent(1, 200), 1);
        assert_eq!(round_percent(1, 201), 0);
        assert_eq!(round_percent(5, 5), 100);
        assert_eq!(round_percent(9, 5), 100);
        assert_eq!(round_percent(0, 0), 100);
    }

    #[test]
    fn only_emits_increases() {
        let mut scale = ProgressScale::new(1000);
        assert_eq!(scale.advance(1), Some(0));
        assert_eq!(scale.advance(1), None);
        assert_eq!(scale.advance(500), Some(50));
        assert_eq!(scale.advance(0), None);
        assert_eq!(scale.advance(10_000), Some(100));
        assert_eq!(scale.advance(1), None);
    }
}

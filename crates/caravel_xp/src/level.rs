//! Level formula pair.
//!
//! `level` is derived from total XP, never stored independently:
//!
//! ```text
//! level(total_xp)           = floor(sqrt(total_xp / 100)) + 1
//! xp_required_for_level(lv) = (lv - 1)^2 * 100
//! ```
//!
//! Both use a real floating-point square root then floor; integer
//! approximations drift off by one near level boundaries.

/// Level for a given total XP. Level 1 starts at 0 XP.
pub fn level_for_xp(total_xp: u64) -> u32 {
    (total_xp as f64 / 100.0).sqrt().floor() as u32 + 1
}

/// Total XP at which `level` begins.
pub fn xp_required_for_level(level: u32) -> u64 {
    let base = u64::from(level.saturating_sub(1));
    base * base * 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(399), 2);
        assert_eq!(level_for_xp(400), 3);
        assert_eq!(level_for_xp(2500), 6);
    }

    #[test]
    fn required_xp_inverts_level() {
        assert_eq!(xp_required_for_level(1), 0);
        assert_eq!(xp_required_for_level(2), 100);
        assert_eq!(xp_required_for_level(3), 400);
        assert_eq!(xp_required_for_level(10), 8100);
    }

    #[test]
    fn formulas_bracket_every_total() {
        for total_xp in (0..50_000).step_by(7) {
            let level = level_for_xp(total_xp);
            assert!(xp_required_for_level(level) <= total_xp);
            assert!(total_xp < xp_required_for_level(level + 1));
        }
    }

    #[test]
    fn level_is_monotone() {
        let mut previous = 0;
        for total_xp in 0..5_000 {
            let level = level_for_xp(total_xp);
            assert!(level >= previous);
            previous = level;
        }
    }
}

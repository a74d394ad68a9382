use serde::{Deserialize, Serialize};

/// Maximum per-channel volume. Values are percentages.
pub const VOLUME_MAX: i32 = 100;

/// Clamp a raw volume to the valid 0..=100 range.
///
/// Applied whenever state crosses a backend boundary in either direction.
/// Idempotent, so re-applying to already normalized state is harmless.
pub fn clamp(volume: i32) -> i32 {
    volume.clamp(0, VOLUME_MAX)
}

/// Coarse level bucket for icon and threshold logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeLevel {
    Muted,
    Low,
    Medium,
    High,
}

impl VolumeLevel {
    /// Bucket for a line's effective level (its maximum channel volume).
    /// A disabled line is always `Muted`.
    pub fn from_level(enabled: bool, level: i32) -> VolumeLevel {
        if !enabled || level <= 0 {
            VolumeLevel::Muted
        } else if level <= 33 {
            VolumeLevel::Low
        } else if level <= 66 {
            VolumeLevel::Medium
        } else {
            VolumeLevel::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_is_idempotent_and_bounded() {
        for v in [-1000, -1, 0, 1, 50, 99, 100, 101, 1000] {
            let once = clamp(v);
            assert!((0..=VOLUME_MAX).contains(&once));
            assert_eq!(clamp(once), once);
        }
    }

    #[test]
    fn level_buckets() {
        assert_eq!(VolumeLevel::from_level(false, 100), VolumeLevel::Muted);
        assert_eq!(VolumeLevel::from_level(true, 0), VolumeLevel::Muted);
        assert_eq!(VolumeLevel::from_level(true, 1), VolumeLevel::Low);
        assert_eq!(VolumeLevel::from_level(true, 33), VolumeLevel::Low);
        assert_eq!(VolumeLevel::from_level(true, 34), VolumeLevel::Medium);
        assert_eq!(VolumeLevel::from_level(true, 66), VolumeLevel::Medium);
        assert_eq!(VolumeLevel::from_level(true, 67), VolumeLevel::High);
        assert_eq!(VolumeLevel::from_level(true, 100), VolumeLevel::High);
    }
}

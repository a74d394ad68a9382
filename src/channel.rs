use serde::{Deserialize, Serialize};

/// Number of defined channel roles. Channel masks fit in a `u32`.
pub const CHANNEL_COUNT: usize = 18;

/// Spatial channel role within a mixer line.
///
/// The set and ordering are fixed; a line advertises which roles it carries
/// through a [`ChannelMask`] over this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    FrontLeft = 0,
    FrontRight,
    FrontCenter,
    Lfe,
    BackLeft,
    BackRight,
    FrontLeftCenter,
    FrontRightCenter,
    BackCenter,
    SideLeft,
    SideRight,
    TopCenter,
    TopFrontLeft,
    TopFrontCenter,
    TopFrontRight,
    TopBackLeft,
    TopBackCenter,
    TopBackRight,
}

impl Channel {
    /// All channels in enumeration order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::FrontLeft,
        Channel::FrontRight,
        Channel::FrontCenter,
        Channel::Lfe,
        Channel::BackLeft,
        Channel::BackRight,
        Channel::FrontLeftCenter,
        Channel::FrontRightCenter,
        Channel::BackCenter,
        Channel::SideLeft,
        Channel::SideRight,
        Channel::TopCenter,
        Channel::TopFrontLeft,
        Channel::TopFrontCenter,
        Channel::TopFrontRight,
        Channel::TopBackLeft,
        Channel::TopBackCenter,
        Channel::TopBackRight,
    ];

    pub fn from_index(index: usize) -> Option<Channel> {
        Channel::ALL.get(index).copied()
    }

    /// Position in the fixed enumeration, also the bit position in a mask.
    pub fn index(self) -> usize {
        self as usize
    }

    fn bit(self) -> u32 {
        1u32 << (self as u32)
    }

    pub fn short_name(self) -> &'static str {
        const NAMES: [&str; CHANNEL_COUNT] = [
            "FL", "FR", "FC", "LFE", "BL", "BR", "FLC", "FRC", "BC", "SL",
            "SR", "TC", "TFL", "TFC", "TFR", "TBL", "TBC", "TBR",
        ];
        NAMES[self.index()]
    }

    pub fn long_name(self) -> &'static str {
        const NAMES: [&str; CHANNEL_COUNT] = [
            "Front Left",
            "Front Right",
            "Front Center",
            "Low Frequency",
            "Back Left",
            "Back Right",
            "Front Left of Center",
            "Front Right of Center",
            "Back Center",
            "Side Left",
            "Side Right",
            "Top Center",
            "Front Left Height",
            "Front Center Height",
            "Front Right Height",
            "Rear Left Height",
            "Rear Center Height",
            "Rear Right Height",
        ];
        NAMES[self.index()]
    }
}

/// Bitmask of the channel roles a line supports.
///
/// Bit `i` corresponds to `Channel::ALL[i]`. Iteration yields set channels
/// in ascending enumeration order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMask(u32);

impl ChannelMask {
    pub const EMPTY: ChannelMask = ChannelMask(0);

    /// Mask with only the defined channel bits retained.
    pub fn from_bits(bits: u32) -> ChannelMask {
        ChannelMask(bits & ((1u32 << CHANNEL_COUNT) - 1))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn of(channels: &[Channel]) -> ChannelMask {
        let mut mask = ChannelMask::EMPTY;
        for ch in channels {
            mask.set(*ch);
        }
        mask
    }

    /// Stereo front pair, the most common line layout.
    pub fn stereo() -> ChannelMask {
        ChannelMask::of(&[Channel::FrontLeft, Channel::FrontRight])
    }

    pub fn mono() -> ChannelMask {
        ChannelMask::of(&[Channel::FrontLeft])
    }

    pub fn set(&mut self, channel: Channel) {
        self.0 |= channel.bit();
    }

    pub fn clear(&mut self, channel: Channel) {
        self.0 &= !channel.bit();
    }

    pub fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of supported channels, `popcount` of the mask.
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Smallest set channel, if any.
    pub fn first_set(self) -> Option<Channel> {
        self.next_from(0)
    }

    /// Smallest set channel strictly after `after`.
    pub fn next_set(self, after: Channel) -> Option<Channel> {
        self.next_from(after.index() + 1)
    }

    fn next_from(self, start: usize) -> Option<Channel> {
        (start..CHANNEL_COUNT)
            .map(|i| Channel::ALL[i])
            .find(|ch| self.contains(*ch))
    }

    pub fn iter(self) -> ChannelIter {
        ChannelIter {
            mask: self,
            next_index: 0,
        }
    }
}

impl FromIterator<Channel> for ChannelMask {
    fn from_iter<T: IntoIterator<Item = Channel>>(iter: T) -> Self {
        let mut mask = ChannelMask::EMPTY;
        for ch in iter {
            mask.set(ch);
        }
        mask
    }
}

impl IntoIterator for ChannelMask {
    type Item = Channel;
    type IntoIter = ChannelIter;

    fn into_iter(self) -> ChannelIter {
        self.iter()
    }
}

/// Lazy ascending iterator over the set channels of a mask.
pub struct ChannelIter {
    mask: ChannelMask,
    next_index: usize,
}

impl Iterator for ChannelIter {
    type Item = Channel;

    fn next(&mut self) -> Option<Channel> {
        let found = self.mask.next_from(self.next_index)?;
        self.next_index = found.index() + 1;
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_matches_popcount_and_is_ascending() {
        let masks = [
            0u32,
            1,
            0b1010,
            0b11,
            (1 << CHANNEL_COUNT) - 1,
            0b100_0000_0001,
        ];
        for bits in masks {
            let mask = ChannelMask::from_bits(bits);
            let collected: Vec<Channel> = mask.iter().collect();
            assert_eq!(collected.len(), mask.count());
            for pair in collected.windows(2) {
                assert!(pair[0].index() < pair[1].index());
            }
            for ch in &collected {
                assert!(mask.contains(*ch));
            }
        }
    }

    #[test]
    fn first_next_walk_terminates() {
        let mask = ChannelMask::of(&[Channel::FrontRight, Channel::Lfe, Channel::TopBackRight]);
        let mut seen = Vec::new();
        let mut cur = mask.first_set();
        while let Some(ch) = cur {
            seen.push(ch);
            cur = mask.next_set(ch);
        }
        assert_eq!(
            seen,
            vec![Channel::FrontRight, Channel::Lfe, Channel::TopBackRight]
        );
    }

    #[test]
    fn from_bits_discards_undefined_bits() {
        let mask = ChannelMask::from_bits(u32::MAX);
        assert_eq!(mask.count(), CHANNEL_COUNT);
    }

    #[test]
    fn empty_mask_yields_nothing() {
        assert_eq!(ChannelMask::EMPTY.first_set(), None);
        assert_eq!(ChannelMask::EMPTY.iter().count(), 0);
    }

    #[test]
    fn names_cover_all_channels() {
        for ch in Channel::ALL {
            assert!(!ch.short_name().is_empty());
            assert!(!ch.long_name().is_empty());
        }
    }
}

//! Channel layouts defined for ALAC streams.
//!
//! ALAC supports one layout per channel count. Channels are stored in the
//! bitstream in the order listed by [`ChannelLayoutTag::channel_labels`].

use std::fmt::Display;

/// Channel layout tags as they appear in the magic cookie.
#[allow(non_camel_case_types)]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayoutTag {
    /// C
    Mono = (100 << 16) | 1,
    /// L R
    Stereo = (101 << 16) | 2,
    /// C L R
    MPEG_3_0_B = (113 << 16) | 3,
    /// C L R Cs
    MPEG_4_0_B = (116 << 16) | 4,
    /// C L R Ls Rs
    MPEG_5_0_D = (120 << 16) | 5,
    /// C L R Ls Rs LFE
    MPEG_5_1_D = (124 << 16) | 6,
    /// C L R Ls Rs Cs LFE
    AAC_6_1 = (142 << 16) | 7,
    /// C Lc Rc L R Ls Rs LFE
    MPEG_7_1_B = (127 << 16) | 8,
}

impl ChannelLayoutTag {
    pub fn from_u32(tag: u32) -> Option<Self> {
        use ChannelLayoutTag::*;

        [
            Mono, Stereo, MPEG_3_0_B, MPEG_4_0_B, MPEG_5_0_D, MPEG_5_1_D, AAC_6_1, MPEG_7_1_B,
        ]
        .into_iter()
        .find(|layout| *layout as u32 == tag)
    }

    /// Default layout for a channel count.
    pub fn for_channel_count(channels: u8) -> Option<Self> {
        use ChannelLayoutTag::*;

        match channels {
            1 => Some(Mono),
            2 => Some(Stereo),
            3 => Some(MPEG_3_0_B),
            4 => Some(MPEG_4_0_B),
            5 => Some(MPEG_5_0_D),
            6 => Some(MPEG_5_1_D),
            7 => Some(AAC_6_1),
            8 => Some(MPEG_7_1_B),
            _ => None,
        }
    }

    pub fn channel_count(self) -> u8 {
        (self as u32 & 0xFFFF) as u8
    }

    /// Equivalent Core Audio layout tag.
    ///
    /// ALAC tags 3-channel C L R with code 113, which Core Audio assigns to
    /// L R C; Core Audio's C L R layout is code 114.
    pub fn core_audio_tag(self) -> u32 {
        match self {
            ChannelLayoutTag::MPEG_3_0_B => (114 << 16) | 3,
            other => other as u32,
        }
    }

    pub fn channel_labels(self) -> &'static [ChannelLabel] {
        use ChannelLabel::*;

        match self {
            ChannelLayoutTag::Mono => &[Center],
            ChannelLayoutTag::Stereo => &[Left, Right],
            ChannelLayoutTag::MPEG_3_0_B => &[Center, Left, Right],
            ChannelLayoutTag::MPEG_4_0_B => &[Center, Left, Right, CenterSurround],
            ChannelLayoutTag::MPEG_5_0_D => {
                &[Center, Left, Right, LeftSurround, RightSurround]
            }
            ChannelLayoutTag::MPEG_5_1_D => &[
                Center,
                Left,
                Right,
                LeftSurround,
                RightSurround,
                LowFrequency,
            ],
            ChannelLayoutTag::AAC_6_1 => &[
                Center,
                Left,
                Right,
                LeftSurround,
                RightSurround,
                CenterSurround,
                LowFrequency,
            ],
            ChannelLayoutTag::MPEG_7_1_B => &[
                Center,
                LeftCenter,
                RightCenter,
                Left,
                Right,
                LeftSurround,
                RightSurround,
                LowFrequency,
            ],
        }
    }
}

impl Display for ChannelLayoutTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChannelLayoutTag::Mono => "Mono",
            ChannelLayoutTag::Stereo => "Stereo",
            ChannelLayoutTag::MPEG_3_0_B => "MPEG 3.0 B",
            ChannelLayoutTag::MPEG_4_0_B => "MPEG 4.0 B",
            ChannelLayoutTag::MPEG_5_0_D => "MPEG 5.0 D",
            ChannelLayoutTag::MPEG_5_1_D => "MPEG 5.1 D",
            ChannelLayoutTag::AAC_6_1 => "AAC 6.1",
            ChannelLayoutTag::MPEG_7_1_B => "MPEG 7.1 B",
        };

        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLabel {
    Left,
    Right,
    Center,
    LowFrequency,
    LeftSurround,
    RightSurround,
    LeftCenter,
    RightCenter,
    CenterSurround,
}

impl ChannelLabel {
    pub fn abbreviation(self) -> &'static str {
        match self {
            ChannelLabel::Left => "L",
            ChannelLabel::Right => "R",
            ChannelLabel::Center => "C",
            ChannelLabel::LowFrequency => "LFE",
            ChannelLabel::LeftSurround => "Ls",
            ChannelLabel::RightSurround => "Rs",
            ChannelLabel::LeftCenter => "Lc",
            ChannelLabel::RightCenter => "Rc",
            ChannelLabel::CenterSurround => "Cs",
        }
    }
}

#[test]
fn test_layout_channel_counts() {
    for channels in 1..=8 {
        let layout = ChannelLayoutTag::for_channel_count(channels).unwrap();
        assert_eq!(layout.channel_count(), channels);
        assert_eq!(layout.channel_labels().len(), channels as usize);
        assert_eq!(ChannelLayoutTag::from_u32(layout as u32), Some(layout));
    }

    assert_eq!(ChannelLayoutTag::for_channel_count(9), None);
    assert_eq!(ChannelLayoutTag::from_u32((114 << 16) | 3), None);
    assert_eq!(ChannelLayoutTag::MPEG_3_0_B.core_audio_tag(), 0x0072_0003);
    assert_eq!(ChannelLayoutTag::Stereo.core_audio_tag(), 0x0065_0002);
}

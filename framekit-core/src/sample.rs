//! Audio sample formats and channel layouts.

/// Storage of one audio sample.
///
/// The `p` variants keep one plane per channel; the others interleave all
/// channels into a single plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    F32,
    F64,
    U8p,
    S16p,
    S32p,
    F32p,
    F64p,
}

impl SampleFormat {
    /// Bytes per sample of one channel.
    pub fn bytes_per_sample(&self) -> usize {
        use SampleFormat::*;
        match self {
            U8 | U8p => 1,
            S16 | S16p => 2,
            S32 | S32p | F32 | F32p => 4,
            F64 | F64p => 8,
        }
    }

    pub fn is_planar(&self) -> bool {
        use SampleFormat::*;
        matches!(self, U8p | S16p | S32p | F32p | F64p)
    }

    /// Number of buffers a frame with `channels` channels is split into.
    pub fn planes(&self, channels: u32) -> usize {
        if self.is_planar() {
            channels as usize
        } else {
            1
        }
    }
}

/// Speaker arrangement of an audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    Mono,
    #[default]
    Stereo,
    Surround51,
    Surround71,
    /// Any other channel count, e.g. ambisonics.
    Custom(u32),
}

impl ChannelLayout {
    pub fn channels(&self) -> u32 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround51 => 6,
            Self::Surround71 => 8,
            Self::Custom(n) => *n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planes_follow_layout() {
        assert_eq!(SampleFormat::F32p.planes(6), 6);
        assert_eq!(SampleFormat::F32.planes(6), 1);
        assert_eq!(SampleFormat::S16p.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::F64.bytes_per_sample(), 8);
    }

    #[test]
    fn test_channel_counts() {
        assert_eq!(ChannelLayout::Surround51.channels(), 6);
        assert_eq!(ChannelLayout::Custom(24).channels(), 24);
        assert_eq!(ChannelLayout::default().channels(), 2);
    }
}

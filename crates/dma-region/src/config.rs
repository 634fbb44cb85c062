use core::ops::Range;

use snafu::ensure;

use crate::error::{
    ConfigError, InvalidDefaultAlignSnafu, NullStartSnafu, WindowOverflowSnafu, ZeroSizeSnafu,
};

/// Construction parameters of a [`Region`](crate::Region).
///
/// The embedding kernel derives the window from its memory layout (devicetree
/// reservations, linker symbols) and hands it over here. The window must not
/// be used by anything else for the lifetime of the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionConfig {
    start: usize,
    size: usize,
    default_align: usize,
}

impl RegionConfig {
    /// Creates a configuration for the window `start..start + size`.
    #[must_use]
    pub const fn new(start: usize, size: usize) -> Self {
        Self {
            start,
            size,
            default_align: 0,
        }
    }

    /// Creates a configuration covering `range`.
    ///
    /// A reversed range yields a zero size, which [`validate`](Self::validate)
    /// rejects.
    #[must_use]
    pub const fn from_range(range: Range<usize>) -> Self {
        Self::new(range.start, range.end.saturating_sub(range.start))
    }

    /// Sets the alignment applied to requests that pass an alignment of zero.
    ///
    /// Zero (the default) means such requests are unconstrained. A nonzero
    /// value inflates every unconstrained search by that many bytes, exactly
    /// like an explicit alignment.
    #[must_use]
    pub const fn with_default_align(mut self, align: usize) -> Self {
        self.default_align = align;
        self
    }

    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn default_align(&self) -> usize {
        self.default_align
    }

    /// Checks the window and alignment settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(self.start != 0, NullStartSnafu);
        ensure!(self.size != 0, ZeroSizeSnafu);
        ensure!(
            self.start.checked_add(self.size).is_some(),
            WindowOverflowSnafu {
                start: self.start,
                size: self.size,
            }
        );
        ensure!(
            self.default_align == 0 || self.default_align.is_power_of_two(),
            InvalidDefaultAlignSnafu {
                align: self.default_align,
            }
        );
        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid() {
        let config = RegionConfig::new(0x1000, 0x1000).with_default_align(4);
        assert!(config.validate().is_ok());
        assert_eq!(config.default_align(), 4);
    }

    #[test]
    fn test_from_range() {
        let config = RegionConfig::from_range(0x2000..0x2100);
        assert_eq!(config.start(), 0x2000);
        assert_eq!(config.size(), 0x100);

        #[expect(clippy::reversed_empty_ranges)]
        let reversed = RegionConfig::from_range(0x2100..0x2000);
        assert!(reversed.validate().unwrap_err().is_zero_size());
    }

    #[test]
    fn test_invalid() {
        assert!(
            RegionConfig::new(0, 0x1000)
                .validate()
                .unwrap_err()
                .is_null_start()
        );
        assert!(
            RegionConfig::new(0x1000, 0)
                .validate()
                .unwrap_err()
                .is_zero_size()
        );
        assert!(
            RegionConfig::new(usize::MAX, 2)
                .validate()
                .unwrap_err()
                .is_window_overflow()
        );
        assert!(
            RegionConfig::new(0x1000, 0x1000)
                .with_default_align(3)
                .validate()
                .unwrap_err()
                .is_invalid_default_align()
        );
    }
}

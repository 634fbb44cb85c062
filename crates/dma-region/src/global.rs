//! Process-wide default region.
//!
//! Drivers that do not get a region injected can fall back to the one the
//! platform installs here at startup. Installing is optional: nothing else in
//! this crate looks at the default region.
//!
//! ```rust,ignore
//! // platform init
//! let config = RegionConfig::new(DMA_START, DMA_SIZE);
//! let region = unsafe { Region::from_physical(config) }?;
//! dma_region::global::install(region)?;
//!
//! // driver
//! let region = dma_region::global::get().expect("DMA region not installed");
//! let desc = region.alloc(16 * 256, 16)?;
//! ```

use log::debug;
use spin::Once;

use crate::{
    error::{AlreadyInstalledSnafu, GlobalError},
    region::Region,
};

static DEFAULT: Once<Region> = Once::new();

/// Installs `region` as the default region.
///
/// Only the first call succeeds; later calls drop their region and fail with
/// [`GlobalError::AlreadyInstalled`].
pub fn install(region: Region) -> Result<&'static Region, GlobalError> {
    let mut installed = false;
    let current = DEFAULT.call_once(|| {
        installed = true;
        region
    });
    if !installed {
        return AlreadyInstalledSnafu {
            start: current.start(),
        }
        .fail();
    }
    debug!(
        "default DMA region installed at {:#x}..{:#x}",
        current.start(),
        current.end()
    );
    Ok(current)
}

/// Returns the default region, if one was installed.
#[must_use]
pub fn get() -> Option<&'static Region> {
    DEFAULT.get()
}

//! Error plumbing shared by the workspace crates.
//!
//! - [`Location`] is captured implicitly by `snafu` context selectors so that
//!   programmer-error variants record where they were raised.
//! - [`Report`] renders an error together with its `source()` chain.
//! - [`fatal`] turns an error into a panic carrying the rendered report. It is
//!   the conventional sink for errors that indicate a broken invariant.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use core::{error::Error, fmt};

use snafu::GenerateImplicitData;

/// Source location captured when an error is constructed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static core::panic::Location<'static>);

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(core::panic::Location::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl Location {
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.0.file()
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.0.line()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Errors that know where they were raised.
///
/// Implemented by error enums whose variants carry a [`Location`], so that
/// [`Report`] can print it without the unstable provider API.
pub trait Located {
    fn location(&self) -> Option<Location>;
}

/// Human readable rendering of an error and its causes.
///
/// ```text
/// Error: invalid DMA handle 0x2040
///   at crates/dma-region/src/region.rs:210:14
///
/// Caused by:
///    0: ...
/// ```
pub struct Report<'a, E> {
    error: &'a E,
    location: Option<Location>,
}

impl<'a, E> Report<'a, E>
where
    E: Error,
{
    #[must_use]
    pub fn new(error: &'a E) -> Self {
        Self {
            error,
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }
}

impl<E> fmt::Debug for Report<'_, E>
where
    E: Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<'_, E>
where
    E: Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.error)?;
        if let Some(loc) = &self.location {
            writeln!(f, "  at {loc}")?;
        }
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {s}")?;
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

/// Aborts the current call chain with a rendered report of `err`.
#[track_caller]
pub fn fatal<E>(err: E) -> !
where
    E: Error + Located,
{
    let report = Report::new(&err).with_location(err.location());
    panic!("critical error occurred\n\n{report}");
}

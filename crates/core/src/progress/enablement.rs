//! Derived control enablement.
//!
//! Pure functions of [`SectionState`], recomputed on demand and never
//! stored, so they can't drift out of sync with the underlying state.

use esusync_domain::{Section, SectionState};

/// Which controls a UI may enable for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub can_import: bool,
    pub can_extract: bool,
    pub can_download: bool,
}

impl Controls {
    /// Derive enablement from the current section state.
    ///
    /// Extraction uses the strict policy: it requires a fully completed
    /// import (`progress == 100`) on top of file availability, and is never
    /// offered for import-only sections.
    pub fn for_section(section: Section, state: &SectionState) -> Self {
        let can_import = !state.running;
        let can_extract = section.supports_extract()
            && !state.extracting
            && !state.running
            && state.file_available
            && state.progress == 100;
        let can_download = state.file_available;
        Self { can_import, can_extract, can_download }
    }
}

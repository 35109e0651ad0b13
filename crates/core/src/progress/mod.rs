//! Pure state-machine pieces: the reducer and derived enablement.

pub mod enablement;
pub mod reducer;

//! The 25-dimensional fingerprint served over HTTP is the same type the
//! core crate computes — no duplicate schema to keep in sync.

pub use auralis_dsp::Fingerprint;

pub mod fingerprint;
pub mod request;

pub use fingerprint::Fingerprint;
pub use request::{FingerprintRequest, FingerprintResponse};

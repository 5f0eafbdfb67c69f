//! Session identity generators.
//!
//! Both profiles are sampled once when a session starts: the browser
//! profile keeps the transport fingerprint stable, the reading profile
//! drives every delay the pacing model produces.

mod browser;
mod reading;

pub use browser::BrowserProfile;
pub use reading::{ReaderKind, ReadingProfile};

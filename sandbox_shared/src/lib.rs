//! `sandbox_shared`
//!
//! Shared libraries used by both client and server.
//!
//! Design goals:
//! - One closed set of wire messages, matched exhaustively on both ends.
//! - Plain data types that serialize to the JSON shapes browser clients expect.
//! - No `unsafe`.

pub mod clock;
pub mod color;
pub mod config;
pub mod math;
pub mod net;
pub mod player;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::clock::*;
    pub use crate::color::*;
    pub use crate::config::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::player::*;
}

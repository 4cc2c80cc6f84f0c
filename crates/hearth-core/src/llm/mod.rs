//! Upstream model server abstractions for Hearth.
//!
//! - `ChatUpstream`: RPITIT trait for the streaming model client
//! - `FrameStream`: the boxed, decoded frame sequence it returns

pub mod upstream;

//! Utility functions and supporting infrastructure.
//!
//! Provides the bounded bit read view and the error types shared by the
//! configuration parser and the frame decoder.

pub mod bitstream_io;
pub mod errors;

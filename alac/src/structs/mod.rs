//! Data structures representing ALAC format components.
//!
//! Contains the magic cookie configuration, channel layouts and the headers
//! of the elements that make up a compressed frame.

pub mod channel;
pub mod config;
pub mod element;

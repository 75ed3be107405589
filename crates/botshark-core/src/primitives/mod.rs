//! Checksum and cipher primitives shared by the dissectors.
//!
//! Everything here is a pure function over byte slices: working state (the
//! RC4 permutation, the rotating XOR key) is created per call and never
//! shared, so any number of messages can be processed concurrently.

pub mod checksum;
pub mod cipher;

pub use checksum::{crc16, crc32, crc32_parts};
pub use cipher::{CipherError, rc4, rotating_xor};

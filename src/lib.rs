//! # UTK: the Maxis MicroTalk speech codec
//!
//! A from-scratch implementation of MicroTalk (UTK/UTalk), the CELP-style
//! speech codec Maxis and EA shipped across a generation of games. This
//! crate decodes legacy compressed audio into 16-bit PCM WAVE, and encodes
//! mono 16-bit PCM WAVE into a UTK bitstream, at either of the codec's two
//! native compression ratios.
//!
//! ## Layout
//!
//! The codec kernel is container-agnostic: [`bits`] provides the LSB-first
//! bit I/O every format shares, [`lpc`] and [`innovation`] implement the
//! linear-prediction and excitation transforms, and [`decoder`]/[`encoder`]
//! drive one 432-sample frame at a time. [`stream`] wraps those in a
//! pull/push interface for streaming I/O, and [`containers`] holds the
//! format-specific front ends: Maxis `UTM0`, EA's `SCHl/SCCl/SCDl/SCEl`
//! chunked wrapper, and the Beasts & Bumpkins `PT` variant.
//!
//! ## Example
//!
//! ```no_run
//! use std::fs::File;
//! use utk::containers::utm0;
//!
//! let mut input = File::open("voice.utk")?;
//! let mut output = File::create("voice.wav")?;
//! utm0::decode(&mut input, &mut output)?;
//! # Ok::<(), utk::error::UtkError>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bits;
pub mod cli;
pub mod containers;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod innovation;
pub mod lpc;
pub mod pitch;
pub mod stream;
pub mod tables;
pub mod types;

pub use error::{Result, UtkError};

/// Crate version, as set in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a process-wide tracing subscriber reading `RUST_LOG` (or `info`
/// if unset). Safe to call more than once; only the first call takes
/// effect. CLI binaries call this once at startup; library consumers that
/// already manage their own subscriber don't need to call it at all.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .try_init();
}

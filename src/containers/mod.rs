//! Container readers/writers that locate the compressed bitstream inside a
//! file format and hand it to the codec core (§1, §6). These are the
//! "external collaborators" around the codec kernel: each format differs
//! only in its chunk/header parsing, never in the codec itself.

pub mod bnb;
pub mod chunk;
pub mod ea;
pub mod utm0;
pub mod wave;

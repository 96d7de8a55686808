//! World Module
//!
//! Voxel level content and its transfer encoding.
//!
//! ## Pipeline
//! ```text
//!  WorldGrid ──flatten──► bytes ──gzip──► compressed ──split──► frames
//!  (X, Y, Z)              (X outer)        (one shot)            (1024 B each)
//! ```
//!
//! The whole level is compressed and framed before the first frame goes out.

mod grid;
mod serializer;

pub use grid::{block, Dimensions, WorldGrid, MAX_VOLUME};
pub use serializer::{percent_complete, split_frames, SerializedLevel, TransferFrame, WorldSerializer};

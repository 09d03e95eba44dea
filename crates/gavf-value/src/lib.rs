//! Dynamic value model for the GAVF media container.
//!
//! This crate provides the data model that the rest of the GAVF stack is
//! built on: a tagged [`Value`] union, an insertion-ordered [`Dictionary`],
//! an [`Array`] with splice-based mutation, a growable [`Buffer`] with
//! trailing padding, and the fixed-layout [`AudioFormat`] / [`VideoFormat`]
//! descriptors that serialize to and from dictionaries.
//!
//! Values own their contents exclusively; copies are always deep and moves
//! leave the source in the undefined state. There is no reference counting
//! and no cycles.

mod array;
mod audio_format;
mod buffer;
mod dictionary;
mod error;
mod value;
mod video_format;

pub use array::Array;
pub use audio_format::{
    AudioFormat, ChannelId, InterleaveMode, SampleFormat, MAX_CHANNELS,
};
pub use buffer::Buffer;
pub use dictionary::Dictionary;
pub use error::{AllocError, Error, Result};
pub use value::{Value, ValueType};
pub use video_format::{
    ChromaPlacement, FramerateMode, InterlaceMode, PixelFormat, TimecodeFormat, VideoFormat,
};

//! Instance buffer for packed chunk quads.
//!
//! Every chunk owns a fixed slot of the shared buffer; the renderer draws
//! `quad_count` instances starting at the chunk's `quad_offset`.

mod buffer;

pub use buffer::{InstanceBuffer, QuadSink};

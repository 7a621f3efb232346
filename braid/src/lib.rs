// SPDX-License-Identifier: Apache-2.0

//! ## How it works
//!
//! Data is written to and read from reusable 8 KiB blocks of memory called
//! *segments*. A [`Buffer`] is an ordered queue of segments: bytes are
//! appended at the tail and consumed from the head, and consumed segments
//! return to a per-thread-bucket *pool* to be claimed again. Segment blocks
//! are reference-counted, so buffers, snapshots and substrings share bytes
//! instead of copying them; a shared block is read-only until every alias is
//! gone.
//!
//! A [`SinkQueue`] turns a buffer into an asynchronous pipeline: producers
//! keep writing while a background emitter thread drains completed segments
//! into a [`Sink`], with backpressure once too many bytes are queued and a
//! flush barrier that waits until the sink has seen every prior byte.
//!
//! [`ByteString`] is an immutable, segmented view with in-place UTF-8
//! decoding, zero-copy substrings and Base64/hex codecs. The [`cancel`]
//! module scopes deadlines and timeouts over every blocking operation.
//!
//! [`Sink`]: streams::Sink

mod buffer;
mod byte_str;
pub mod cancel;
mod error;
pub mod pool;
mod segment;
mod sink_queue;
pub mod streams;

pub use buffer::Buffer;
pub use byte_str::{ByteString, CodePoints};
pub use error::{Error, ErrorKind, Result};
pub use segment::{Segment, SIZE as SEGMENT_SIZE};
pub use sink_queue::{SinkQueue, DEFAULT_MAX_BYTE_SIZE};

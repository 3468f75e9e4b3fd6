//! Contentsieve Container
//!
//! Ogg demultiplexing and re-multiplexing for the sanitizer. Pages are
//! checked for framing, split into packets, and every packet is run
//! through the codec filter of its logical stream. Only surviving packets
//! are written back out, into freshly checksummed pages.
//!
//! # Layout
//!
//! - [`page`] - page grammar, lacing and pagination
//! - [`crc`] - the Ogg page checksum
//! - [`bitstream`] - the sticky per-stream filter
//! - [`filter`] - the whole-container driver and its report
//!
//! # Example
//!
//! ```
//! use contentsieve_container::OggFilter;
//! use contentsieve_core::FilterError;
//!
//! let filter = OggFilter::default();
//! let mut output = Vec::new();
//! // A container with no pages has no primary stream to accept.
//! let err = filter.filter(&[], &mut output).unwrap_err();
//! assert!(matches!(err, FilterError::NoValidStreams));
//! assert!(output.is_empty());
//! ```

pub mod bitstream;
pub mod crc;
pub mod filter;
pub mod page;

pub use bitstream::{OggBitstreamFilter, SanitizedPage};
pub use filter::{FilterReport, OggFilter};
pub use page::{paginate, OggPage, PageTemplate, Segment};

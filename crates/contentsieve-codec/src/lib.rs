//! Contentsieve Codec
//!
//! Structural packet filters for the codecs that may be carried inside an
//! Ogg container. A filter sees one logical stream's packets in order and,
//! for each packet, accepts it (possibly rewritten), drops it, or rejects
//! the whole stream.
//!
//! # Example
//!
//! ```
//! use contentsieve_codec::{CodecKind, CodecPacket};
//!
//! assert_eq!(CodecKind::identify(b"\x80theora\x03\x02\x01"), Some(CodecKind::Theora));
//!
//! let mut filter = CodecKind::Vorbis.create_filter(true);
//! // Header packets must come first; anything else ends the stream.
//! assert!(filter.parse(CodecPacket::new(vec![0x00, 0x01])).is_err());
//! ```

pub mod bits;
pub mod packet;
pub mod registry;
pub mod theora;
pub mod vorbis;

#[cfg(test)]
pub(crate) mod testutil;

pub use packet::{CodecPacket, CodecPacketFilter};
pub use registry::{filter_for, CodecKind};
pub use theora::TheoraPacketFilter;
pub use vorbis::VorbisPacketFilter;

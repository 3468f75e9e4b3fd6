//! Codec identification and filter construction.
//!
//! A logical stream's codec is decided by the first packet on its BOS
//! page. Only codecs listed here can ever produce output.

use crate::packet::CodecPacketFilter;
use crate::theora::{is_theora_identification, TheoraPacketFilter};
use crate::vorbis::{is_vorbis_identification, VorbisPacketFilter};
use contentsieve_config::ContainerConfig;
use std::fmt;

/// Codecs with a packet filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Theora,
    Vorbis,
}

impl CodecKind {
    /// Every supported codec.
    pub const ALL: [CodecKind; 2] = [CodecKind::Theora, CodecKind::Vorbis];

    /// Identify the codec of a stream from its first packet.
    pub fn identify(first_packet: &[u8]) -> Option<Self> {
        if is_theora_identification(first_packet) {
            Some(CodecKind::Theora)
        } else if is_vorbis_identification(first_packet) {
            Some(CodecKind::Vorbis)
        } else {
            None
        }
    }

    /// Lowercase codec name as used in configuration.
    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Theora => "theora",
            CodecKind::Vorbis => "vorbis",
        }
    }

    /// Build a fresh filter for one stream of this codec.
    pub fn create_filter(self, strip_comments: bool) -> Box<dyn CodecPacketFilter> {
        match self {
            CodecKind::Theora => {
                let filter = TheoraPacketFilter::new();
                Box::new(if strip_comments { filter } else { filter.keep_comments() })
            }
            CodecKind::Vorbis => {
                let filter = VorbisPacketFilter::new();
                Box::new(if strip_comments { filter } else { filter.keep_comments() })
            }
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identify the codec of `first_packet` and build its filter, provided the
/// codec is enabled in `config`.
pub fn filter_for(
    first_packet: &[u8],
    config: &ContainerConfig,
) -> Option<(CodecKind, Box<dyn CodecPacketFilter>)> {
    let kind = CodecKind::identify(first_packet)?;
    if !config.codec_enabled(kind.name()) {
        return None;
    }
    Some((kind, kind.create_filter(config.strip_comments)))
}

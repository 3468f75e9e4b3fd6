//! Container filter configuration.
//!
//! This module contains the `ContainerConfig` struct which bounds the
//! resources a single container may consume and selects the codec
//! filters that are allowed to run.

use serde::{Deserialize, Serialize};

/// Default upper bound for a reassembled packet (16 MiB).
pub const DEFAULT_MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Container filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    /// Largest packet, in bytes, that may be reassembled across pages.
    /// A stream exceeding it is invalidated.
    /// Default: 16 MiB
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,

    /// Names of the codec filters that may be instantiated.
    /// Streams of any other codec are discarded.
    /// Default: ["theora", "vorbis"]
    #[serde(default = "default_codecs")]
    pub codecs: Vec<String>,

    /// Rewrite validated comment headers to empty ones.
    /// Default: true
    #[serde(default = "default_true")]
    pub strip_comments: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            codecs: default_codecs(),
            strip_comments: true,
        }
    }
}

impl ContainerConfig {
    /// Merge another ContainerConfig into this one.
    ///
    /// All fields are copied from `other`, like the other sections.
    pub fn merge(&mut self, other: &ContainerConfig) {
        self.max_packet_size = other.max_packet_size;
        self.codecs = other.codecs.clone();
        self.strip_comments = other.strip_comments;
    }

    /// Whether the codec with this name may be instantiated.
    ///
    /// Names are compared case-insensitively.
    pub fn codec_enabled(&self, name: &str) -> bool {
        self.codecs.iter().any(|c| c.eq_ignore_ascii_case(name))
    }
}

fn default_true() -> bool {
    true
}

fn default_max_packet_size() -> usize {
    DEFAULT_MAX_PACKET_SIZE
}

fn default_codecs() -> Vec<String> {
    vec!["theora".to_string(), "vorbis".to_string()]
}

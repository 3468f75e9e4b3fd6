//! Codec packets and the packet filter contract.

use contentsieve_core::Result;

/// One codec packet: an opaque payload whose grammar only the matching
/// [`CodecPacketFilter`] understands.
///
/// `index` is the position of the packet within its logical stream,
/// counted from the first packet of the stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodecPacket {
    payload: Vec<u8>,
    index: u64,
}

impl CodecPacket {
    /// Create a packet at position 0.
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload, index: 0 }
    }

    /// Create a packet at a given position in its stream.
    pub fn with_index(payload: Vec<u8>, index: u64) -> Self {
        Self { payload, index }
    }

    /// The raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the packet, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Position of this packet within its logical stream.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Replace the payload, keeping the position.
    pub fn rewritten(&self, payload: Vec<u8>) -> Self {
        Self {
            payload,
            index: self.index,
        }
    }
}

/// Structural validator for the packets of one logical stream.
///
/// Implementations keep whatever sequencing state their codec needs
/// (typically the header packet order), so one instance belongs to exactly
/// one stream and packets must be fed in stream order.
///
/// # Returns
/// - `Ok(Some(packet))`: the packet is valid; it may be a rewritten copy
/// - `Ok(None)`: the packet is malformed and must be dropped
/// - `Err(_)`: the stream can no longer be trusted (for example a bad
///   header); the caller invalidates the whole stream
pub trait CodecPacketFilter: Send {
    /// Codec name for identification and logging.
    fn name(&self) -> &str;

    /// Validate one packet.
    fn parse(&mut self, packet: CodecPacket) -> Result<Option<CodecPacket>>;

    /// Whether every header packet has been seen and accepted.
    fn headers_complete(&self) -> bool;
}

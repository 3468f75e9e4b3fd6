//! Theora packet filter.
//!
//! Validates the three Theora header packets against the Theora I
//! bitstream grammar and passes frame packets through once the headers are
//! established. Any failure while a header is expected is fatal
//! for the stream; a bad frame packet is only dropped.
//!
//! Unless comments are kept, the comment header is replaced by an empty
//! one, so vendor strings and user comments never reach the output.

use crate::bits::{ilog, BitReader};
use crate::packet::{CodecPacket, CodecPacketFilter};
use contentsieve_core::{FilterError, Result};
use log::{debug, trace};

/// Magic number following the header type byte of every header packet.
pub const THEORA_MAGIC: &[u8; 6] = b"theora";

const IDENTIFICATION_TYPE: u8 = 0x80;
const COMMENT_TYPE: u8 = 0x81;
const SETUP_TYPE: u8 = 0x82;

/// Longest vendor string echoed to the log.
const MAX_COMMENT_LENGTH: usize = 256;

/// Number of Huffman tables in a setup header.
const HUFFMAN_TABLES: usize = 80;

/// Which packet the stream must present next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expected {
    Identification,
    Comment,
    Setup,
    Frame,
}

/// Packet filter for one Theora logical stream.
#[derive(Debug)]
pub struct TheoraPacketFilter {
    expected: Expected,
    strip_comments: bool,
}

impl Default for TheoraPacketFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TheoraPacketFilter {
    /// Create a filter expecting the identification header.
    pub fn new() -> Self {
        Self {
            expected: Expected::Identification,
            strip_comments: true,
        }
    }

    /// Keep validated comment headers instead of emptying them.
    pub fn keep_comments(mut self) -> Self {
        self.strip_comments = false;
        self
    }

    fn parse_identification_header(&mut self, input: &mut BitReader<'_>) -> Result<()> {
        trace!("theora: IDENTIFICATION_HEADER");
        check_magic_header(input, IDENTIFICATION_TYPE)?;

        let vmaj = input.read_msb(8)?;
        if vmaj != 3 {
            return Err(FilterError::unknown_content(format!("Header VMAJ: {}", vmaj)));
        }
        let vmin = input.read_msb(8)?;
        if vmin != 2 {
            return Err(FilterError::unknown_content(format!("Header VMIN: {}", vmin)));
        }
        let vrev = input.read_msb(8)?;
        if vrev > 1 {
            return Err(FilterError::unknown_content(format!("Header VREV: {}", vrev)));
        }

        let fmbw = input.read_msb(16)?;
        if fmbw == 0 {
            return Err(FilterError::unknown_content("Header FMBW: 0"));
        }
        let fmbh = input.read_msb(16)?;
        if fmbh == 0 {
            return Err(FilterError::unknown_content("Header FMBH: 0"));
        }
        let frame_width = fmbw * 16;
        let frame_height = fmbh * 16;

        let picw = input.read_msb(24)?;
        if picw > frame_width {
            return Err(FilterError::unknown_content(format!(
                "Header PICW: {}; FMBW: {}",
                picw, fmbw
            )));
        }
        let pich = input.read_msb(24)?;
        if pich > frame_height {
            return Err(FilterError::unknown_content(format!(
                "Header PICH: {}; FMBH: {}",
                pich, fmbh
            )));
        }
        let picx = input.read_msb(8)?;
        if picx > frame_width - picw {
            return Err(FilterError::unknown_content(format!(
                "Header PICX: {}; PICW: {}; FMBW: {}",
                picx, picw, fmbw
            )));
        }
        let picy = input.read_msb(8)?;
        if picy > frame_height - pich {
            return Err(FilterError::unknown_content(format!(
                "Header PICY: {}; PICH: {}; FMBH: {}",
                picy, pich, fmbh
            )));
        }

        let frn = input.read_msb(32)?;
        if frn == 0 {
            return Err(FilterError::unknown_content("Header FRN: 0"));
        }
        let frd = input.read_msb(32)?;
        if frd == 0 {
            return Err(FilterError::unknown_content("Header FRD: 0"));
        }

        input.skip(48)?; // PARN and PARD

        let cs = input.read_msb(8)?;
        if cs > 2 {
            return Err(FilterError::unknown_content(format!("Header CS: {}", cs)));
        }

        input.skip(35)?; // NOMBR, QUAL and KFGSHIFT

        let pf = input.read_msb(2)?;
        if pf == 1 {
            return Err(FilterError::unknown_content("Header PF: 1"));
        }
        let res = input.read_msb(3)?;
        if res != 0 {
            return Err(FilterError::unknown_content(format!("Header Res: {}", res)));
        }

        debug!(
            "theora: {}x{} picture in {}x{} frame at {}/{} fps",
            picw, pich, frame_width, frame_height, frn, frd
        );
        self.expected = Expected::Comment;
        Ok(())
    }

    fn parse_comment_header(
        &mut self,
        input: &mut BitReader<'_>,
        packet: &CodecPacket,
    ) -> Result<CodecPacket> {
        trace!("theora: COMMENT_HEADER");
        check_magic_header(input, COMMENT_TYPE)?;

        let vendor_length = input.read_u32_le()? as usize;
        let vendor = input.read_bytes(vendor_length)?;
        let shown = &vendor[..vendor.len().min(MAX_COMMENT_LENGTH)];
        debug!("theora: vendor string is {:?}", String::from_utf8_lossy(shown));

        let comments = input.read_u32_le()?;
        for _ in 0..comments {
            let length = input.read_u32_le()? as usize;
            input.read_bytes(length)?;
        }
        if !input.is_at_end() {
            trace!("theora: COMMENT_HEADER contains redundant bits");
        }

        self.expected = Expected::Setup;
        if !self.strip_comments {
            return Ok(packet.clone());
        }

        let mut stripped = Vec::with_capacity(1 + THEORA_MAGIC.len() + 8);
        stripped.push(COMMENT_TYPE);
        stripped.extend_from_slice(THEORA_MAGIC);
        stripped.extend_from_slice(&0u32.to_le_bytes());
        stripped.extend_from_slice(&0u32.to_le_bytes());
        Ok(packet.rewritten(stripped))
    }

    fn parse_setup_header(&mut self, input: &mut BitReader<'_>) -> Result<()> {
        trace!("theora: SETUP_HEADER");
        check_magic_header(input, SETUP_TYPE)?;

        // Loop filter limits
        let nbits = input.read_msb(3)?;
        input.skip(64 * u64::from(nbits))?;

        // AC scale factors
        let nbits = input.read_msb(4)? + 1;
        input.skip(64 * u64::from(nbits))?;

        // DC scale factors
        let nbits = input.read_msb(4)? + 1;
        input.skip(64 * u64::from(nbits))?;

        let nbms = i64::from(input.read_msb(9)?) + 1;
        if nbms > 384 {
            return Err(FilterError::unknown_content(format!(
                "SETUP HEADER - NBMS: {} (MUST be no greater than 384)",
                nbms
            )));
        }
        // Base matrices, 64 eight-bit values each
        input.skip(nbms as u64 * 64 * 8)?;

        for qti in 0..2 {
            for pli in 0..3 {
                let newqr = if qti > 0 || pli > 0 {
                    input.read_bit_msb()?
                } else {
                    true
                };

                if !newqr {
                    // Copy of an earlier range; only the selector bit is coded.
                    if qti > 0 {
                        input.read_msb(1)?;
                    }
                    continue;
                }

                read_base_matrix_index(input, nbms)?;
                let mut qi: i64 = 0;
                loop {
                    let size = i64::from(input.read_msb(ilog(62 - qi))?) + 1;
                    qi += size;
                    read_base_matrix_index(input, nbms)?;
                    if qi < 63 {
                        continue;
                    }
                    if qi > 63 {
                        return Err(FilterError::unknown_content(format!(
                            "qi = {}; qi > 63 - The stream is undecodable.",
                            qi
                        )));
                    }
                    break;
                }
            }
        }

        for _ in 0..HUFFMAN_TABLES {
            let mut tokens = 0;
            read_huffman_tree(input, 0, &mut tokens)?;
        }

        if !input.is_at_end() {
            trace!("theora: SETUP_HEADER contains redundant bits");
        }

        self.expected = Expected::Frame;
        Ok(())
    }

    fn check_frame(packet: &CodecPacket) -> bool {
        match packet.payload().first() {
            // Zero-length packets repeat the previous frame.
            None => true,
            Some(byte) => byte & 0x80 == 0,
        }
    }
}

impl CodecPacketFilter for TheoraPacketFilter {
    fn name(&self) -> &str {
        "theora"
    }

    fn parse(&mut self, packet: CodecPacket) -> Result<Option<CodecPacket>> {
        let mut input = BitReader::new(packet.payload());
        let result = match self.expected {
            Expected::Identification => self
                .parse_identification_header(&mut input)
                .map(|_| Some(packet.clone())),
            Expected::Comment => self.parse_comment_header(&mut input, &packet).map(Some),
            Expected::Setup => self.parse_setup_header(&mut input).map(|_| Some(packet.clone())),
            Expected::Frame => {
                if Self::check_frame(&packet) {
                    Ok(Some(packet))
                } else {
                    debug!("theora: dropping non-frame packet after headers");
                    Ok(None)
                }
            }
        };

        if let Err(ref e) = result {
            debug!("theora: header rejected: {}", e);
        }
        result
    }

    fn headers_complete(&self) -> bool {
        self.expected == Expected::Frame
    }
}

/// Whether a payload starts like a Theora identification header.
pub fn is_theora_identification(payload: &[u8]) -> bool {
    payload.len() > THEORA_MAGIC.len()
        && payload[0] == IDENTIFICATION_TYPE
        && &payload[1..=THEORA_MAGIC.len()] == THEORA_MAGIC
}

fn check_magic_header(input: &mut BitReader<'_>, expected_type: u8) -> Result<()> {
    let header = input.read_bytes(1 + THEORA_MAGIC.len())?;
    if header[0] != expected_type {
        return Err(FilterError::unknown_content(format!(
            "Header type: {:#04x}, expected: {:#04x}",
            header[0], expected_type
        )));
    }
    if &header[1..] != THEORA_MAGIC {
        return Err(FilterError::unknown_content("Packet header magic number mismatch"));
    }
    Ok(())
}

fn read_base_matrix_index(input: &mut BitReader<'_>, nbms: i64) -> Result<()> {
    let index = i64::from(input.read_msb(ilog(nbms - 1))?);
    if index >= nbms {
        return Err(FilterError::unknown_content(format!(
            "QRBMIS = {} >= NBMS = {} - The stream is undecodable.",
            index, nbms
        )));
    }
    Ok(())
}

/// Walk one Huffman tree, counting its leaves.
///
/// Codes are limited to 32 bits and a table holds at most 32 tokens.
fn read_huffman_tree(input: &mut BitReader<'_>, depth: u32, tokens: &mut u32) -> Result<()> {
    if depth > 32 {
        return Err(FilterError::unknown_content(
            "HBITS is longer than 32 bits in length - The stream is undecodable.",
        ));
    }

    if input.read_bit_msb()? {
        if *tokens == 32 {
            return Err(FilterError::unknown_content(
                "Huffman table already holds 32 tokens - The stream is undecodable.",
            ));
        }
        input.read_msb(5)?;
        *tokens += 1;
    } else {
        read_huffman_tree(input, depth + 1, tokens)?;
        read_huffman_tree(input, depth + 1, tokens)?;
    }
    Ok(())
}

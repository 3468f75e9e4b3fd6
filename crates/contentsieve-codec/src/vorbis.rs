//! Vorbis packet filter.
//!
//! Checks the identification, comment and setup headers against the
//! Vorbis I bitstream grammar, then admits audio packets whose mode number
//! refers to a configured mode. Header errors are fatal for the stream.

use crate::bits::{ilog, BitReader};
use crate::packet::{CodecPacket, CodecPacketFilter};
use contentsieve_core::{FilterError, Result};
use log::{debug, trace};

/// Magic number following the header type byte of every header packet.
pub const VORBIS_MAGIC: &[u8; 6] = b"vorbis";

const IDENTIFICATION_TYPE: u8 = 0x01;
const COMMENT_TYPE: u8 = 0x03;
const SETUP_TYPE: u8 = 0x05;

const IDENTIFICATION_LENGTH: usize = 30;
const CODEBOOK_SYNC: u32 = 0x0056_4342;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expected {
    Identification,
    Comment,
    Setup,
    Audio,
}

/// Packet filter for one Vorbis logical stream.
#[derive(Debug)]
pub struct VorbisPacketFilter {
    expected: Expected,
    strip_comments: bool,
    channels: u32,
    mode_count: u32,
}

impl Default for VorbisPacketFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl VorbisPacketFilter {
    /// Create a filter expecting the identification header.
    pub fn new() -> Self {
        Self {
            expected: Expected::Identification,
            strip_comments: true,
            channels: 0,
            mode_count: 0,
        }
    }

    /// Keep validated comment headers instead of emptying them.
    pub fn keep_comments(mut self) -> Self {
        self.strip_comments = false;
        self
    }

    fn parse_identification_header(&mut self, payload: &[u8]) -> Result<()> {
        trace!("vorbis: IDENTIFICATION_HEADER");
        if payload.len() != IDENTIFICATION_LENGTH {
            return Err(FilterError::unknown_content(format!(
                "identification header is {} bytes, expected {}",
                payload.len(),
                IDENTIFICATION_LENGTH
            )));
        }
        let mut input = BitReader::new(payload);
        check_magic_header(&mut input, IDENTIFICATION_TYPE)?;

        let version = input.read_u32_le()?;
        if version != 0 {
            return Err(FilterError::unknown_content(format!("vorbis_version: {}", version)));
        }
        let channels = input.read_lsb(8)?;
        if channels == 0 {
            return Err(FilterError::unknown_content("audio_channels: 0"));
        }
        let rate = input.read_u32_le()?;
        if rate == 0 {
            return Err(FilterError::unknown_content("audio_sample_rate: 0"));
        }
        input.skip(3 * 32)?; // bitrate maximum, nominal and minimum

        let blocksize_0 = input.read_lsb(4)?;
        let blocksize_1 = input.read_lsb(4)?;
        if !(6..=13).contains(&blocksize_0)
            || !(6..=13).contains(&blocksize_1)
            || blocksize_0 > blocksize_1
        {
            return Err(FilterError::unknown_content(format!(
                "blocksize exponents: {} / {}",
                blocksize_0, blocksize_1
            )));
        }
        if !input.read_bit_lsb()? {
            return Err(FilterError::unknown_content("identification framing bit not set"));
        }

        debug!("vorbis: {} channels at {} Hz", channels, rate);
        self.channels = channels;
        self.expected = Expected::Comment;
        Ok(())
    }

    fn parse_comment_header(&mut self, packet: &CodecPacket) -> Result<CodecPacket> {
        trace!("vorbis: COMMENT_HEADER");
        let mut input = BitReader::new(packet.payload());
        check_magic_header(&mut input, COMMENT_TYPE)?;

        let vendor_length = input.read_u32_le()? as usize;
        input.read_bytes(vendor_length)?;
        let comments = input.read_u32_le()?;
        for _ in 0..comments {
            let length = input.read_u32_le()? as usize;
            input.read_bytes(length)?;
        }
        if !input.read_bit_lsb()? {
            return Err(FilterError::unknown_content("comment framing bit not set"));
        }

        self.expected = Expected::Setup;
        if !self.strip_comments {
            return Ok(packet.clone());
        }

        let mut stripped = Vec::with_capacity(1 + VORBIS_MAGIC.len() + 9);
        stripped.push(COMMENT_TYPE);
        stripped.extend_from_slice(VORBIS_MAGIC);
        stripped.extend_from_slice(&0u32.to_le_bytes());
        stripped.extend_from_slice(&0u32.to_le_bytes());
        stripped.push(0x01);
        Ok(packet.rewritten(stripped))
    }

    fn parse_setup_header(&mut self, payload: &[u8]) -> Result<()> {
        trace!("vorbis: SETUP_HEADER");
        let mut input = BitReader::new(payload);
        check_magic_header(&mut input, SETUP_TYPE)?;

        let codebooks = input.read_lsb(8)? + 1;
        for _ in 0..codebooks {
            read_codebook(&mut input)?;
        }

        let time_count = input.read_lsb(6)? + 1;
        for _ in 0..time_count {
            if input.read_lsb(16)? != 0 {
                return Err(FilterError::unknown_content("nonzero time domain transform"));
            }
        }

        let floor_count = input.read_lsb(6)? + 1;
        for _ in 0..floor_count {
            match input.read_lsb(16)? {
                0 => read_floor0(&mut input, codebooks)?,
                1 => read_floor1(&mut input, codebooks)?,
                other => {
                    return Err(FilterError::unknown_content(format!("floor type {}", other)))
                }
            }
        }

        let residue_count = input.read_lsb(6)? + 1;
        for _ in 0..residue_count {
            read_residue(&mut input, codebooks)?;
        }

        let mapping_count = input.read_lsb(6)? + 1;
        for _ in 0..mapping_count {
            read_mapping(&mut input, self.channels, floor_count, residue_count)?;
        }

        let mode_count = input.read_lsb(6)? + 1;
        for _ in 0..mode_count {
            input.read_lsb(1)?; // blockflag
            let window_type = input.read_lsb(16)?;
            let transform_type = input.read_lsb(16)?;
            let mapping = input.read_lsb(8)?;
            if window_type != 0 || transform_type != 0 || mapping >= mapping_count {
                return Err(FilterError::unknown_content("invalid mode configuration"));
            }
        }

        if !input.read_bit_lsb()? {
            return Err(FilterError::unknown_content("setup framing bit not set"));
        }

        debug!(
            "vorbis: {} codebooks, {} floors, {} residues, {} mappings, {} modes",
            codebooks, floor_count, residue_count, mapping_count, mode_count
        );
        self.mode_count = mode_count;
        self.expected = Expected::Audio;
        Ok(())
    }

    fn check_audio(&self, packet: &CodecPacket) -> bool {
        if packet.is_empty() {
            return true;
        }
        let mut input = BitReader::new(packet.payload());
        match input.read_bit_lsb() {
            Ok(false) => {}
            _ => return false,
        }
        match input.read_lsb(ilog(i64::from(self.mode_count) - 1)) {
            Ok(mode) => mode < self.mode_count,
            Err(_) => false,
        }
    }
}

impl CodecPacketFilter for VorbisPacketFilter {
    fn name(&self) -> &str {
        "vorbis"
    }

    fn parse(&mut self, packet: CodecPacket) -> Result<Option<CodecPacket>> {
        let result = match self.expected {
            Expected::Identification => self.parse_identification_header(packet.payload()),
            Expected::Comment => return self.parse_comment_header(&packet).map(Some),
            Expected::Setup => self.parse_setup_header(packet.payload()),
            Expected::Audio => {
                if self.check_audio(&packet) {
                    return Ok(Some(packet));
                }
                debug!("vorbis: dropping malformed audio packet {}", packet.index());
                return Ok(None);
            }
        };
        result.map(|_| Some(packet))
    }

    fn headers_complete(&self) -> bool {
        self.expected == Expected::Audio
    }
}

/// Whether a payload starts like a Vorbis identification header.
pub fn is_vorbis_identification(payload: &[u8]) -> bool {
    payload.len() > VORBIS_MAGIC.len()
        && payload[0] == IDENTIFICATION_TYPE
        && &payload[1..=VORBIS_MAGIC.len()] == VORBIS_MAGIC
}

fn check_magic_header(input: &mut BitReader<'_>, expected_type: u8) -> Result<()> {
    let header = input.read_bytes(1 + VORBIS_MAGIC.len())?;
    if header[0] != expected_type || &header[1..] != VORBIS_MAGIC {
        return Err(FilterError::unknown_content(format!(
            "Header type: {:#04x}, expected: {:#04x}",
            header[0], expected_type
        )));
    }
    Ok(())
}

fn read_book_index(input: &mut BitReader<'_>, codebooks: u32) -> Result<u32> {
    let book = input.read_lsb(8)?;
    if book >= codebooks {
        return Err(FilterError::unknown_content(format!(
            "codebook {} out of range ({} defined)",
            book, codebooks
        )));
    }
    Ok(book)
}

fn read_codebook(input: &mut BitReader<'_>) -> Result<()> {
    if input.read_lsb(24)? != CODEBOOK_SYNC {
        return Err(FilterError::unknown_content("codebook sync pattern mismatch"));
    }
    let dimensions = input.read_lsb(16)?;
    let entries = input.read_lsb(24)?;

    let ordered = input.read_bit_lsb()?;
    if !ordered {
        let sparse = input.read_bit_lsb()?;
        for _ in 0..entries {
            if !sparse || input.read_bit_lsb()? {
                input.read_lsb(5)?;
            }
        }
    } else {
        let mut current_entry: u32 = 0;
        let mut current_length = input.read_lsb(5)? + 1;
        while current_entry < entries {
            let number = input.read_lsb(ilog(i64::from(entries - current_entry)))?;
            current_entry = current_entry
                .checked_add(number)
                .filter(|&n| n <= entries)
                .ok_or_else(|| FilterError::unknown_content("ordered codebook overflows"))?;
            current_length += 1;
            if current_length > 33 {
                return Err(FilterError::unknown_content("codeword length exceeds 32"));
            }
        }
    }

    match input.read_lsb(4)? {
        0 => {}
        lookup_type @ (1 | 2) => {
            input.skip(64)?; // minimum and delta values
            let value_bits = u64::from(input.read_lsb(4)? + 1);
            input.read_lsb(1)?; // sequence_p
            let values = if lookup_type == 1 {
                lookup1_values(entries, dimensions)
            } else {
                u64::from(entries) * u64::from(dimensions)
            };
            let bits = values
                .checked_mul(value_bits)
                .ok_or_else(|| FilterError::malformed("lookup table size overflows"))?;
            input.skip(bits)?;
        }
        other => {
            return Err(FilterError::unknown_content(format!("codebook lookup type {}", other)))
        }
    }
    Ok(())
}

/// Largest integer `r` such that `r.pow(dimensions) <= entries`.
fn lookup1_values(entries: u32, dimensions: u32) -> u64 {
    if dimensions == 0 {
        return 0;
    }
    let entries = u64::from(entries);
    let fits = |r: u64| -> bool {
        let mut acc: u64 = 1;
        for _ in 0..dimensions {
            acc = match acc.checked_mul(r) {
                Some(v) if v <= entries => v,
                _ => return false,
            };
        }
        true
    };
    let mut r = (entries as f64).powf(1.0 / f64::from(dimensions)).floor() as u64;
    while r > 0 && !fits(r) {
        r -= 1;
    }
    while fits(r + 1) {
        r += 1;
    }
    r
}

fn read_floor0(input: &mut BitReader<'_>, codebooks: u32) -> Result<()> {
    input.skip(8 + 16 + 16 + 6 + 8)?; // order, rate, bark map size, amplitude bits/offset
    let books = input.read_lsb(4)? + 1;
    for _ in 0..books {
        read_book_index(input, codebooks)?;
    }
    Ok(())
}

fn read_floor1(input: &mut BitReader<'_>, codebooks: u32) -> Result<()> {
    let partitions = input.read_lsb(5)?;
    let mut partition_classes = Vec::with_capacity(partitions as usize);
    for _ in 0..partitions {
        partition_classes.push(input.read_lsb(4)? as usize);
    }
    let class_count = partition_classes.iter().max().map_or(0, |m| m + 1);

    let mut class_dimensions = Vec::with_capacity(class_count);
    for _ in 0..class_count {
        class_dimensions.push(input.read_lsb(3)? + 1);
        let subclasses = input.read_lsb(2)?;
        if subclasses > 0 {
            read_book_index(input, codebooks)?;
        }
        for _ in 0..(1u32 << subclasses) {
            // Stored off by one; zero means "unused".
            let book = input.read_lsb(8)?;
            if book > codebooks {
                return Err(FilterError::unknown_content("floor1 subclass book out of range"));
            }
        }
    }

    input.read_lsb(2)?; // multiplier
    let range_bits = input.read_lsb(4)?;
    let mut values: u32 = 2;
    for class in partition_classes {
        let dims = class_dimensions[class];
        for _ in 0..dims {
            input.read_lsb(range_bits)?;
        }
        values += dims;
    }
    if values > 65 {
        return Err(FilterError::unknown_content(format!("floor1 has {} x values", values)));
    }
    Ok(())
}

fn read_residue(input: &mut BitReader<'_>, codebooks: u32) -> Result<()> {
    let residue_type = input.read_lsb(16)?;
    if residue_type > 2 {
        return Err(FilterError::unknown_content(format!("residue type {}", residue_type)));
    }
    let begin = input.read_lsb(24)?;
    let end = input.read_lsb(24)?;
    if begin > end {
        return Err(FilterError::unknown_content("residue begins after its end"));
    }
    input.read_lsb(24)?; // partition size
    let classifications = input.read_lsb(6)? + 1;
    read_book_index(input, codebooks)?;

    let mut cascades = Vec::with_capacity(classifications as usize);
    for _ in 0..classifications {
        let low = input.read_lsb(3)?;
        let high = if input.read_bit_lsb()? { input.read_lsb(5)? } else { 0 };
        cascades.push(high * 8 + low);
    }
    for cascade in cascades {
        for bit in 0..8 {
            if cascade & (1 << bit) != 0 {
                read_book_index(input, codebooks)?;
            }
        }
    }
    Ok(())
}

fn read_mapping(
    input: &mut BitReader<'_>,
    channels: u32,
    floors: u32,
    residues: u32,
) -> Result<()> {
    let mapping_type = input.read_lsb(16)?;
    if mapping_type != 0 {
        return Err(FilterError::unknown_content(format!("mapping type {}", mapping_type)));
    }
    let submaps = if input.read_bit_lsb()? {
        input.read_lsb(4)? + 1
    } else {
        1
    };

    if input.read_bit_lsb()? {
        let steps = input.read_lsb(8)? + 1;
        let width = ilog(i64::from(channels) - 1);
        for _ in 0..steps {
            let magnitude = input.read_lsb(width)?;
            let angle = input.read_lsb(width)?;
            if magnitude == angle || magnitude >= channels || angle >= channels {
                return Err(FilterError::unknown_content("invalid channel coupling"));
            }
        }
    }

    if input.read_lsb(2)? != 0 {
        return Err(FilterError::unknown_content("mapping reserved field not zero"));
    }
    if submaps > 1 {
        for _ in 0..channels {
            if input.read_lsb(4)? >= submaps {
                return Err(FilterError::unknown_content("mapping mux out of range"));
            }
        }
    }
    for _ in 0..submaps {
        input.read_lsb(8)?; // unused time configuration
        if input.read_lsb(8)? >= floors || input.read_lsb(8)? >= residues {
            return Err(FilterError::unknown_content("submap refers to undefined floor or residue"));
        }
    }
    Ok(())
}

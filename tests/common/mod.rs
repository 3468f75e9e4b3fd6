//! Builders for synthetic Ogg streams shared by the integration tests.

#![allow(dead_code)]

use contentsieve_container::{paginate, OggPage, PageTemplate};

pub const THEORA_SERIAL: u32 = 0x0000_7e01;
pub const VORBIS_SERIAL: u32 = 0x0000_0a02;

/// Bit writer producing MSB-first or LSB-first packed bytes.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_bit(&mut self, set: bool, msb_first: bool) {
        if self.bit == 0 {
            self.bytes.push(0);
        }
        if set {
            let shift = if msb_first { 7 - self.bit } else { self.bit };
            *self.bytes.last_mut().unwrap() |= 1 << shift;
        }
        self.bit = (self.bit + 1) % 8;
    }

    pub fn msb(&mut self, value: u64, bits: u32) -> &mut Self {
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1, true);
        }
        self
    }

    pub fn lsb(&mut self, value: u64, bits: u32) -> &mut Self {
        for i in 0..bits {
            self.push_bit((value >> i) & 1 == 1, false);
        }
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        assert_eq!(self.bit, 0, "byte write at unaligned position");
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        self.bit = 0;
        std::mem::take(&mut self.bytes)
    }
}

fn comment_body(packet: &mut Vec<u8>, vendor: &str, comments: &[&str]) {
    packet.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    packet.extend_from_slice(vendor.as_bytes());
    packet.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in comments {
        packet.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        packet.extend_from_slice(comment.as_bytes());
    }
}

/// Theora identification header for a 320x240 picture, with a chosen
/// major version so tests can break it.
pub fn theora_identification_version(vmaj: u64) -> Vec<u8> {
    BitWriter::new()
        .bytes(b"\x80theora")
        .msb(vmaj, 8)
        .msb(2, 8)
        .msb(1, 8)
        .msb(20, 16) // FMBW
        .msb(15, 16) // FMBH
        .msb(320, 24)
        .msb(240, 24)
        .msb(0, 8)
        .msb(0, 8)
        .msb(25, 32) // FRN
        .msb(1, 32) // FRD
        .msb(1, 24)
        .msb(1, 24)
        .msb(0, 8) // CS
        .msb(0, 24)
        .msb(40, 6)
        .msb(6, 5)
        .msb(0, 2) // PF
        .msb(0, 3)
        .finish()
}

pub fn theora_identification() -> Vec<u8> {
    theora_identification_version(3)
}

pub fn theora_comment(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut packet = b"\x81theora".to_vec();
    comment_body(&mut packet, vendor, comments);
    packet
}

/// Theora setup header with one base matrix, one quant range per plane
/// and 80 single-leaf Huffman trees.
pub fn theora_setup() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.bytes(b"\x82theora")
        .msb(0, 3)
        .msb(0, 4)
        .msb(0, 64)
        .msb(0, 4)
        .msb(0, 64)
        .msb(0, 9);
    for _ in 0..64 {
        w.msb(8, 8);
    }
    w.msb(62, 6).msb(0, 1).msb(0, 1);
    for _ in 0..3 {
        w.msb(0, 1).msb(0, 1);
    }
    for token in 0..80u64 {
        w.msb(1, 1).msb(token % 32, 5);
    }
    w.finish()
}

pub fn vorbis_identification(channels: u8) -> Vec<u8> {
    let mut packet = b"\x01vorbis".to_vec();
    packet.extend_from_slice(&0u32.to_le_bytes());
    packet.push(channels);
    packet.extend_from_slice(&48_000u32.to_le_bytes());
    packet.extend_from_slice(&0i32.to_le_bytes());
    packet.extend_from_slice(&96_000i32.to_le_bytes());
    packet.extend_from_slice(&0i32.to_le_bytes());
    packet.push(0xb8);
    packet.push(0x01);
    packet
}

pub fn vorbis_comment(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut packet = b"\x03vorbis".to_vec();
    comment_body(&mut packet, vendor, comments);
    packet.push(0x01);
    packet
}

/// Vorbis setup header with one of each configuration item.
pub fn vorbis_setup() -> Vec<u8> {
    BitWriter::new()
        .bytes(b"\x05vorbis")
        .lsb(0, 8)
        .lsb(0x56_4342, 24)
        .lsb(1, 16)
        .lsb(1, 24)
        .lsb(0, 1)
        .lsb(0, 1)
        .lsb(0, 5)
        .lsb(0, 4)
        .lsb(0, 6)
        .lsb(0, 16)
        .lsb(0, 6)
        .lsb(1, 16)
        .lsb(0, 5)
        .lsb(0, 2)
        .lsb(0, 4)
        .lsb(0, 6)
        .lsb(0, 16)
        .lsb(0, 24)
        .lsb(0, 24)
        .lsb(0, 24)
        .lsb(0, 6)
        .lsb(0, 8)
        .lsb(0, 3)
        .lsb(0, 1)
        .lsb(0, 6)
        .lsb(0, 16)
        .lsb(0, 1)
        .lsb(0, 1)
        .lsb(0, 2)
        .lsb(0, 8)
        .lsb(0, 8)
        .lsb(0, 8)
        .lsb(0, 6)
        .lsb(0, 1)
        .lsb(0, 16)
        .lsb(0, 16)
        .lsb(0, 8)
        .lsb(1, 1)
        .finish()
}

/// Lays packets out page by page for one logical stream.
pub struct StreamWriter {
    serial: u32,
    sequence: u32,
    granule: i64,
    started: bool,
}

impl StreamWriter {
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            sequence: 0,
            granule: 0,
            started: false,
        }
    }

    fn emit<P: AsRef<[u8]>>(&mut self, packets: &[P], eos: bool) -> Vec<OggPage> {
        let template = PageTemplate {
            serial: self.serial,
            sequence: self.sequence,
            granule_position: self.granule,
            bos: !self.started,
            eos,
        };
        let pages = paginate(&template, packets);
        self.sequence += pages.len() as u32;
        self.granule += 1;
        self.started = true;
        pages
    }

    /// Pages holding `packets`, continuing the stream.
    pub fn pages<P: AsRef<[u8]>>(&mut self, packets: &[P]) -> Vec<OggPage> {
        self.emit(packets, false)
    }

    /// The final pages of the stream.
    pub fn last_pages<P: AsRef<[u8]>>(&mut self, packets: &[P]) -> Vec<OggPage> {
        self.emit(packets, true)
    }
}

/// A complete Theora stream: identification page, comment + setup page,
/// one page per frame group, the last one flagged EOS.
pub fn theora_stream(serial: u32, frame_pages: &[Vec<Vec<u8>>]) -> Vec<OggPage> {
    let mut writer = StreamWriter::new(serial);
    let mut pages = writer.pages(&[theora_identification()]);
    pages.extend(writer.pages(&[theora_comment("Xiph.Org libtheora", &["TITLE=clip"]), theora_setup()]));
    for (i, frames) in frame_pages.iter().enumerate() {
        if i + 1 == frame_pages.len() {
            pages.extend(writer.last_pages(frames));
        } else {
            pages.extend(writer.pages(frames));
        }
    }
    pages
}

/// A complete Vorbis stream laid out like [`theora_stream`].
pub fn vorbis_stream(serial: u32, audio_pages: &[Vec<Vec<u8>>]) -> Vec<OggPage> {
    let mut writer = StreamWriter::new(serial);
    let mut pages = writer.pages(&[vorbis_identification(2)]);
    pages.extend(writer.pages(&[vorbis_comment("Xiph.Org libVorbis", &["ARTIST=x"]), vorbis_setup()]));
    for (i, audio) in audio_pages.iter().enumerate() {
        if i + 1 == audio_pages.len() {
            pages.extend(writer.last_pages(audio));
        } else {
            pages.extend(writer.pages(audio));
        }
    }
    pages
}

pub fn to_bytes(pages: &[OggPage]) -> Vec<u8> {
    pages.iter().flat_map(|p| p.to_bytes()).collect()
}

/// Interleave two streams page by page, as a muxer would.
pub fn interleave(a: &[OggPage], b: &[OggPage]) -> Vec<OggPage> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    for i in 0..a.len().max(b.len()) {
        out.extend(a.get(i).cloned());
        out.extend(b.get(i).cloned());
    }
    out
}

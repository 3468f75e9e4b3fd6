//! Packet builders shared by the codec unit tests.

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
            if let Some(last) = self.bytes.last_mut() {
                *last |= 1 << shift;
            }
        }
        self.bit = (self.bit + 1) % 8;
    }

    pub fn write_msb(&mut self, value: u64, bits: u32) {
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1, true);
        }
    }

    pub fn write_lsb(&mut self, value: u64, bits: u32) {
        for i in 0..bits {
            self.push_bit((value >> i) & 1 == 1, false);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(self.bit, 0, "byte write at unaligned position");
        self.bytes.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
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

/// A 320x240, 30 fps Theora identification header.
pub fn theora_identification() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_bytes(b"\x80theora");
    w.write_msb(3, 8); // VMAJ
    w.write_msb(2, 8); // VMIN
    w.write_msb(1, 8); // VREV
    w.write_msb(20, 16); // FMBW
    w.write_msb(15, 16); // FMBH
    w.write_msb(320, 24); // PICW
    w.write_msb(240, 24); // PICH
    w.write_msb(0, 8); // PICX
    w.write_msb(0, 8); // PICY
    w.write_msb(30, 32); // FRN
    w.write_msb(1, 32); // FRD
    w.write_msb(1, 24); // PARN
    w.write_msb(1, 24); // PARD
    w.write_msb(0, 8); // CS
    w.write_msb(0, 24); // NOMBR
    w.write_msb(32, 6); // QUAL
    w.write_msb(6, 5); // KFGSHIFT
    w.write_msb(0, 2); // PF
    w.write_msb(0, 3); // Res
    w.finish()
}

pub fn theora_comment(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut packet = b"\x81theora".to_vec();
    comment_body(&mut packet, vendor, comments);
    packet
}

/// Smallest well-formed Theora setup header: one base matrix, a single
/// quant range per plane and 80 one-leaf Huffman trees.
pub fn theora_setup() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_bytes(b"\x82theora");
    w.write_msb(0, 3); // loop filter NBITS
    w.write_msb(0, 4); // AC scale NBITS - 1
    w.write_msb(0, 64);
    w.write_msb(0, 4); // DC scale NBITS - 1
    w.write_msb(0, 64);
    w.write_msb(0, 9); // NBMS - 1
    for _ in 0..64 {
        w.write_msb(8, 8);
    }
    // qti 0, pli 0: implicit NEWQR, one range covering all 63 steps
    w.write_msb(62, 6);
    // qti 0, pli 1..3: NEWQR = 0
    w.write_msb(0, 1);
    w.write_msb(0, 1);
    // qti 1: NEWQR = 0, RPQR = 0
    for _ in 0..3 {
        w.write_msb(0, 1);
        w.write_msb(0, 1);
    }
    for token in 0..80u64 {
        w.write_msb(1, 1);
        w.write_msb(token % 32, 5);
    }
    w.finish()
}

/// A 44.1 kHz Vorbis identification header with the given channel count.
pub fn vorbis_identification(channels: u8) -> Vec<u8> {
    let mut packet = b"\x01vorbis".to_vec();
    packet.extend_from_slice(&0u32.to_le_bytes());
    packet.push(channels);
    packet.extend_from_slice(&44_100u32.to_le_bytes());
    packet.extend_from_slice(&0i32.to_le_bytes());
    packet.extend_from_slice(&128_000i32.to_le_bytes());
    packet.extend_from_slice(&0i32.to_le_bytes());
    packet.push(0xb8); // blocksizes 2^8 and 2^11
    packet.push(0x01);
    packet
}

pub fn vorbis_comment(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut packet = b"\x03vorbis".to_vec();
    comment_body(&mut packet, vendor, comments);
    packet.push(0x01);
    packet
}

/// Smallest well-formed Vorbis setup header: one codebook, one floor1,
/// one residue, one mapping and one mode.
pub fn vorbis_setup() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_bytes(b"\x05vorbis");

    w.write_lsb(0, 8); // codebook count - 1
    w.write_lsb(0x56_4342, 24);
    w.write_lsb(1, 16); // dimensions
    w.write_lsb(1, 24); // entries
    w.write_lsb(0, 1); // ordered
    w.write_lsb(0, 1); // sparse
    w.write_lsb(0, 5); // length - 1
    w.write_lsb(0, 4); // lookup type

    w.write_lsb(0, 6); // time count - 1
    w.write_lsb(0, 16);

    w.write_lsb(0, 6); // floor count - 1
    w.write_lsb(1, 16); // floor type 1
    w.write_lsb(0, 5); // partitions
    w.write_lsb(0, 2); // multiplier - 1
    w.write_lsb(0, 4); // rangebits

    w.write_lsb(0, 6); // residue count - 1
    w.write_lsb(0, 16); // residue type
    w.write_lsb(0, 24); // begin
    w.write_lsb(0, 24); // end
    w.write_lsb(0, 24); // partition size - 1
    w.write_lsb(0, 6); // classifications - 1
    w.write_lsb(0, 8); // classbook
    w.write_lsb(0, 3); // cascade low bits
    w.write_lsb(0, 1); // no high bits

    w.write_lsb(0, 6); // mapping count - 1
    w.write_lsb(0, 16); // mapping type
    w.write_lsb(0, 1); // single submap
    w.write_lsb(0, 1); // no coupling
    w.write_lsb(0, 2); // reserved
    w.write_lsb(0, 8); // time config
    w.write_lsb(0, 8); // floor
    w.write_lsb(0, 8); // residue

    w.write_lsb(0, 6); // mode count - 1
    w.write_lsb(0, 1); // blockflag
    w.write_lsb(0, 16); // window type
    w.write_lsb(0, 16); // transform type
    w.write_lsb(0, 8); // mapping

    w.write_lsb(1, 1); // framing
    w.finish()
}

#[test]
fn test_bit_writer_orders() {
    let mut w = BitWriter::new();
    w.write_msb(0b101, 3);
    w.write_msb(0, 5);
    assert_eq!(w.finish(), vec![0b1010_0000]);

    let mut w = BitWriter::new();
    w.write_lsb(0b101, 3);
    assert_eq!(w.finish(), vec![0b0000_0101]);
}

#[test]
fn test_fixture_lengths() {
    assert_eq!(theora_identification().len(), 42);
    assert_eq!(vorbis_identification(2).len(), 30);
    assert_eq!(vorbis_setup()[8], 0x42);
}

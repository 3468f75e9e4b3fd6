//! Ogg page model.
//!
//! A page is a 27-byte header, a lacing table of up to 255 segment lengths
//! and a body. Lacing values of 255 continue the current packet; any
//! smaller value ends it.

use crate::crc;
use contentsieve_core::{FilterError, Result};
use std::io::Write;

/// Every page starts with this capture pattern.
pub const CAPTURE_PATTERN: &[u8; 4] = b"OggS";

/// Fixed header length, up to and including the segment count.
pub const HEADER_SIZE: usize = 27;

/// Largest number of lacing values on one page.
pub const MAX_SEGMENTS: usize = 255;

/// First packet on the page continues a packet from the previous page.
pub const FLAG_CONTINUED: u8 = 0x01;
/// First page of a logical stream.
pub const FLAG_BOS: u8 = 0x02;
/// Last page of a logical stream.
pub const FLAG_EOS: u8 = 0x04;

const CRC_OFFSET: usize = 22;

/// One physical Ogg page.
///
/// `lacing` must describe `body` exactly: the sum of the lacing values is
/// the body length. Pages returned by [`OggPage::parse`] and [`paginate`]
/// always satisfy this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OggPage {
    pub version: u8,
    pub header_type: u8,
    pub granule_position: i64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
    pub lacing: Vec<u8>,
    pub body: Vec<u8>,
}

/// A run of body bytes between packet boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub data: &'a [u8],
    /// Whether a packet ends with this run. Only the last run on a page
    /// can be incomplete.
    pub complete: bool,
}

impl OggPage {
    /// Parse the page at the start of `input`, returning it with the
    /// number of bytes it occupied.
    ///
    /// Only the capture pattern and lengths are checked here; version,
    /// flags and checksum belong to the stream that owns the page.
    pub fn parse(input: &[u8]) -> Result<(Self, usize)> {
        if input.len() < HEADER_SIZE {
            return Err(FilterError::malformed(format!(
                "truncated page header: {} bytes",
                input.len()
            )));
        }
        if &input[0..4] != CAPTURE_PATTERN {
            return Err(FilterError::malformed("missing OggS capture pattern"));
        }

        let segments = input[26] as usize;
        let lacing_end = HEADER_SIZE + segments;
        if input.len() < lacing_end {
            return Err(FilterError::malformed("truncated lacing table"));
        }
        let lacing = input[HEADER_SIZE..lacing_end].to_vec();
        let body_len: usize = lacing.iter().map(|&v| v as usize).sum();
        let total = lacing_end + body_len;
        if input.len() < total {
            return Err(FilterError::malformed(format!(
                "truncated page body: wanted {} bytes, {} left",
                body_len,
                input.len() - lacing_end
            )));
        }

        let page = Self {
            version: input[4],
            header_type: input[5],
            granule_position: i64::from_le_bytes(le_array(&input[6..14])),
            serial: u32::from_le_bytes(le_array(&input[14..18])),
            sequence: u32::from_le_bytes(le_array(&input[18..22])),
            checksum: u32::from_le_bytes(le_array(&input[22..26])),
            lacing,
            body: input[lacing_end..total].to_vec(),
        };
        Ok((page, total))
    }

    /// Split a buffered container into pages.
    ///
    /// Bytes that do not start a page, anywhere in the buffer, are an error.
    pub fn parse_all(input: &[u8]) -> Result<Vec<Self>> {
        let mut pages = Vec::new();
        let mut offset = 0;
        while offset < input.len() {
            let (page, used) = Self::parse(&input[offset..]).map_err(|e| match e {
                FilterError::Malformed(msg) => {
                    FilterError::Malformed(format!("at offset {}: {}", offset, msg))
                }
                other => other,
            })?;
            pages.push(page);
            offset += used;
        }
        Ok(pages)
    }

    pub fn is_continued(&self) -> bool {
        self.header_type & FLAG_CONTINUED != 0
    }

    pub fn is_bos(&self) -> bool {
        self.header_type & FLAG_BOS != 0
    }

    pub fn is_eos(&self) -> bool {
        self.header_type & FLAG_EOS != 0
    }

    /// Whether any header-type bit other than continued/BOS/EOS is set.
    pub fn has_reserved_flags(&self) -> bool {
        self.header_type & !(FLAG_CONTINUED | FLAG_BOS | FLAG_EOS) != 0
    }

    /// Split the body into packet runs.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let mut start = 0;
        let mut end = 0;
        for &value in &self.lacing {
            end += value as usize;
            if value < 255 {
                segments.push(Segment {
                    data: &self.body[start..end],
                    complete: true,
                });
                start = end;
            }
        }
        if self.lacing.last() == Some(&255) {
            segments.push(Segment {
                data: &self.body[start..end],
                complete: false,
            });
        }
        segments
    }

    /// Serialized size in bytes.
    pub fn len(&self) -> usize {
        HEADER_SIZE + self.lacing.len() + self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lacing.is_empty()
    }

    /// Serialize the page with its stored checksum.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(CAPTURE_PATTERN);
        out.push(self.version);
        out.push(self.header_type);
        out.extend_from_slice(&self.granule_position.to_le_bytes());
        out.extend_from_slice(&self.serial.to_le_bytes());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.push(self.lacing.len() as u8);
        out.extend_from_slice(&self.lacing);
        out.extend_from_slice(&self.body);
        out
    }

    /// Write the serialized page.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Checksum of the page as it would be written, CRC field zeroed.
    pub fn computed_checksum(&self) -> u32 {
        let mut bytes = self.to_bytes();
        bytes[CRC_OFFSET..CRC_OFFSET + 4].fill(0);
        crc::checksum(&bytes)
    }

    pub fn has_valid_checksum(&self) -> bool {
        self.checksum == self.computed_checksum()
    }

    /// Store the correct checksum.
    pub fn finalize(&mut self) {
        self.checksum = self.computed_checksum();
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// Header values shared by the pages produced by [`paginate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTemplate {
    pub serial: u32,
    /// Sequence number of the first page produced.
    pub sequence: u32,
    /// Granule position of the last page produced.
    pub granule_position: i64,
    pub bos: bool,
    pub eos: bool,
}

/// Lay complete packets out over as few pages as the lacing limit allows.
///
/// Only the first page carries BOS and only the last carries EOS and the
/// template's granule position; earlier pages get granule −1. A page
/// whose first run continues a packet is flagged continued.
pub fn paginate<P: AsRef<[u8]>>(template: &PageTemplate, packets: &[P]) -> Vec<OggPage> {
    let mut lacing = Vec::new();
    let mut body = Vec::new();
    for packet in packets {
        let data = packet.as_ref();
        lacing.extend(std::iter::repeat(255u8).take(data.len() / 255));
        lacing.push((data.len() % 255) as u8);
        body.extend_from_slice(data);
    }

    let chunks: Vec<&[u8]> = lacing.chunks(MAX_SEGMENTS).collect();
    let mut pages = Vec::with_capacity(chunks.len());
    let mut offset = 0;
    let mut continued = false;
    for (i, chunk) in chunks.iter().enumerate() {
        let last = i + 1 == chunks.len();
        let size: usize = chunk.iter().map(|&v| v as usize).sum();

        let mut header_type = 0;
        if continued {
            header_type |= FLAG_CONTINUED;
        }
        if i == 0 && template.bos {
            header_type |= FLAG_BOS;
        }
        if last && template.eos {
            header_type |= FLAG_EOS;
        }

        let mut page = OggPage {
            version: 0,
            header_type,
            granule_position: if last { template.granule_position } else { -1 },
            serial: template.serial,
            sequence: template.sequence.wrapping_add(i as u32),
            checksum: 0,
            lacing: chunk.to_vec(),
            body: body[offset..offset + size].to_vec(),
        };
        page.finalize();
        pages.push(page);

        offset += size;
        continued = chunk.last() == Some(&255);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> PageTemplate {
        PageTemplate {
            serial: 0x1234,
            sequence: 7,
            granule_position: 99,
            bos: true,
            eos: true,
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        let pages = paginate(&template(), &[b"hello".to_vec(), vec![0u8; 300]]);
        assert_eq!(pages.len(), 1);
        let bytes = pages[0].to_bytes();
        let (parsed, used) = OggPage::parse(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(parsed, pages[0]);
        assert!(parsed.has_valid_checksum());
        assert_eq!(parsed.lacing, vec![5, 255, 45]);
    }

    #[test]
    fn test_segments() {
        let page = &paginate(&template(), &[vec![1u8; 255], vec![2u8; 3]])[0];
        let segments = page.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].data.len(), 255);
        assert!(segments[0].complete);
        assert_eq!(segments[1].data, &[2, 2, 2]);
    }

    #[test]
    fn test_open_segment_at_page_end() {
        let mut page = paginate(&template(), &[vec![1u8; 10]]).remove(0);
        page.lacing = vec![255];
        page.body = vec![0u8; 255];
        let segments = page.segments();
        assert_eq!(segments.len(), 1);
        assert!(!segments[0].complete);
    }

    #[test]
    fn test_paginate_spills_over_lacing_limit() {
        // 300 * 255 bytes need 301 lacing values.
        let big = vec![7u8; 300 * 255];
        let pages = paginate(&template(), &[big.clone()]);
        assert_eq!(pages.len(), 2);

        assert!(pages[0].is_bos());
        assert!(!pages[0].is_eos());
        assert!(!pages[0].is_continued());
        assert_eq!(pages[0].granule_position, -1);
        assert_eq!(pages[0].lacing.len(), 255);

        assert!(!pages[1].is_bos());
        assert!(pages[1].is_eos());
        assert!(pages[1].is_continued());
        assert_eq!(pages[1].granule_position, 99);
        assert_eq!(pages[1].sequence, 8);

        let body: Vec<u8> = pages.iter().flat_map(|p| p.body.clone()).collect();
        assert_eq!(body, big);
    }

    #[test]
    fn test_empty_packet_lacing() {
        let pages = paginate(&template(), &[Vec::<u8>::new()]);
        assert_eq!(pages[0].lacing, vec![0]);
        assert_eq!(pages[0].segments().len(), 1);
        assert!(pages[0].segments()[0].data.is_empty());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut page = paginate(&template(), &[b"abc".to_vec()]).remove(0);
        page.body[1] ^= 0x20;
        assert!(!page.has_valid_checksum());
        page.finalize();
        assert!(page.has_valid_checksum());
    }

    #[test]
    fn test_parse_errors() {
        assert!(OggPage::parse(b"OggS").is_err());
        let mut bytes = paginate(&template(), &[b"abc".to_vec()])[0].to_bytes();
        bytes[0] = b'X';
        assert!(OggPage::parse(&bytes).is_err());
        bytes[0] = b'O';
        bytes.pop();
        let err = OggPage::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("truncated page body"));
    }

    #[test]
    fn test_parse_all_rejects_trailing_garbage() {
        let mut bytes = paginate(&template(), &[b"abc".to_vec()])[0].to_bytes();
        assert_eq!(OggPage::parse_all(&bytes).unwrap().len(), 1);
        bytes.extend_from_slice(b"junk");
        let err = OggPage::parse_all(&bytes).unwrap_err();
        assert!(err.to_string().contains("at offset"));
    }

    #[test]
    fn test_reserved_flags() {
        let mut page = paginate(&template(), &[b"abc".to_vec()]).remove(0);
        assert!(!page.has_reserved_flags());
        page.header_type |= 0x08;
        assert!(page.has_reserved_flags());
    }
}

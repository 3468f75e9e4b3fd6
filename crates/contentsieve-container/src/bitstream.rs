//! Per-stream page filter.
//!
//! An [`OggBitstreamFilter`] owns everything known about one logical
//! stream: its codec filter, the sequence number it expects next, a packet
//! left open at the end of the previous page and whether the stream is
//! still trusted. Once a stream is invalid it stays invalid.

use crate::page::{paginate, OggPage, PageTemplate};
use contentsieve_codec::{CodecPacket, CodecPacketFilter};
use contentsieve_core::{FilterError, Result};
use log::{debug, trace, warn};

/// The pages produced for one filtered input page.
///
/// Usually a single page; more when the surviving packets need more
/// lacing values than one page can hold. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedPage {
    pages: Vec<OggPage>,
}

impl SanitizedPage {
    pub fn pages(&self) -> &[OggPage] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<OggPage> {
        self.pages
    }

    /// Serialized bytes of every page, in order.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pages.iter().flat_map(|p| p.to_bytes()).collect()
    }
}

/// Filter for the pages of one logical stream.
pub struct OggBitstreamFilter {
    serial: u32,
    codec: Box<dyn CodecPacketFilter>,
    max_packet_size: usize,
    valid: bool,
    /// Input sequence number of the next page, once the BOS page is seen.
    next_sequence: Option<u32>,
    /// Sequence number of the next page written.
    output_sequence: u32,
    pending: Option<Vec<u8>>,
    packet_index: u64,
    eos_seen: bool,
    bos_written: bool,
    packets_accepted: u64,
    packets_dropped: u64,
}

impl std::fmt::Debug for OggBitstreamFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OggBitstreamFilter")
            .field("serial", &self.serial)
            .field("codec", &self.codec.name())
            .field("valid", &self.valid)
            .field("next_sequence", &self.next_sequence)
            .field("packets_accepted", &self.packets_accepted)
            .finish()
    }
}

impl OggBitstreamFilter {
    /// Create a filter for stream `serial`; its first page must be BOS.
    pub fn new(serial: u32, codec: Box<dyn CodecPacketFilter>, max_packet_size: usize) -> Self {
        Self {
            serial,
            codec,
            max_packet_size,
            valid: true,
            next_sequence: None,
            output_sequence: 0,
            pending: None,
            packet_index: 0,
            eos_seen: false,
            bos_written: false,
            packets_accepted: 0,
            packets_dropped: 0,
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn codec_name(&self) -> &str {
        self.codec.name()
    }

    pub fn is_valid_stream(&self) -> bool {
        self.valid
    }

    /// Whether the codec has accepted all of its header packets.
    pub fn headers_complete(&self) -> bool {
        self.codec.headers_complete()
    }

    pub fn packets_accepted(&self) -> u64 {
        self.packets_accepted
    }

    pub fn packets_dropped(&self) -> u64 {
        self.packets_dropped
    }

    /// Filter one page of this stream.
    ///
    /// # Returns
    /// - `Ok(Some(page))`: the packets that survived, re-paginated
    /// - `Ok(None)`: nothing on this page survived (or the page only opened
    ///   a packet that completes later)
    /// - `Err(_)`: the page breaks the stream; this and every later page of
    ///   the stream is rejected
    pub fn filter_page(&mut self, page: &OggPage) -> Result<Option<SanitizedPage>> {
        if !self.valid {
            return Err(FilterError::StreamInvalidated {
                serial: self.serial,
            });
        }
        if page.serial != self.serial {
            return Err(FilterError::malformed(format!(
                "page of stream {:#010x} routed to stream {:#010x}",
                page.serial, self.serial
            )));
        }

        match self.process(page) {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Invalidating stream {:#010x} ({}): {}", self.serial, self.codec.name(), e);
                self.invalidate();
                Err(e)
            }
        }
    }

    fn invalidate(&mut self) {
        self.valid = false;
        self.pending = None;
    }

    fn check_framing(&self, page: &OggPage) -> Result<()> {
        if page.version != 0 {
            return Err(FilterError::malformed(format!(
                "unsupported page version {}",
                page.version
            )));
        }
        if page.has_reserved_flags() {
            return Err(FilterError::malformed(format!(
                "reserved header type bits set: {:#04x}",
                page.header_type
            )));
        }
        if !page.has_valid_checksum() {
            return Err(FilterError::malformed(format!(
                "checksum mismatch on page {}",
                page.sequence
            )));
        }
        if self.eos_seen {
            return Err(FilterError::malformed("page after end of stream"));
        }

        match self.next_sequence {
            None if !page.is_bos() => {
                return Err(FilterError::malformed("first page of stream is not BOS"));
            }
            Some(_) if page.is_bos() => {
                return Err(FilterError::malformed("BOS page on a known stream"));
            }
            Some(expected) if page.sequence != expected => {
                return Err(FilterError::malformed(format!(
                    "page sequence {} where {} was expected",
                    page.sequence, expected
                )));
            }
            _ => {}
        }

        match (page.is_continued(), self.pending.is_some()) {
            (true, false) => Err(FilterError::malformed("continued page without an open packet")),
            (false, true) => Err(FilterError::malformed("open packet not continued")),
            _ => Ok(()),
        }
    }

    fn process(&mut self, page: &OggPage) -> Result<Option<SanitizedPage>> {
        self.check_framing(page)?;
        if self.next_sequence.is_none() {
            self.output_sequence = page.sequence;
        }
        self.next_sequence = Some(page.sequence.wrapping_add(1));

        let mut survivors: Vec<Vec<u8>> = Vec::new();
        for segment in page.segments() {
            let mut data = self.pending.take().unwrap_or_default();
            if data.len() + segment.data.len() > self.max_packet_size {
                return Err(FilterError::malformed(format!(
                    "packet exceeds the {} byte limit",
                    self.max_packet_size
                )));
            }
            data.extend_from_slice(segment.data);

            if !segment.complete {
                self.pending = Some(data);
                continue;
            }

            let packet = CodecPacket::with_index(data, self.packet_index);
            self.packet_index += 1;
            match self.codec.parse(packet)? {
                Some(packet) => {
                    self.packets_accepted += 1;
                    survivors.push(packet.into_payload());
                }
                None => {
                    trace!("Dropped packet {} of stream {:#010x}", self.packet_index - 1, self.serial);
                    self.packets_dropped += 1;
                }
            }
        }

        if page.is_eos() {
            self.eos_seen = true;
            if self.pending.take().is_some() {
                debug!("Stream {:#010x} ended inside a packet", self.serial);
            }
        }

        if survivors.is_empty() {
            return Ok(None);
        }

        let template = PageTemplate {
            serial: self.serial,
            sequence: self.output_sequence,
            granule_position: page.granule_position,
            bos: !self.bos_written,
            eos: page.is_eos(),
        };
        let pages = paginate(&template, &survivors);
        self.output_sequence = self.output_sequence.wrapping_add(pages.len() as u32);
        self.bos_written = true;
        Ok(Some(SanitizedPage { pages }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts everything except packets starting with 0xff (dropped) and
    /// packets equal to `b"bad"` (fatal).
    struct StubFilter {
        seen: u64,
    }

    impl CodecPacketFilter for StubFilter {
        fn name(&self) -> &str {
            "stub"
        }

        fn parse(&mut self, packet: CodecPacket) -> Result<Option<CodecPacket>> {
            self.seen += 1;
            match packet.payload() {
                b"bad" => Err(FilterError::unknown_content("bad packet")),
                [0xff, ..] => Ok(None),
                _ => Ok(Some(packet)),
            }
        }

        fn headers_complete(&self) -> bool {
            self.seen > 0
        }
    }

    const SERIAL: u32 = 0xfeed;

    fn stream() -> OggBitstreamFilter {
        OggBitstreamFilter::new(SERIAL, Box::new(StubFilter { seen: 0 }), 1 << 20)
    }

    fn page(sequence: u32, bos: bool, eos: bool, packets: &[&[u8]]) -> OggPage {
        let template = PageTemplate {
            serial: SERIAL,
            sequence,
            granule_position: i64::from(sequence) * 10,
            bos,
            eos,
        };
        paginate(&template, packets).remove(0)
    }

    #[test]
    fn test_clean_pages_pass_unchanged() {
        let mut filter = stream();
        let first = page(0, true, false, &[b"head"]);
        let second = page(1, false, true, &[b"one", b"two"]);
        let out = filter.filter_page(&first).unwrap().unwrap();
        assert_eq!(out.pages(), &[first]);
        let out = filter.filter_page(&second).unwrap().unwrap();
        assert_eq!(out.pages(), &[second]);
        assert_eq!(filter.packets_accepted(), 3);
    }

    #[test]
    fn test_dropped_packets_leave_page() {
        let mut filter = stream();
        filter.filter_page(&page(0, true, false, &[b"head"])).unwrap();
        let out = filter
            .filter_page(&page(1, false, false, &[b"keep", b"\xffdrop"]))
            .unwrap()
            .unwrap();
        let segments: Vec<&[u8]> = out.pages()[0].segments().iter().map(|s| s.data).collect();
        assert_eq!(segments, vec![&b"keep"[..]]);
        assert_eq!(filter.packets_dropped(), 1);
    }

    #[test]
    fn test_zero_survivors_yield_no_page() {
        let mut filter = stream();
        filter.filter_page(&page(0, true, false, &[b"head"])).unwrap();
        assert!(filter.filter_page(&page(1, false, false, &[b"\xffx"])).unwrap().is_none());
        // Output sequence numbers stay consecutive after the gap.
        let out = filter.filter_page(&page(2, false, false, &[b"next"])).unwrap().unwrap();
        assert_eq!(out.pages()[0].sequence, 1);
    }

    #[test]
    fn test_invalidation_is_sticky() {
        let mut filter = stream();
        filter.filter_page(&page(0, true, false, &[b"head"])).unwrap();
        assert!(filter.filter_page(&page(5, false, false, &[b"gap"])).is_err());
        assert!(!filter.is_valid_stream());
        let err = filter.filter_page(&page(1, false, false, &[b"fine"])).unwrap_err();
        assert!(matches!(err, FilterError::StreamInvalidated { serial: SERIAL }));
    }

    #[test]
    fn test_codec_error_invalidates() {
        let mut filter = stream();
        filter.filter_page(&page(0, true, false, &[b"head"])).unwrap();
        assert!(filter.filter_page(&page(1, false, false, &[b"ok", b"bad"])).is_err());
        assert!(filter.filter_page(&page(2, false, false, &[b"ok"])).is_err());
    }

    #[test]
    fn test_framing_violations() {
        let mut corrupt = page(0, true, false, &[b"head"]);
        corrupt.body[0] ^= 1;
        assert!(stream().filter_page(&corrupt).is_err());

        assert!(stream().filter_page(&page(0, false, false, &[b"x"])).is_err());

        let mut versioned = page(0, true, false, &[b"head"]);
        versioned.version = 1;
        versioned.finalize();
        assert!(stream().filter_page(&versioned).is_err());

        let mut filter = stream();
        filter.filter_page(&page(0, true, false, &[b"head"])).unwrap();
        assert!(filter.filter_page(&page(1, true, false, &[b"again"])).is_err());

        let mut filter = stream();
        filter.filter_page(&page(0, true, true, &[b"head"])).unwrap();
        assert!(filter.filter_page(&page(1, false, false, &[b"late"])).is_err());
    }

    #[test]
    fn test_packet_spanning_pages() {
        let big = vec![0x42u8; 600];
        let template = PageTemplate {
            serial: SERIAL,
            sequence: 1,
            granule_position: 5,
            bos: false,
            eos: false,
        };
        // Split one packet over two input pages by hand.
        let mut open = paginate(&template, &[&big[..510]]).remove(0);
        open.lacing = vec![255, 255];
        open.granule_position = -1;
        open.finalize();
        let mut close = paginate(&template, &[&big[510..]]).remove(0);
        close.sequence = 2;
        close.header_type |= crate::page::FLAG_CONTINUED;
        close.finalize();

        let mut filter = stream();
        filter.filter_page(&page(0, true, false, &[b"head"])).unwrap();
        assert!(filter.filter_page(&open).unwrap().is_none());
        let out = filter.filter_page(&close).unwrap().unwrap();
        let page = &out.pages()[0];
        assert_eq!(page.segments()[0].data, &big[..]);
        assert!(!page.is_continued());
        assert_eq!(page.sequence, 1);
        assert_eq!(page.granule_position, 5);
    }

    #[test]
    fn test_continued_flag_must_match_open_packet() {
        let mut filter = stream();
        filter.filter_page(&page(0, true, false, &[b"head"])).unwrap();
        let mut stray = page(1, false, false, &[b"x"]);
        stray.header_type |= crate::page::FLAG_CONTINUED;
        stray.finalize();
        assert!(filter.filter_page(&stray).is_err());
    }

    #[test]
    fn test_packet_size_limit() {
        let mut filter = OggBitstreamFilter::new(SERIAL, Box::new(StubFilter { seen: 0 }), 16);
        assert!(filter.filter_page(&page(0, true, false, &[&[1u8; 17]])).is_err());
        assert!(!filter.is_valid_stream());
    }

    #[test]
    fn test_refiltering_is_identity() {
        let pages = [
            page(3, true, false, &[b"head"]),
            page(4, false, false, &[b"a", b"\xffgone", b"b"]),
            page(5, false, true, &[b"c"]),
        ];
        let mut first = stream();
        let once: Vec<OggPage> = pages
            .iter()
            .filter_map(|p| first.filter_page(p).unwrap())
            .flat_map(SanitizedPage::into_pages)
            .collect();
        let mut second = stream();
        let twice: Vec<OggPage> = once
            .iter()
            .filter_map(|p| second.filter_page(p).unwrap())
            .flat_map(SanitizedPage::into_pages)
            .collect();
        assert_eq!(once, twice);
        assert_eq!(once[0].sequence, 3);
    }
}

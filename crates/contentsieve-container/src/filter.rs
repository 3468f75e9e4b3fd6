//! Whole-container filter.
//!
//! [`OggFilter`] reads one fully buffered container, hands every page to
//! the stream it belongs to and writes the surviving pages. Nothing is
//! written unless the container as a whole passes.

use crate::bitstream::OggBitstreamFilter;
use crate::page::OggPage;
use contentsieve_codec::filter_for;
use contentsieve_config::ContainerConfig;
use contentsieve_core::{FilterError, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;

/// Counters describing one filtering run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub pages_in: u64,
    pub pages_out: u64,
    pub packets_accepted: u64,
    pub packets_dropped: u64,
    /// Serial numbers of the logical streams seen, in order of appearance.
    pub streams: Vec<u32>,
    /// Streams that were rejected or invalidated, in order of rejection.
    pub invalidated_streams: Vec<u32>,
}

impl fmt::Display for FilterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages in, {} pages out, {} packets accepted, {} dropped, {}/{} streams invalidated",
            self.pages_in,
            self.pages_out,
            self.packets_accepted,
            self.packets_dropped,
            self.invalidated_streams.len(),
            self.streams.len()
        )
    }
}

enum StreamSlot {
    Filtering(OggBitstreamFilter),
    /// Unknown or disabled codec, or no BOS page.
    Rejected,
}

/// Filter for a complete Ogg container.
#[derive(Debug, Clone, Default)]
pub struct OggFilter {
    config: ContainerConfig,
}

impl OggFilter {
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Filter `input` and write the sanitized container to `output`.
    ///
    /// Fails without writing anything if the input is not a sequence of
    /// pages, or if the first logical stream yields no valid packets.
    pub fn filter<W: Write>(&self, input: &[u8], output: &mut W) -> Result<FilterReport> {
        let (bytes, report) = self.filter_to_vec(input)?;
        output.write_all(&bytes)?;
        output.flush()?;
        Ok(report)
    }

    /// Filter `input`, returning the sanitized container bytes.
    pub fn filter_to_vec(&self, input: &[u8]) -> Result<(Vec<u8>, FilterReport)> {
        let pages = OggPage::parse_all(input)?;
        let mut report = FilterReport {
            pages_in: pages.len() as u64,
            ..FilterReport::default()
        };

        let mut streams: HashMap<u32, StreamSlot> = HashMap::new();
        let mut primary: Option<u32> = None;
        let mut output = Vec::with_capacity(input.len());

        for page in &pages {
            let serial = page.serial;
            let slot = streams.entry(serial).or_insert_with(|| {
                report.streams.push(serial);
                if primary.is_none() && page.is_bos() {
                    primary = Some(serial);
                }
                self.open_stream(page)
            });

            let filter = match slot {
                StreamSlot::Filtering(filter) => filter,
                StreamSlot::Rejected => {
                    if !report.invalidated_streams.contains(&serial) {
                        report.invalidated_streams.push(serial);
                    }
                    continue;
                }
            };

            match filter.filter_page(page) {
                Ok(Some(sanitized)) => {
                    for out in sanitized.pages() {
                        output.extend_from_slice(&out.to_bytes());
                        report.pages_out += 1;
                    }
                }
                Ok(None) => debug!("Page {} of stream {:#010x} left empty", page.sequence, serial),
                Err(FilterError::StreamInvalidated { .. }) => {}
                Err(_) => report.invalidated_streams.push(serial),
            }
        }

        for slot in streams.values() {
            if let StreamSlot::Filtering(filter) = slot {
                report.packets_accepted += filter.packets_accepted();
                report.packets_dropped += filter.packets_dropped();
            }
        }

        let primary_ok = primary
            .and_then(|serial| streams.get(&serial))
            .map_or(false, |slot| match slot {
                StreamSlot::Filtering(filter) => {
                    filter.packets_accepted() > 0 && filter.headers_complete()
                }
                StreamSlot::Rejected => false,
            });
        if !primary_ok {
            warn!("Container rejected: {}", report);
            return Err(FilterError::NoValidStreams);
        }

        info!("Container filtered: {}", report);
        Ok((output, report))
    }

    fn open_stream(&self, page: &OggPage) -> StreamSlot {
        if !page.is_bos() {
            warn!("Page for unknown stream {:#010x} without BOS", page.serial);
            return StreamSlot::Rejected;
        }
        let first_packet = match page.segments().first() {
            Some(segment) if segment.complete => segment.data,
            _ => {
                warn!("BOS page of stream {:#010x} has no complete packet", page.serial);
                return StreamSlot::Rejected;
            }
        };
        match filter_for(first_packet, &self.config) {
            Some((kind, codec)) => {
                debug!("Stream {:#010x} carries {}", page.serial, kind);
                StreamSlot::Filtering(OggBitstreamFilter::new(
                    page.serial,
                    codec,
                    self.config.max_packet_size,
                ))
            }
            None => {
                warn!("Stream {:#010x} has an unrecognized or disabled codec", page.serial);
                StreamSlot::Rejected
            }
        }
    }
}

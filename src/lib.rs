#![deny(unsafe_code)]
//! Parser for the legacy Hap frame container format.
//!
//! Legacy Hap frames are a sequence of length-prefixed, typed "sections".
//! A frame is either a single section whose payload is one compressed
//! image, or a Multiple Images section whose payload is a flat run of
//! sibling single-image sections. An image compressed with the Complex
//! class nests one further level: a Decode Instructions Container holding
//! the per-chunk tables, followed by the raw chunk data.
//!
//! This crate recovers that structure from untrusted byte buffers. It
//! never copies or allocates: every result is a subslice of the caller's
//! buffer, validated against its parent window before use. This crate is
//! written entirely in safe Rust code except for the C FFI bindings.

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

mod sections;
pub use crate::sections::{Compressor, SectionKind, TextureFormat};

/// This crate can be used from C.
#[allow(unsafe_code)]
pub mod c_api;

/// Describes parser failures.
///
/// The two kinds are the only statuses callers need to switch on; the
/// payload names the concrete violation. Every failure is a
/// deterministic function of the input bytes; there is no transient
/// category and nothing to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Caller contract violation: empty input or an out-of-range
    /// sub-image index.
    BadArguments(&'static str),
    /// Malformed or corrupt frame data: truncated or overflowing
    /// sections, a missing required table, or tables that disagree.
    BadFrame(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::BadArguments(s) | Self::BadFrame(s) => s,
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

/// Result shorthand using our Error enum.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Frame dimensions carried by a Frame Dimensions table.
///
/// Both fields zero means the frame carries no dimension metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    /// Byte length of an encoded dimensions payload.
    const ENCODED_LEN: usize = 8;

    /// True if dimension metadata was present.
    pub const fn is_present(&self) -> bool {
        self.width != 0 || self.height != 0
    }

    fn read(data: &[u8]) -> Result<Self> {
        if data.len() < Self::ENCODED_LEN {
            return Err(Error::BadFrame("short frame dimensions table"));
        }
        Ok(Self {
            width: LittleEndian::read_u32(&data[0..4]),
            height: LittleEndian::read_u32(&data[4..8]),
        })
    }
}

/// Decoded legacy section header.
///
/// Sections are length-prefixed: three little-endian bytes of payload
/// length (nonzero) and a type byte, or, when the three length bytes
/// are zero, the type byte followed by a four-byte extended length. The
/// type byte sits at offset 3 in both forms.
#[derive(Debug, Clone, Copy)]
pub struct SectionHeader {
    /// Section type.
    pub kind: SectionKind,
    /// Payload length in bytes, header excluded.
    pub payload_len: u32,
    /// Encoded header length: 4 for the inline form, 8 for the extended
    /// form.
    pub header_len: usize,
}

impl SectionHeader {
    /// Three length bytes + type byte.
    const MIN_SIZE: usize = 4;
    /// Inline form + four-byte extended length.
    const EXTENDED_SIZE: usize = 8;

    /// Total encoded size of the section, header included.
    pub const fn total_len(&self) -> usize {
        self.header_len + self.payload_len as usize
    }
}

/// Read and parse a section header.
///
/// Call this first to determine the type and extent of a section. The
/// returned header is validated against `data`: the whole section,
/// header included, is guaranteed to lie inside the window, so
/// `data[header.header_len..header.total_len()]` is its payload.
pub fn read_section_header(data: &[u8]) -> Result<SectionHeader> {
    if data.len() < SectionHeader::MIN_SIZE {
        return Err(Error::BadFrame("truncated section header"));
    }
    let inline_len = LittleEndian::read_u24(&data[0..3]);
    let (header_len, payload_len) = if inline_len != 0 {
        (SectionHeader::MIN_SIZE, inline_len)
    } else {
        // A zero inline length marks the extended form; the real length
        // follows the type byte.
        if data.len() < SectionHeader::EXTENDED_SIZE {
            return Err(Error::BadFrame("truncated extended section header"));
        }
        (
            SectionHeader::EXTENDED_SIZE,
            LittleEndian::read_u32(&data[4..8]),
        )
    };
    // Widened before the add so a 32-bit host can't overflow.
    if header_len as u64 + u64::from(payload_len) > data.len() as u64 {
        return Err(Error::BadFrame("section extends past end of buffer"));
    }
    Ok(SectionHeader {
        kind: SectionKind::from(data[3]),
        payload_len,
        header_len,
    })
}

#[test]
fn header_inline_form() {
    let header = read_section_header(&[3, 0, 0, 0xBB, b'x', b'y', b'z']).unwrap();
    assert_eq!(header.header_len, 4);
    assert_eq!(header.payload_len, 3);
    assert_eq!(u8::from(header.kind), 0xBB);
}

#[test]
fn header_extended_form() {
    let header = read_section_header(&[0, 0, 0, 0x01, 2, 0, 0, 0, 9, 9]).unwrap();
    assert_eq!(header.header_len, 8);
    assert_eq!(header.payload_len, 2);
    assert_eq!(header.kind, SectionKind::DecodeInstructionsContainer);
}

#[test]
fn header_rejects_truncation_and_overflow() {
    assert!(read_section_header(&[]).is_err());
    assert!(read_section_header(&[1, 0, 0]).is_err());
    // Extended form needs all eight bytes.
    assert!(read_section_header(&[0, 0, 0, 0x01, 2, 0, 0]).is_err());
    // Payload claims more bytes than the window holds.
    assert!(read_section_header(&[4, 0, 0, 0xBB, 1, 2, 3]).is_err());
    assert!(read_section_header(&[0xFF, 0xFF, 0xFF, 0xBB, 0]).is_err());
}

/// One parsed section: its type tag and a view of its payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    /// Section type.
    pub kind: SectionKind,
    /// Payload bytes, header excluded.
    pub payload: &'a [u8],
}

impl Section<'_> {
    /// Compressor class from the top four bits of the type byte.
    pub fn compressor(&self) -> Compressor {
        Compressor::from(u8::from(self.kind) >> 4)
    }

    /// Texture format from the bottom four bits of the type byte, if
    /// known.
    pub fn texture_format(&self) -> Option<TextureFormat> {
        TextureFormat::from_identifier(u8::from(self.kind) & 0x0F)
    }
}

/// Cursor over the sibling sections of a byte window.
struct SectionIter<'a> {
    remaining: &'a [u8],
}

impl<'a> SectionIter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { remaining: data }
    }

    /// Yield the next sibling section, or `None` at a clean end of the
    /// window. Every step consumes at least a header's worth of bytes,
    /// so a walk is bounded by the window length; one to three trailing
    /// bytes surface as a truncated-header error.
    fn next_section(&mut self) -> Result<Option<Section<'a>>> {
        if self.remaining.is_empty() {
            return Ok(None);
        }
        let header = read_section_header(self.remaining)?;
        let end = header.total_len();
        let payload = &self.remaining[header.header_len..end];
        self.remaining = &self.remaining[end..];
        Ok(Some(Section {
            kind: header.kind,
            payload,
        }))
    }
}

#[test]
fn walker_stops_cleanly_and_rejects_trailing_bytes() {
    // Two siblings, the second in extended form with an empty payload.
    let mut iter = SectionIter::new(&[1, 0, 0, 0xAB, 7, 0, 0, 0, 0x02, 0, 0, 0, 0]);
    assert_eq!(iter.next_section().unwrap().unwrap().payload, &[7]);
    assert!(iter.next_section().unwrap().unwrap().payload.is_empty());
    assert!(iter.next_section().unwrap().is_none());

    let mut iter = SectionIter::new(&[1, 0, 0, 0xAB, 7, 0, 0]);
    assert_eq!(iter.next_section().unwrap().unwrap().payload, &[7]);
    assert!(iter.next_section().is_err());
}

/// Parsed view of a Complex-compressor section: the tables from its
/// Decode Instructions Container plus the chunk data that follows it.
///
/// The chunk compressor and chunk size tables are always present after a
/// successful parse; the offset table and the dimensions are optional.
/// Chunk counts implied by more than one table must agree, with one
/// legacy leniency: a table implying zero chunks makes no claim and is
/// never compared.
#[derive(Debug, Clone, Copy)]
pub struct ComplexSection<'a> {
    chunk_count: u32,
    compressors: &'a [u8],
    chunk_sizes: &'a [u8],
    chunk_offsets: Option<&'a [u8]>,
    dimensions: Option<FrameDimensions>,
    chunk_data: &'a [u8],
}

impl<'a> ComplexSection<'a> {
    /// Parse the payload of a Complex-compressor section.
    ///
    /// The payload must open with a Decode Instructions Container; the
    /// section's chunk data follows immediately after it.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let header = read_section_header(payload)?;
        if header.kind != SectionKind::DecodeInstructionsContainer {
            return Err(Error::BadFrame("expected a decode instructions container"));
        }
        let container = &payload[header.header_len..header.total_len()];
        let chunk_data = &payload[header.total_len()..];

        let mut chunk_count = 0u32;
        let mut compressors = None;
        let mut chunk_sizes = None;
        let mut chunk_offsets = None;
        let mut dimensions = None;

        let mut iter = SectionIter::new(container);
        while let Some(section) = iter.next_section()? {
            let implied_count = match section.kind {
                SectionKind::ChunkCompressorTable => {
                    compressors = Some(section.payload);
                    section.payload.len() as u32
                }
                SectionKind::ChunkSizeTable => {
                    chunk_sizes = Some(section.payload);
                    (section.payload.len() / 4) as u32
                }
                SectionKind::ChunkOffsetTable => {
                    chunk_offsets = Some(section.payload);
                    (section.payload.len() / 4) as u32
                }
                SectionKind::FrameDimensionsTable => {
                    dimensions = Some(FrameDimensions::read(section.payload)?);
                    0
                }
                kind => {
                    debug!("skipping unrecognized section {kind:?} in decode instructions");
                    0
                }
            };
            // A zero implied count is "unknown" and never compared.
            if implied_count != 0 {
                if chunk_count != 0 && implied_count != chunk_count {
                    warn!("chunk count disagreement: {chunk_count} vs {implied_count}");
                    return Err(Error::BadFrame("chunk tables disagree on chunk count"));
                }
                chunk_count = implied_count;
            }
        }

        match (compressors, chunk_sizes) {
            (Some(compressors), Some(chunk_sizes)) => Ok(Self {
                chunk_count,
                compressors,
                chunk_sizes,
                chunk_offsets,
                dimensions,
                chunk_data,
            }),
            _ => Err(Error::BadFrame("missing chunk compressor or size table")),
        }
    }

    /// Number of chunks the tables describe; zero if no table implied
    /// one.
    pub const fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Frame dimensions, if the container carried them.
    pub const fn frame_dimensions(&self) -> Option<FrameDimensions> {
        self.dimensions
    }

    /// The raw chunk data that follows the Decode Instructions
    /// Container.
    pub const fn chunk_data(&self) -> &'a [u8] {
        self.chunk_data
    }

    /// Iterate over the per-chunk decode parameters.
    ///
    /// Offsets come from the chunk offset table when present; otherwise
    /// each chunk is assumed to follow the previous one and offsets are
    /// the running sum of chunk sizes.
    pub fn chunks(&self) -> Chunks<'a> {
        Chunks {
            section: *self,
            index: 0,
            running_offset: 0,
        }
    }

    /// The compressed bytes of one chunk, bounds-checked against the
    /// section's chunk data.
    pub fn chunk_bytes(&self, chunk: &ChunkInfo) -> Result<&'a [u8]> {
        let end = chunk
            .offset
            .checked_add(u64::from(chunk.size))
            .filter(|&end| end <= self.chunk_data.len() as u64)
            .ok_or(Error::BadFrame("chunk lies outside the chunk data"))?;
        Ok(&self.chunk_data[chunk.offset as usize..end as usize])
    }
}

/// Decode parameters for a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Second-stage compressor for this chunk.
    pub compressor: Compressor,
    /// Offset of the compressed bytes within the section's chunk data.
    pub offset: u64,
    /// Compressed size in bytes.
    pub size: u32,
}

/// Iterator over a Complex section's chunk table entries.
///
/// Ends early if a table holds fewer entries than the recorded chunk
/// count, which can only happen when the short table implied a zero
/// count and was exempt from the consistency check.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    section: ComplexSection<'a>,
    index: u32,
    running_offset: u64,
}

impl Iterator for Chunks<'_> {
    type Item = ChunkInfo;

    fn next(&mut self) -> Option<ChunkInfo> {
        if self.index >= self.section.chunk_count {
            return None;
        }
        let i = self.index as usize;
        let compressor = Compressor::from(*self.section.compressors.get(i)?);
        let size = LittleEndian::read_u32(self.section.chunk_sizes.get(i * 4..i * 4 + 4)?);
        let offset = match self.section.chunk_offsets {
            Some(table) => u64::from(LittleEndian::read_u32(table.get(i * 4..i * 4 + 4)?)),
            None => self.running_offset,
        };
        self.index += 1;
        self.running_offset = self.running_offset.saturating_add(u64::from(size));
        Some(ChunkInfo {
            compressor,
            offset,
            size,
        })
    }
}

/// Locate the sub-image section at `index`.
///
/// A top-level Multiple Images section is walked sibling by sibling; any
/// other top-level section is itself the only sub-image, at index 0. The
/// returned payload is the sub-image's raw section payload; a Complex
/// one can be handed on to [`ComplexSection::parse`].
///
/// Fails with [`Error::BadArguments`] when `index` is past the last
/// sub-image, and with [`Error::BadFrame`] when a header on the way
/// there is malformed.
pub fn subimage_at(data: &[u8], index: u32) -> Result<Section<'_>> {
    let header = read_section_header(data)?;
    let top = Section {
        kind: header.kind,
        payload: &data[header.header_len..header.total_len()],
    };
    if top.kind != SectionKind::MultipleImages {
        return if index == 0 {
            Ok(top)
        } else {
            Err(Error::BadArguments("sub-image index out of range"))
        };
    }
    let mut iter = SectionIter::new(top.payload);
    let mut remaining = index;
    while let Some(section) = iter.next_section()? {
        if remaining == 0 {
            return Ok(section);
        }
        remaining -= 1;
    }
    Err(Error::BadArguments("sub-image index out of range"))
}

/// Number of sub-images in a frame: one for a single-image frame, the
/// sibling count for a Multiple Images container.
pub fn subimage_count(data: &[u8]) -> Result<u32> {
    let header = read_section_header(data)?;
    if header.kind != SectionKind::MultipleImages {
        return Ok(1);
    }
    let payload = &data[header.header_len..header.total_len()];
    let mut iter = SectionIter::new(payload);
    let mut count = 0;
    while iter.next_section()?.is_some() {
        count += 1;
    }
    Ok(count)
}

/// Extract the dimensions of a frame.
///
/// Only the Complex compressor class can store dimensions, and all
/// sub-images of a frame are required to share them, so the first Frame
/// Dimensions table found wins. Returns zero dimensions (success, not
/// an error) when no sub-image carries one; a malformed sub-image on
/// the way aborts the whole query.
pub fn frame_dimensions(data: &[u8]) -> Result<FrameDimensions> {
    if data.is_empty() {
        return Err(Error::BadArguments("empty input buffer"));
    }
    let count = subimage_count(data)?;
    for index in 0..count {
        let section = subimage_at(data, index)?;
        if section.compressor() != Compressor::Complex {
            debug!("sub-image {index} is not complex, skipping");
            continue;
        }
        let complex = ComplexSection::parse(section.payload)?;
        if let Some(dimensions) = complex.frame_dimensions() {
            return Ok(dimensions);
        }
    }
    Ok(FrameDimensions::default())
}

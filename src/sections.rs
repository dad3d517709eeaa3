// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legacy Hap section type tables.
//!
//! The type byte of a top-level frame section packs a compressor class in
//! its top four bits and a texture format identifier in its bottom four
//! bits. Sections inside a Decode Instructions Container use the whole
//! byte as a tag.

macro_rules! section_database {
    ($($(#[$docs:meta])* $kind:ident $value:literal),+ $(,)?) => {
        /// Section type tags known to this crate.
        ///
        /// Unrecognized tags are carried through as [`Unknown`](Self::Unknown)
        /// so callers can still inspect the raw byte; a top-level frame
        /// section's type byte is a packed compressor/format pair rather
        /// than one of these tags.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum SectionKind {
            $($(#[$docs])* $kind,)+
            /// Tag not interpreted by this crate.
            Unknown(u8),
        }

        impl From<u8> for SectionKind {
            fn from(t: u8) -> Self {
                match t {
                    $($value => Self::$kind,)+
                    _ => Self::Unknown(t),
                }
            }
        }

        impl From<SectionKind> for u8 {
            fn from(kind: SectionKind) -> Self {
                match kind {
                    $(SectionKind::$kind => $value,)+
                    SectionKind::Unknown(t) => t,
                }
            }
        }
    };
}

section_database!(
    /// Container of the chunk tables inside a Complex section.
    DecodeInstructionsContainer 0x01,
    /// One second-stage compressor byte per chunk.
    ChunkCompressorTable 0x02,
    /// One little-endian u32 chunk size per chunk.
    ChunkSizeTable 0x03,
    /// One little-endian u32 chunk offset per chunk.
    ChunkOffsetTable 0x04,
    /// Eight bytes: frame width then height.
    FrameDimensionsTable 0x05,
    /// Top-level container of sibling single-image sections.
    MultipleImages 0x0D,
);

/// Compressor class identifiers.
///
/// The same identifiers appear in the top nibble of a frame section's
/// type byte and as whole-byte entries in a chunk second-stage
/// compressor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    /// Data is stored uncompressed.
    None,
    /// Snappy compression.
    Snappy,
    /// Chunked frame carrying a Decode Instructions Container.
    Complex,
    /// Identifier not interpreted by this crate.
    Unknown(u8),
}

impl From<u8> for Compressor {
    fn from(id: u8) -> Self {
        match id {
            0x0A => Self::None,
            0x0B => Self::Snappy,
            0x0C => Self::Complex,
            other => Self::Unknown(other),
        }
    }
}

/// Texture formats named by the bottom nibble of a frame section's type
/// byte. The structural parser never interprets these; they are decoded
/// for callers only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    RgbDxt1,
    RgbaDxt5,
    YCoCgDxt5,
}

impl TextureFormat {
    /// Map a format identifier nibble to a format, if known.
    pub fn from_identifier(id: u8) -> Option<Self> {
        match id {
            0x0B => Some(Self::RgbDxt1),
            0x0E => Some(Self::RgbaDxt5),
            0x0F => Some(Self::YCoCgDxt5),
            _ => None,
        }
    }
}

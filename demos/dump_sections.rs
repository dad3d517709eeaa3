// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dump the section tree of a legacy Hap frame file.

use hap_legacy_parse::{read_section_header, subimage_at, subimage_count, ComplexSection, Compressor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: dump_sections <frame file>")?;
    let data = std::fs::read(&path)?;

    let header = read_section_header(&data)?;
    println!(
        "{path}: top-level section {:?}, {} payload bytes ({}-byte header)",
        header.kind, header.payload_len, header.header_len
    );

    let count = subimage_count(&data)?;
    for index in 0..count {
        let section = subimage_at(&data, index)?;
        println!(
            "  sub-image {index}: compressor {:?}, format {:?}, {} bytes",
            section.compressor(),
            section.texture_format(),
            section.payload.len()
        );
        if section.compressor() == Compressor::Complex {
            let complex = ComplexSection::parse(section.payload)?;
            println!(
                "    {} chunks, {} bytes of chunk data",
                complex.chunk_count(),
                complex.chunk_data().len()
            );
            for (i, chunk) in complex.chunks().enumerate() {
                println!(
                    "    chunk {i}: {:?}, offset {}, {} bytes",
                    chunk.compressor, chunk.offset, chunk.size
                );
            }
        }
    }
    Ok(())
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Print the dimensions stored in a legacy Hap frame file.

use hap_legacy_parse::frame_dimensions;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: frame_info <frame file>")?;
    let data = std::fs::read(&path)?;

    let dimensions = frame_dimensions(&data)?;
    if dimensions.is_present() {
        println!("{path}: {}x{}", dimensions.width, dimensions.height);
    } else {
        println!("{path}: no dimension metadata");
    }
    Ok(())
}

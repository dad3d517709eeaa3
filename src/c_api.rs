// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! C-compatible API for frame metadata queries.
//!
//! Every function takes a raw buffer pointer and length, returns a
//! [`HapStatus`], and writes results through out pointers. Out pointers
//! are filled with zeroes before parsing begins, so callers observe a
//! defined zero state whenever the status is not
//! [`HapStatus::NoError`].

use crate::{frame_dimensions, subimage_count, Error};

/// Status codes returned by the C API.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapStatus {
    NoError = 0,
    BadArguments = 1,
    BadFrame = 2,
}

impl From<Error> for HapStatus {
    fn from(err: Error) -> Self {
        match err {
            Error::BadArguments(_) => Self::BadArguments,
            Error::BadFrame(_) => Self::BadFrame,
        }
    }
}

/// Extract the dimensions of the frame in `buffer`.
///
/// Writes zero dimensions and reports `NoError` when the frame is valid
/// but carries no dimension metadata; writes zeroes with an error status
/// for null pointers, empty input, or malformed frames.
///
/// # Safety
///
/// `buffer` must either be null or point to `buffer_len` readable bytes,
/// and the out pointers must either be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hap_legacy_get_frame_dimensions(
    buffer: *const u8,
    buffer_len: usize,
    out_width: *mut u32,
    out_height: *mut u32,
) -> HapStatus {
    if out_width.is_null() || out_height.is_null() {
        return HapStatus::BadArguments;
    }
    // SAFETY: non-null checked above; writability is the caller's contract.
    unsafe {
        *out_width = 0;
        *out_height = 0;
    }
    if buffer.is_null() {
        return HapStatus::BadArguments;
    }
    // SAFETY: the caller guarantees `buffer_len` readable bytes at `buffer`.
    let data = unsafe { std::slice::from_raw_parts(buffer, buffer_len) };
    match frame_dimensions(data) {
        Ok(dimensions) => {
            // SAFETY: non-null checked above.
            unsafe {
                *out_width = dimensions.width;
                *out_height = dimensions.height;
            }
            HapStatus::NoError
        }
        Err(err) => err.into(),
    }
}

/// Count the sub-images in the frame in `buffer`.
///
/// # Safety
///
/// `buffer` must either be null or point to `buffer_len` readable bytes,
/// and `out_count` must either be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hap_legacy_get_subimage_count(
    buffer: *const u8,
    buffer_len: usize,
    out_count: *mut u32,
) -> HapStatus {
    if out_count.is_null() {
        return HapStatus::BadArguments;
    }
    // SAFETY: non-null checked above; writability is the caller's contract.
    unsafe {
        *out_count = 0;
    }
    if buffer.is_null() || buffer_len == 0 {
        return HapStatus::BadArguments;
    }
    // SAFETY: the caller guarantees `buffer_len` readable bytes at `buffer`.
    let data = unsafe { std::slice::from_raw_parts(buffer, buffer_len) };
    match subimage_count(data) {
        Ok(count) => {
            // SAFETY: non-null checked above.
            unsafe {
                *out_count = count;
            }
            HapStatus::NoError
        }
        Err(err) => err.into(),
    }
}

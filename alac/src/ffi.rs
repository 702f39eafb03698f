//! C interface.
//!
//! Declared in `include/alac.h`. A decoder is handed out as an opaque
//! pointer owning a boxed [`Decoder`]; it stays valid until passed to
//! [`alac_decoder_destroy`]. Calls on one handle must not overlap.

use std::{ptr, slice};

use log::debug;

use crate::process::FrameDecoder;
use crate::process::decode::Decoder;
use crate::structs::config::AlacSpecificConfig;
use crate::utils::errors::{ALAC_NO_ERR, ALAC_PARAM_ERROR, status_code};

/// Creates a decoder from a magic cookie.
///
/// Returns null if the cookie is rejected or memory runs out.
///
/// # Safety
///
/// `cookie` must point to `cookie_size` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn alac_decoder_create(cookie: *const u8, cookie_size: u32) -> *mut Decoder {
    if cookie.is_null() || cookie_size == 0 {
        return ptr::null_mut();
    }

    let cookie = unsafe { slice::from_raw_parts(cookie, cookie_size as usize) };

    match Decoder::create(cookie) {
        Ok(decoder) => Box::into_raw(Box::new(decoder)),
        Err(e) => {
            debug!("Rejected magic cookie: {e}");
            ptr::null_mut()
        }
    }
}

/// Decodes one compressed frame.
///
/// Writes interleaved little-endian samples to `sample_buffer` and the
/// number of samples per channel to `out_num_samples`. Returns 0 on success
/// or a negative status code.
///
/// # Safety
///
/// `decoder` must come from [`alac_decoder_create`] and not be destroyed.
/// `bits` must point to `len` readable bytes, `sample_buffer` must have room
/// for `num_samples * num_channels` output samples and `out_num_samples`
/// must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn alac_decoder_decode(
    decoder: *mut Decoder,
    bits: *const u8,
    len: u32,
    sample_buffer: *mut u8,
    num_samples: u32,
    num_channels: u32,
    out_num_samples: *mut u32,
) -> i32 {
    let Some(decoder) = (unsafe { decoder.as_mut() }) else {
        return ALAC_PARAM_ERROR;
    };

    if sample_buffer.is_null() || out_num_samples.is_null() || (bits.is_null() && len != 0) {
        return ALAC_PARAM_ERROR;
    }

    unsafe { *out_num_samples = 0 };

    let frame = if len == 0 {
        &[][..]
    } else {
        unsafe { slice::from_raw_parts(bits, len as usize) }
    };

    let Some(out_len) = decoder
        .config()
        .output_bytes_per_sample()
        .checked_mul(num_samples as usize)
        .and_then(|bytes| bytes.checked_mul(num_channels as usize))
    else {
        return ALAC_PARAM_ERROR;
    };
    let out = unsafe { slice::from_raw_parts_mut(sample_buffer, out_len) };

    match decoder.decode_frame(frame, out, num_samples, num_channels) {
        Ok(samples) => {
            unsafe { *out_num_samples = samples };
            ALAC_NO_ERR
        }
        Err(e) => {
            debug!("Failed to decode frame: {e}");
            status_code(&e)
        }
    }
}

/// Returns the parsed configuration of a decoder, or null for a null handle.
///
/// The pointer is valid until the decoder is destroyed.
///
/// # Safety
///
/// `decoder` must be null or come from [`alac_decoder_create`] and not be
/// destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn alac_decoder_get_config(
    decoder: *const Decoder,
) -> *const AlacSpecificConfig {
    match unsafe { decoder.as_ref() } {
        Some(decoder) => decoder.config(),
        None => ptr::null(),
    }
}

/// Releases a decoder. A null handle is ignored.
///
/// # Safety
///
/// `decoder` must be null or come from [`alac_decoder_create`], and must not
/// be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn alac_decoder_destroy(decoder: *mut Decoder) {
    if !decoder.is_null() {
        unsafe { Box::from_raw(decoder) }.destroy();
    }
}

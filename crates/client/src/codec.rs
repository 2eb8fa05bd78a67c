// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed frame codec for [`Package`]s.
//!
//! Frame layout:
//!
//! ```text
//! [ length : u32 little-endian ]      payload length of the rest
//! [ cmd    : u8 ]
//! [ flags  : u8 ]                     bit 0 = credentials present
//! [ correlation : 16 bytes ]          UUID, big-endian
//! [ if flags & 1:
//!     [ userLen : u8 ][ user : utf8 ]
//!     [ passLen : u8 ][ pass : utf8 ] ]
//! [ payload : remaining bytes ]
//! ```

use std::fmt;
use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

use crate::package::{Cmd, Credentials, Package};

/// Hard cap on a single frame. Anything larger is a protocol violation.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Frame bytes before credentials and payload: cmd, flags, correlation.
const HEADER_LEN: usize = 1 + 1 + 16;

const FLAG_CREDENTIALS: u8 = 0x01;

#[derive(Debug)]
pub enum CodecError {
    Io(io::Error),
    /// Frame body shorter than the fixed header, or a credential field
    /// running past the end of the frame.
    Truncated,
    FrameTooLarge(usize),
    /// Username or password longer than the u8 length prefix allows.
    CredentialsTooLong,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Truncated => f.write_str("truncated frame"),
            Self::FrameTooLarge(len) => {
                write!(f, "frame of {len} bytes exceeds {MAX_FRAME_LEN}")
            }
            Self::CredentialsTooLong => f.write_str("credential field exceeds 255 bytes"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Stateless codec; one instance per connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageCodec;

impl Decoder for PackageCodec {
    type Item = Package;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Package>, CodecError> {
        if src.len() < 4 {
            return Ok(None);
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&src[..4]);
        let frame_len = u32::from_le_bytes(len_bytes) as usize;
        if frame_len > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge(frame_len));
        }
        if src.len() < 4 + frame_len {
            src.reserve(4 + frame_len - src.len());
            return Ok(None);
        }
        src.advance(4);
        let frame = src.split_to(frame_len).freeze();
        decode_frame(frame).map(Some)
    }
}

impl Encoder<Package> for PackageCodec {
    type Error = CodecError;

    fn encode(&mut self, pkg: Package, dst: &mut BytesMut) -> Result<(), CodecError> {
        encode_package(&pkg, dst)
    }
}

/// Decode one frame body (length prefix already stripped).
pub fn decode_frame(mut frame: Bytes) -> Result<Package, CodecError> {
    if frame.len() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    let cmd = Cmd(frame.get_u8());
    let flags = frame.get_u8();
    let mut correlation_bytes = [0u8; 16];
    frame.copy_to_slice(&mut correlation_bytes);
    let correlation = Uuid::from_bytes(correlation_bytes);

    let credentials = if flags & FLAG_CREDENTIALS != 0 {
        let username = take_short_string(&mut frame)?;
        let password = take_short_string(&mut frame)?;
        Some(Credentials { username, password })
    } else {
        None
    };

    Ok(Package { cmd, correlation, payload: frame, credentials })
}

/// Append one length-prefixed frame for `pkg` to `dst`.
pub fn encode_package(pkg: &Package, dst: &mut BytesMut) -> Result<(), CodecError> {
    let creds_len = match &pkg.credentials {
        Some(c) => {
            if c.username.len() > u8::MAX as usize || c.password.len() > u8::MAX as usize {
                return Err(CodecError::CredentialsTooLong);
            }
            2 + c.username.len() + c.password.len()
        }
        None => 0,
    };
    let frame_len = HEADER_LEN + creds_len + pkg.payload.len();
    if frame_len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(frame_len));
    }

    dst.reserve(4 + frame_len);
    dst.put_u32_le(frame_len as u32);
    dst.put_u8(pkg.cmd.0);
    dst.put_u8(if pkg.credentials.is_some() { FLAG_CREDENTIALS } else { 0 });
    dst.put_slice(pkg.correlation.as_bytes());
    if let Some(c) = &pkg.credentials {
        dst.put_u8(c.username.len() as u8);
        dst.put_slice(c.username.as_bytes());
        dst.put_u8(c.password.len() as u8);
        dst.put_slice(c.password.as_bytes());
    }
    dst.put_slice(&pkg.payload);
    Ok(())
}

fn take_short_string(frame: &mut Bytes) -> Result<String, CodecError> {
    if frame.is_empty() {
        return Err(CodecError::Truncated);
    }
    let len = frame.get_u8() as usize;
    if frame.len() < len {
        return Err(CodecError::Truncated);
    }
    let raw = frame.split_to(len);
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod codec_tests;

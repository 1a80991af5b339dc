// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary particle-frame wire format.
//!
//! Header is a fixed 8 bytes: `{u32 magic, u16 version, u16 particle_count}`,
//! all little-endian, followed by `particle_count * 3` little-endian f32
//! values. One message per frame; partial frames are never emitted.

use aura_core::ParticleFrame;
use thiserror::Error;

/// Spells `0x53545033`; chosen so the header reads as ASCII-adjacent bytes
/// on the wire (`"STP3"` when viewed little-endian) — easy to spot in a
/// hex dump while debugging a capture.
pub const FRAME_MAGIC: u32 = 0x5354_5033;
pub const FRAME_VERSION: u16 = 1;

const HEADER_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameDecodeError {
    #[error("frame too short: {0} bytes, need at least {HEADER_LEN}")]
    TooShort(usize),

    #[error("bad magic: expected {FRAME_MAGIC:#x}, got {0:#x}")]
    BadMagic(u32),

    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u16),

    #[error("payload length {payload_len} does not match header particle_count {particle_count} (expected {expected} bytes)")]
    PayloadLengthMismatch { payload_len: usize, particle_count: u16, expected: usize },
}

/// Encode a whole frame: header + raw f32 payload, little-endian.
///
/// `particle_count` is truncated to `u16`; callers must keep frames at or
/// below `u16::MAX` particles, which the default of 10,000 comfortably is.
pub fn encode_frame(frame: &ParticleFrame) -> Vec<u8> {
    let particle_count = frame.particle_count() as u16;
    let mut buf = Vec::with_capacity(HEADER_LEN + frame.particle_count() * 3 * 4);
    buf.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
    buf.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    buf.extend_from_slice(&particle_count.to_le_bytes());
    for [x, y, z] in &frame.positions {
        buf.extend_from_slice(&x.to_le_bytes());
        buf.extend_from_slice(&y.to_le_bytes());
        buf.extend_from_slice(&z.to_le_bytes());
    }
    buf
}

/// Decode a whole frame from a received binary message.
pub fn decode_frame(bytes: &[u8]) -> Result<ParticleFrame, FrameDecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameDecodeError::TooShort(bytes.len()));
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != FRAME_MAGIC {
        return Err(FrameDecodeError::BadMagic(magic));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FRAME_VERSION {
        return Err(FrameDecodeError::UnsupportedVersion(version));
    }
    let particle_count = u16::from_le_bytes([bytes[6], bytes[7]]);
    let payload = &bytes[HEADER_LEN..];
    let expected = particle_count as usize * 3 * 4;
    if payload.len() != expected {
        return Err(FrameDecodeError::PayloadLengthMismatch {
            payload_len: payload.len(),
            particle_count,
            expected,
        });
    }

    let mut positions = Vec::with_capacity(particle_count as usize);
    for chunk in payload.chunks_exact(12) {
        let x = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let y = f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        let z = f32::from_le_bytes([chunk[8], chunk[9], chunk[10], chunk[11]]);
        positions.push([x, y, z]);
    }

    Ok(ParticleFrame { positions, seq: 0, generated_at_epoch_ms: 0 })
}

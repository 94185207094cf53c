// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire frame layout.
//!
//! One frame is a fixed 24-byte header followed by an optional payload:
//!
//! ```text
//!  0               2               4               8
//! +---------------+---------------+---------------+
//! |     magic     |     kind      |      seq      |
//! +---------------+---------------+---------------+
//!  8                              16              20              24
//! +-------------------------------+---------------+---------------+
//! |            offset             |    length     |  data_length  |
//! +-------------------------------+---------------+---------------+
//! ```
//!
//! All fields are big-endian. `length` is the block byte count the request
//! refers to; `data_length` is the number of payload bytes that follow the
//! header on the wire. For `Error` frames the payload is a UTF-8 reason.

use anyhow::{Result, bail};
use bytes::Bytes;
use zerocopy::{
    BigEndian, FromBytes as ZFromBytes, Immutable, IntoBytes, KnownLayout, U16, U32,
    U64,
};

use crate::models::kind::{FrameKind, UnknownKind};

/// Fixed frame header size in bytes.
pub const HEADER_LEN: usize = 24;

/// First two bytes of every frame.
pub const FRAME_MAGIC: u16 = 0xB10C;

/// Upper bound for `data_length` on inbound frames. A corrupt header must
/// not be able to trigger an arbitrarily large allocation.
pub const MAX_DATA_LEN: usize = 64 * 1024 * 1024;

/// Fixed-size frame header.
#[repr(C)]
#[derive(Debug, Default, PartialEq, ZFromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    pub magic: U16<BigEndian>,       // 0..2
    pub kind: U16<BigEndian>,        // 2..4
    pub seq: U32<BigEndian>,         // 4..8
    pub offset: U64<BigEndian>,      // 8..16
    pub length: U32<BigEndian>,      // 16..20
    pub data_length: U32<BigEndian>, // 20..24
}

impl FrameHeader {
    pub fn new(kind: FrameKind, seq: u32, offset: u64, length: u32) -> Self {
        FrameHeader {
            magic: U16::new(FRAME_MAGIC),
            kind: U16::new(kind.to_u16()),
            seq: U32::new(seq),
            offset: U64::new(offset),
            length: U32::new(length),
            data_length: U32::new(0),
        }
    }

    /// Serialize into a caller-provided `HEADER_LEN` buffer.
    pub fn to_wire_bytes(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() != HEADER_LEN {
            bail!("header buffer must be {HEADER_LEN} bytes, got {}", buf.len());
        }
        buf.copy_from_slice(self.as_bytes());
        Ok(())
    }

    /// Parse a header from the wire, validating the magic.
    pub fn from_wire_bytes(buf: &[u8]) -> Result<Self> {
        let hdr = FrameHeader::read_from_bytes(buf)
            .map_err(|e| anyhow::anyhow!("failed to read frame header: {e}"))?;
        if hdr.magic.get() != FRAME_MAGIC {
            bail!("bad frame magic 0x{:04x}", hdr.magic.get());
        }
        Ok(hdr)
    }

    /// Typed view of the kind field. Unknown raw values are preserved so
    /// the receive path can log and discard them without failing.
    #[inline]
    pub fn frame_kind(&self) -> Result<FrameKind, UnknownKind> {
        FrameKind::try_from(self.kind.get())
    }
}

/// One complete typed message on the wire.
#[derive(Debug)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    /// Build an outbound request frame. Write requests carry their data as
    /// payload; read requests carry none.
    pub fn request(
        kind: FrameKind,
        seq: u32,
        offset: u64,
        length: u32,
        payload: Bytes,
    ) -> Self {
        let mut header = FrameHeader::new(kind, seq, offset, length);
        header.data_length.set(payload.len() as u32);
        Frame { header, payload }
    }

    /// Build a response frame carrying `payload` for sequence `seq`.
    pub fn response(seq: u32, payload: Bytes) -> Self {
        let mut header = FrameHeader::new(FrameKind::Response, seq, 0, 0);
        header.length.set(payload.len() as u32);
        header.data_length.set(payload.len() as u32);
        Frame { header, payload }
    }

    /// Build an error frame whose payload is a UTF-8 reason.
    pub fn error(seq: u32, reason: &str) -> Self {
        let mut header = FrameHeader::new(FrameKind::Error, seq, 0, 0);
        header.data_length.set(reason.len() as u32);
        Frame {
            header,
            payload: Bytes::copy_from_slice(reason.as_bytes()),
        }
    }

    /// Build an end-of-stream marker frame.
    pub fn eof(seq: u32) -> Self {
        Frame {
            header: FrameHeader::new(FrameKind::Eof, seq, 0, 0),
            payload: Bytes::new(),
        }
    }

    #[inline]
    pub fn seq(&self) -> u32 {
        self.header.seq.get()
    }

    #[inline]
    pub fn frame_kind(&self) -> Result<FrameKind, UnknownKind> {
        self.header.frame_kind()
    }
}

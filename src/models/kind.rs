// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Frame kind codes for the block RPC protocol.
//!
//! Every frame starts with a 16-bit kind field. Callers only ever originate
//! `Read` and `Write`; `Response`, `Error` and `Eof` appear on inbound
//! frames only.

use core::fmt;
use std::convert::TryFrom;

use thiserror::Error;

/// All frame kinds understood by this client.
#[repr(u16)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    #[default]
    Read = 0x01,
    Write = 0x02,
    Response = 0x03,
    Error = 0x04,
    Eof = 0x05,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown frame kind 0x{0:04x}")]
pub struct UnknownKind(pub u16);

impl FrameKind {
    /// True for the kinds a caller may submit.
    #[inline]
    pub fn is_request(self) -> bool {
        matches!(self, FrameKind::Read | FrameKind::Write)
    }

    #[inline]
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for FrameKind {
    type Error = UnknownKind;

    fn try_from(raw: u16) -> Result<Self, UnknownKind> {
        Ok(match raw {
            0x01 => Self::Read,
            0x02 => Self::Write,
            0x03 => Self::Response,
            0x04 => Self::Error,
            0x05 => Self::Eof,
            other => return Err(UnknownKind(other)),
        })
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameKind::Read => "Read",
            FrameKind::Write => "Write",
            FrameKind::Response => "Response",
            FrameKind::Error => "Error",
            FrameKind::Eof => "Eof",
        })
    }
}

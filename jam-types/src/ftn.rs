//! FTN (FidoNet Technology Network) packet entities (spec.md §3.4, §4.4).

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attribute::Attribute;
use crate::subfield::Subfield;

/// A 4D FTN node address, `zone:net/node.point`. `.point` is omitted in
/// `Display` when zero, matching conventional FTN address rendering.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FtnAddress {
    pub zone: u16,
    pub net: u16,
    pub node: u16,
    pub point: u16,
}

impl FtnAddress {
    pub const fn new(zone: u16, net: u16, node: u16, point: u16) -> Self {
        Self {
            zone,
            net,
            node,
            point,
        }
    }

    /// Two-dimensional `net/node` address, as used in `SEEN-BY` sorting.
    pub fn two_d(&self) -> (u16, u16) {
        (self.net, self.node)
    }
}

impl fmt::Display for FtnAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.zone, self.net, self.node)?;
        if self.point != 0 {
            write!(f, ".{}", self.point)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum FtnAddressError {
    #[error("malformed FTN address: {0:?}")]
    Malformed(String),
}

impl FromStr for FtnAddress {
    type Err = FtnAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || FtnAddressError::Malformed(s.to_string());
        let (zone, rest) = s.split_once(':').ok_or_else(err)?;
        let (net, rest) = rest.split_once('/').ok_or_else(err)?;
        let (node, point) = match rest.split_once('.') {
            Some((n, p)) => (n, p.parse().map_err(|_| err())?),
            None => (rest, 0),
        };
        Ok(FtnAddress {
            zone: zone.parse().map_err(|_| err())?,
            net: net.parse().map_err(|_| err())?,
            node: node.parse().map_err(|_| err())?,
            point,
        })
    }
}

/// FTN Type-2 packet header (58 bytes, little-endian).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PacketHeader {
    pub orig: FtnAddress,
    pub dest: FtnAddress,
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub baud: u16,
    /// Always `0x0002` for the packets this core produces and accepts.
    pub packet_type: u16,
    pub product_code: u16,
    pub revision_major: u8,
    pub revision_minor: u8,
    pub password: [u8; 8],
    pub capability_word: u16,
}

/// Packet type tag this core reads/writes.
pub const PACKET_TYPE_2: u16 = 0x0002;

impl PacketHeader {
    pub fn new(orig: FtnAddress, dest: FtnAddress) -> Self {
        Self {
            orig,
            dest,
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            baud: 0,
            packet_type: PACKET_TYPE_2,
            product_code: 0,
            revision_major: 0,
            revision_minor: 0,
            password: [0; 8],
            capability_word: 0,
        }
    }
}

/// A decoded in-packet message, before it is translated into a JAM draft
/// or before it is encoded for export. `kludges` holds every `\x01` line
/// in encounter order (including ones this core does not interpret, so
/// they still round-trip); `seen_by`/`path` are the trailing echomail
/// routing lines, already split out of the visible body.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawMessage {
    pub orig: FtnAddress,
    pub dest: FtnAddress,
    pub attribute: Attribute,
    pub cost: u16,
    /// Raw FTN date-time string, e.g. `"27 Jul 26  21:04:11"`.
    pub date: String,
    pub to_user_name: String,
    pub from_user_name: String,
    pub subject: String,
    /// `Some(tag)` when the text body opened with an `AREA:<tag>` line.
    pub area_tag: Option<String>,
    pub kludges: Vec<Subfield>,
    /// Visible text, CR-terminated lines, tearline/origin line included.
    pub body: Vec<u8>,
    pub seen_by: Vec<FtnAddress>,
    pub path: Vec<FtnAddress>,
}

//! Message header subfields.
//!
//! Each subfield on disk is `LoID:u16, HiID:u16, DataLen:u32, Bytes[DataLen]`.
//! [`Subfield`] is a tagged variant for the kinds this core cares about,
//! plus an [`Subfield::Opaque`] catch-all that preserves anything else
//! (including vendor-private `LoID`s above `0x07FF`) byte-for-byte.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Known `LoID` values, per the JAM specification (`HiID` is reserved and
/// must be zero for all of these).
pub mod lo_id {
    pub const OADDRESS: u16 = 0;
    pub const DADDRESS: u16 = 1;
    pub const SENDER_NAME: u16 = 2;
    pub const RECEIVER_NAME: u16 = 3;
    pub const MSGID: u16 = 4;
    pub const REPLYID: u16 = 5;
    pub const SUBJECT: u16 = 6;
    pub const PID: u16 = 7;
    pub const TRCVD_BY: u16 = 8;
    pub const FTSC_KLUDGE: u16 = 2000;
    pub const SEEN_BY2D: u16 = 2001;
    pub const PATH2D: u16 = 2002;
    /// Vendor-private `LoID`s start here and must round-trip unchanged.
    pub const VENDOR_PRIVATE_START: u16 = 0x0800;
}

/// A decoded message header subfield.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Subfield {
    OAddress(Vec<u8>),
    DAddress(Vec<u8>),
    SenderName(Vec<u8>),
    ReceiverName(Vec<u8>),
    MsgId(Vec<u8>),
    ReplyId(Vec<u8>),
    Subject(Vec<u8>),
    Pid(Vec<u8>),
    TrcvdBy(Vec<u8>),
    /// An FTSC kludge line that was not one of the recognised kinds above.
    Ftsc(Vec<u8>),
    SeenBy(Vec<u8>),
    Path(Vec<u8>),
    /// Anything else, including vendor-private `LoID`s (`>= 0x0800`).
    /// `hi_id` is carried even though the spec requires it to be zero for
    /// the IDs this core interprets, so a foreign writer's non-zero value
    /// on an opaque field still round-trips.
    Opaque { lo_id: u16, hi_id: u16, data: Vec<u8> },
}

impl Subfield {
    pub fn lo_id(&self) -> u16 {
        use lo_id::*;
        match self {
            Subfield::OAddress(_) => OADDRESS,
            Subfield::DAddress(_) => DADDRESS,
            Subfield::SenderName(_) => SENDER_NAME,
            Subfield::ReceiverName(_) => RECEIVER_NAME,
            Subfield::MsgId(_) => MSGID,
            Subfield::ReplyId(_) => REPLYID,
            Subfield::Subject(_) => SUBJECT,
            Subfield::Pid(_) => PID,
            Subfield::TrcvdBy(_) => TRCVD_BY,
            Subfield::Ftsc(_) => FTSC_KLUDGE,
            Subfield::SeenBy(_) => SEEN_BY2D,
            Subfield::Path(_) => PATH2D,
            Subfield::Opaque { lo_id, .. } => *lo_id,
        }
    }

    pub fn hi_id(&self) -> u16 {
        match self {
            Subfield::Opaque { hi_id, .. } => *hi_id,
            _ => 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Subfield::OAddress(d)
            | Subfield::DAddress(d)
            | Subfield::SenderName(d)
            | Subfield::ReceiverName(d)
            | Subfield::MsgId(d)
            | Subfield::ReplyId(d)
            | Subfield::Subject(d)
            | Subfield::Pid(d)
            | Subfield::TrcvdBy(d)
            | Subfield::Ftsc(d)
            | Subfield::SeenBy(d)
            | Subfield::Path(d) => d,
            Subfield::Opaque { data, .. } => data,
        }
    }

    /// Build a [`Subfield`] from a raw `(lo_id, hi_id, data)` triple, the
    /// way the decoder sees it on the wire. `hi_id` must be zero for any
    /// `lo_id` this core recognises; a non-zero value on a recognised
    /// `lo_id` is treated as opaque so it still round-trips.
    pub fn from_raw(lo_id: u16, hi_id: u16, data: Vec<u8>) -> Self {
        use lo_id::*;
        if hi_id == 0 {
            match lo_id {
                OADDRESS => return Subfield::OAddress(data),
                DADDRESS => return Subfield::DAddress(data),
                SENDER_NAME => return Subfield::SenderName(data),
                RECEIVER_NAME => return Subfield::ReceiverName(data),
                MSGID => return Subfield::MsgId(data),
                REPLYID => return Subfield::ReplyId(data),
                SUBJECT => return Subfield::Subject(data),
                PID => return Subfield::Pid(data),
                TRCVD_BY => return Subfield::TrcvdBy(data),
                FTSC_KLUDGE => return Subfield::Ftsc(data),
                SEEN_BY2D => return Subfield::SeenBy(data),
                PATH2D => return Subfield::Path(data),
                _ => {}
            }
        }
        Subfield::Opaque { lo_id, hi_id, data }
    }

    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_round_trips_by_construction() {
        let sf = Subfield::from_raw(lo_id::MSGID, 0, b"1:1/1 1".to_vec());
        assert_eq!(sf, Subfield::MsgId(b"1:1/1 1".to_vec()));
        assert_eq!(sf.lo_id(), lo_id::MSGID);
    }

    #[test]
    fn vendor_private_is_opaque() {
        let sf = Subfield::from_raw(0x0900, 0, b"x".to_vec());
        assert!(matches!(sf, Subfield::Opaque { .. }));
    }

    #[test]
    fn nonzero_hi_id_forces_opaque() {
        let sf = Subfield::from_raw(lo_id::SUBJECT, 3, b"weird".to_vec());
        assert_eq!(
            sf,
            Subfield::Opaque {
                lo_id: lo_id::SUBJECT,
                hi_id: 3,
                data: b"weird".to_vec()
            }
        );
    }
}

//! Subfield wire format: `LoID:u16, HiID:u16, DataLen:u32, Bytes[DataLen]`.

use jam_types::Subfield;

use crate::codec::{Decode, Encode};
use crate::error::{DecodeError, EncodeError};

const WHAT: &str = "JAM subfield";
const PREFIX_LEN: usize = 2 + 2 + 4;

impl<'a> Decode<'a> for Subfield {
    fn decode(input: &'a [u8]) -> Result<(&'a [u8], Self), DecodeError> {
        if input.len() < PREFIX_LEN {
            return Err(DecodeError::TooShort {
                what: WHAT,
                need: PREFIX_LEN,
                got: input.len(),
            });
        }
        let lo_id = u16::from_le_bytes([input[0], input[1]]);
        let hi_id = u16::from_le_bytes([input[2], input[3]]);
        let data_len = u32::from_le_bytes([input[4], input[5], input[6], input[7]]) as usize;
        let rest = &input[PREFIX_LEN..];
        if rest.len() < data_len {
            return Err(DecodeError::LengthOverrun {
                what: WHAT,
                claimed: data_len,
                available: rest.len(),
            });
        }
        let (data, rest) = rest.split_at(data_len);
        Ok((rest, Subfield::from_raw(lo_id, hi_id, data.to_vec())))
    }
}

impl Encode for Subfield {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        let data = self.data();
        if data.len() > u32::MAX as usize {
            return Err(EncodeError::TooLong {
                what: WHAT,
                len: data.len(),
                prefix_bits: 32,
            });
        }
        buf.extend_from_slice(&self.lo_id().to_le_bytes());
        buf.extend_from_slice(&self.hi_id().to_le_bytes());
        buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        buf.extend_from_slice(data);
        Ok(())
    }
}

/// Decode a back-to-back run of subfields occupying exactly
/// `byte_count` bytes, as found after a message header's fixed prefix.
pub fn decode_subfields(input: &[u8], byte_count: usize) -> Result<Vec<Subfield>, DecodeError> {
    if input.len() < byte_count {
        return Err(DecodeError::LengthOverrun {
            what: "JAM subfield region",
            claimed: byte_count,
            available: input.len(),
        });
    }
    let mut region = &input[..byte_count];
    let mut out = Vec::new();
    while !region.is_empty() {
        let (rest, sf) = Subfield::decode(region)?;
        out.push(sf);
        region = rest;
    }
    Ok(out)
}

/// Encode a run of subfields, returning the encoded bytes (the caller
/// uses their length as the message header's `SubfieldByteCount`).
pub fn encode_subfields(subfields: &[Subfield]) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    for sf in subfields {
        sf.encode(&mut buf)?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_subfield_round_trips() {
        let sf = Subfield::Subject(b"hello".to_vec());
        let mut buf = Vec::new();
        sf.encode(&mut buf).unwrap();
        let (rest, decoded) = Subfield::decode(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, sf);
    }

    #[test]
    fn region_of_several_subfields_round_trips() {
        let fields = vec![
            Subfield::MsgId(b"1:1/1 1".to_vec()),
            Subfield::Subject(b"re: hi".to_vec()),
            Subfield::Opaque {
                lo_id: 0x0900,
                hi_id: 0,
                data: b"vendor".to_vec(),
            },
        ];
        let bytes = encode_subfields(&fields).unwrap();
        let decoded = decode_subfields(&bytes, bytes.len()).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn truncated_region_is_length_overrun() {
        let fields = vec![Subfield::Subject(b"hello".to_vec())];
        let bytes = encode_subfields(&fields).unwrap();
        assert!(decode_subfields(&bytes, bytes.len() + 1).is_err());
    }
}

//! Allow-list records stored as CompactBytesArrays.
//!
//! `AllowedCalls` elements are fixed 32-byte records:
//! `bytes4 callTypes ++ bytes20 address ++ bytes4 standard ++ bytes4 selector`.
//! `AllowedERC725YDataKeys` elements are 1..=32 byte prefixes matched against the leading bytes
//! of a data key; a 32-byte element is an exact match.

use core::ops::BitOr;

use alloy_primitives::{Address, FixedBytes, B256};

use crate::compact::{self, CodecError, CompactBytes};

/// Any address.
pub const WILDCARD_ADDRESS: Address = Address::new([0xff; 20]);
/// Any interface id.
pub const WILDCARD_STANDARD: FixedBytes<4> = FixedBytes([0xff; 4]);
/// Any function selector.
pub const WILDCARD_SELECTOR: FixedBytes<4> = FixedBytes([0xff; 4]);

/// Longest allowed data-key pattern.
pub const MAX_DATA_KEY_PATTERN_LENGTH: usize = 32;

/// Call-type restriction bits of an AllowedCall record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CallTypes(u32);

impl CallTypes {
    pub const NONE: CallTypes = CallTypes(0);
    pub const VALUE: CallTypes = CallTypes(0x1);
    pub const CALL: CallTypes = CallTypes(0x2);
    pub const STATICCALL: CallTypes = CallTypes(0x4);
    pub const DELEGATECALL: CallTypes = CallTypes(0x8);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: CallTypes) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CallTypes {
    type Output = CallTypes;

    fn bitor(self, rhs: CallTypes) -> CallTypes {
        CallTypes(self.0 | rhs.0)
    }
}

/// One `AddressPermissions:AllowedCalls` entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AllowedCall {
    pub call_types: CallTypes,
    pub address: Address,
    pub standard: FixedBytes<4>,
    pub selector: FixedBytes<4>,
}

impl AllowedCall {
    pub const ENCODED_LEN: usize = 32;

    /// Entry matching every target, standard and selector for the given call types.
    pub const fn any(call_types: CallTypes) -> Self {
        Self {
            call_types,
            address: WILDCARD_ADDRESS,
            standard: WILDCARD_STANDARD,
            selector: WILDCARD_SELECTOR,
        }
    }

    /// Parse a 32-byte record.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        let mut call_types = [0u8; 4];
        call_types.copy_from_slice(&bytes[0..4]);
        Some(Self {
            call_types: CallTypes(u32::from_be_bytes(call_types)),
            address: Address::from_slice(&bytes[4..24]),
            standard: FixedBytes::from_slice(&bytes[24..28]),
            selector: FixedBytes::from_slice(&bytes[28..32]),
        })
    }

    pub fn encode(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0..4].copy_from_slice(&self.call_types.0.to_be_bytes());
        out[4..24].copy_from_slice(self.address.as_slice());
        out[24..28].copy_from_slice(self.standard.as_slice());
        out[28..32].copy_from_slice(self.selector.as_slice());
        out
    }

    /// Address, standard and selector all zero: the entry restricts nothing meaningful and is
    /// treated as a broken configuration.
    pub fn is_zero_restriction(&self) -> bool {
        self.address == Address::ZERO
            && self.standard == FixedBytes::ZERO
            && self.selector == FixedBytes::ZERO
    }

    #[inline]
    pub fn permits_call_types(&self, required: CallTypes) -> bool {
        self.call_types.contains(required)
    }

    #[inline]
    pub fn matches_address(&self, target: Address) -> bool {
        self.address == WILDCARD_ADDRESS || self.address == target
    }

    #[inline]
    pub fn matches_selector(&self, selector: FixedBytes<4>) -> bool {
        self.selector == WILDCARD_SELECTOR || self.selector == selector
    }

    #[inline]
    pub fn any_standard(&self) -> bool {
        self.standard == WILDCARD_STANDARD
    }
}

/// Decode an `AllowedCalls` value; every element must be a 32-byte record.
pub fn decode_allowed_calls(buffer: &[u8]) -> Result<Vec<AllowedCall>, CodecError> {
    let mut offset = 0usize;
    let mut calls = Vec::new();
    for element in CompactBytes::new(buffer) {
        let element = element?;
        let call = AllowedCall::decode(element).ok_or(CodecError::UnexpectedElementLength {
            offset,
            length: element.len(),
            expected: AllowedCall::ENCODED_LEN,
        })?;
        offset += 2 + element.len();
        calls.push(call);
    }
    Ok(calls)
}

pub fn encode_allowed_calls(calls: &[AllowedCall]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(calls.len() * (2 + AllowedCall::ENCODED_LEN));
    for call in calls {
        buf.extend_from_slice(&(AllowedCall::ENCODED_LEN as u16).to_be_bytes());
        buf.extend_from_slice(&call.encode());
    }
    buf
}

/// Decode an `AllowedERC725YDataKeys` value into its 1..=32 byte patterns.
pub fn decode_allowed_data_keys(buffer: &[u8]) -> Result<Vec<&[u8]>, CodecError> {
    compact::decode_with_limit(buffer, MAX_DATA_KEY_PATTERN_LENGTH)
}

pub fn encode_allowed_data_keys<T: AsRef<[u8]>>(patterns: &[T]) -> Result<Vec<u8>, CodecError> {
    if let Some(too_long) = patterns
        .iter()
        .map(|p| p.as_ref().len())
        .find(|len| *len > MAX_DATA_KEY_PATTERN_LENGTH)
    {
        return Err(CodecError::ElementTooLarge {
            length: too_long,
            max: MAX_DATA_KEY_PATTERN_LENGTH,
        });
    }
    compact::encode(patterns)
}

/// Dynamic prefix match for patterns shorter than 32 bytes, exact match for 32-byte patterns.
#[inline]
pub fn data_key_matches(pattern: &[u8], key: &B256) -> bool {
    !pattern.is_empty() && key.as_slice().starts_with(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, fixed_bytes};

    #[test]
    fn record_layout() {
        let call = AllowedCall {
            call_types: CallTypes::CALL | CallTypes::VALUE,
            address: address!("cafecafecafecafecafecafecafecafecafecafe"),
            standard: fixed_bytes!("24871b3d"),
            selector: fixed_bytes!("a9059cbb"),
        };
        let encoded = call.encode();
        assert_eq!(&encoded[0..4], &[0, 0, 0, 3]);
        assert_eq!(&encoded[28..32], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(AllowedCall::decode(&encoded), Some(call));
    }

    #[test]
    fn allowed_calls_reject_wrong_element_size() {
        let mut buffer = encode_allowed_calls(&[AllowedCall::any(CallTypes::CALL)]);
        buffer.extend_from_slice(&[0x00, 0x02, 0xaa, 0xbb]);
        assert_eq!(
            decode_allowed_calls(&buffer),
            Err(CodecError::UnexpectedElementLength {
                offset: 34,
                length: 2,
                expected: 32
            })
        );
    }

    #[test]
    fn wildcard_entry_matches_everything() {
        let call = AllowedCall::any(CallTypes::CALL);
        assert!(call.matches_address(Address::repeat_byte(0x12)));
        assert!(call.matches_selector(fixed_bytes!("deadbeef")));
        assert!(call.any_standard());
    }

    #[test]
    fn call_types_must_cover_every_required_bit() {
        let call = AllowedCall::any(CallTypes::VALUE);
        assert!(call.permits_call_types(CallTypes::VALUE));
        assert!(!call.permits_call_types(CallTypes::VALUE | CallTypes::CALL));
    }

    #[test]
    fn data_key_prefix_and_exact_matching() {
        let key = b256!("aaaabbbb00000000000000000000000000000000000000000000000000000001");
        assert!(data_key_matches(&[0xaa, 0xaa], &key));
        assert!(!data_key_matches(&[0xaa, 0xab], &key));
        assert!(data_key_matches(key.as_slice(), &key));
        let mut other = key;
        other.0[31] = 2;
        assert!(!data_key_matches(key.as_slice(), &other));
    }

    #[test]
    fn data_key_patterns_are_capped_at_32_bytes() {
        assert!(encode_allowed_data_keys(&[vec![0u8; 33]]).is_err());
        let encoded = encode_allowed_data_keys(&[vec![1u8; 32], vec![2u8; 4]]).unwrap();
        assert_eq!(decode_allowed_data_keys(&encoded).unwrap().len(), 2);
    }
}

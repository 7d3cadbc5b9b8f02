//! CompactBytesArray codec.
//!
//! An ordered list of byte strings, each prefixed by its length as a big-endian `u16`:
//! `len0 (2B) ++ elem0 ++ len1 (2B) ++ elem1 ++ ...`
//!
//! A buffer is well-formed iff it splits into such pairs with no leftover bytes and no
//! zero-length element. Malformed input is always rejected, never truncated.

/// Largest element representable with a 2-byte length prefix.
pub const MAX_ELEMENT_LENGTH: usize = u16::MAX as usize;

/// Errors while decoding or encoding a CompactBytesArray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("truncated length prefix at offset {offset}")]
    MalformedLength { offset: usize },
    #[error("element at offset {offset} declares {length} bytes but only {available} remain")]
    MalformedElement {
        offset: usize,
        length: usize,
        available: usize,
    },
    #[error("zero-length element at offset {offset}")]
    ZeroLengthElement { offset: usize },
    #[error("element of {length} bytes exceeds the {max} byte limit")]
    ElementTooLarge { length: usize, max: usize },
    #[error("element at offset {offset} is {length} bytes, expected {expected}")]
    UnexpectedElementLength {
        offset: usize,
        length: usize,
        expected: usize,
    },
}

/// Streaming view over a CompactBytesArray.
///
/// Yields borrowed elements; after the first error the iterator is exhausted.
#[derive(Clone, Debug)]
pub struct CompactBytes<'a> {
    buffer: &'a [u8],
    offset: usize,
    max_element_length: usize,
    failed: bool,
}

impl<'a> CompactBytes<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_limit(buffer, MAX_ELEMENT_LENGTH)
    }

    /// Reject any element longer than `max_element_length`.
    pub fn with_limit(buffer: &'a [u8], max_element_length: usize) -> Self {
        Self {
            buffer,
            offset: 0,
            max_element_length,
            failed: false,
        }
    }

    fn read_element(&mut self) -> Result<&'a [u8], CodecError> {
        let start = self.offset;
        let length = read_u16(self.buffer, &mut self.offset)? as usize;
        if length == 0 {
            return Err(CodecError::ZeroLengthElement { offset: start });
        }
        if length > self.max_element_length {
            return Err(CodecError::ElementTooLarge {
                length,
                max: self.max_element_length,
            });
        }
        read_slice(self.buffer, &mut self.offset, length)
    }
}

impl<'a> Iterator for CompactBytes<'a> {
    type Item = Result<&'a [u8], CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }
        let item = self.read_element();
        self.failed = item.is_err();
        Some(item)
    }
}

fn read_u16(bytes: &[u8], i: &mut usize) -> Result<u16, CodecError> {
    if bytes.len() < *i + 2 {
        return Err(CodecError::MalformedLength { offset: *i });
    }
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[*i..*i + 2]);
    *i += 2;
    Ok(u16::from_be_bytes(buf))
}

fn read_slice<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8], CodecError> {
    if bytes.len() < *i + len {
        return Err(CodecError::MalformedElement {
            offset: *i - 2,
            length: len,
            available: bytes.len() - *i,
        });
    }
    let out = &bytes[*i..*i + len];
    *i += len;
    Ok(out)
}

/// Decode every element of `buffer`.
pub fn decode(buffer: &[u8]) -> Result<Vec<&[u8]>, CodecError> {
    decode_with_limit(buffer, MAX_ELEMENT_LENGTH)
}

pub fn decode_with_limit(buffer: &[u8], max_element_length: usize) -> Result<Vec<&[u8]>, CodecError> {
    CompactBytes::with_limit(buffer, max_element_length).collect()
}

/// Same scan as [`decode_with_limit`] without collecting the elements.
pub fn is_well_formed(buffer: &[u8], max_element_length: usize) -> bool {
    CompactBytes::with_limit(buffer, max_element_length).all(|element| element.is_ok())
}

/// Concatenate each element behind its 2-byte big-endian length.
pub fn encode<T: AsRef<[u8]>>(elements: &[T]) -> Result<Vec<u8>, CodecError> {
    let total: usize = elements.iter().map(|e| e.as_ref().len() + 2).sum();
    let mut buf = Vec::with_capacity(total);
    for element in elements {
        let element = element.as_ref();
        if element.len() > MAX_ELEMENT_LENGTH {
            return Err(CodecError::ElementTooLarge {
                length: element.len(),
                max: MAX_ELEMENT_LENGTH,
            });
        }
        buf.extend_from_slice(&(element.len() as u16).to_be_bytes());
        buf.extend_from_slice(element);
    }
    Ok(buf)
}

//! A minimal definite-length DER reader. The envelope fields must end up in
//! the store byte-for-byte as they appeared on the wire, so this module only
//! ever hands out exact sub-slices of the input; it never re-encodes.
//! High-tag-number identifiers and indefinite lengths are rejected: neither
//! occurs in DER.

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;
/// `[0]`, constructed.
pub const TAG_CTX_0: u8 = 0xa0;
/// `[1]`, constructed.
pub const TAG_CTX_1: u8 = 0xa1;
/// `[0]`, primitive.
pub const TAG_CTX_0_PRIMITIVE: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DerError {
	#[error("truncated input")]
	Truncated,
	#[error("indefinite length is not DER")]
	IndefiniteLength,
	#[error("unsupported length encoding")]
	UnsupportedLength,
	#[error("high-tag-number identifiers are unsupported")]
	UnsupportedTag,
	#[error("expected tag {expected:#04x}, found {found:#04x}")]
	UnexpectedTag { expected: u8, found: u8 },
}

/// One tag-length-value triplet, borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
	/// The identifier octet (class, constructed bit and tag number).
	pub tag: u8,
	/// The complete encoding, header included.
	pub raw: &'a [u8],
	/// The content octets.
	pub content: &'a [u8],
}

/// Read one TLV off the front of `input`; returns it and the rest.
pub fn read_tlv(input: &[u8]) -> Result<(Tlv<'_>, &[u8]), DerError> {
	let tag = *input.first().ok_or(DerError::Truncated)?;
	if tag & 0x1f == 0x1f {
		return Err(DerError::UnsupportedTag);
	}
	let first_len = *input.get(1).ok_or(DerError::Truncated)?;
	let (header_len, content_len) = match first_len {
		0x80 => return Err(DerError::IndefiniteLength),
		n if n < 0x80 => (2usize, n as usize),
		n => {
			let len_octets = (n & 0x7f) as usize;
			// 2^32 of content is far beyond any bundle
			if len_octets > 4 {
				return Err(DerError::UnsupportedLength);
			}
			let mut content_len = 0usize;
			for i in 0..len_octets {
				let octet = *input.get(2 + i).ok_or(DerError::Truncated)?;
				content_len = content_len << 8 | octet as usize;
			}
			(2 + len_octets, content_len)
		},
	};
	let total = header_len.checked_add(content_len).ok_or(DerError::UnsupportedLength)?;
	if input.len() < total {
		return Err(DerError::Truncated);
	}
	Ok((
		Tlv {
			tag,
			raw: &input[..total],
			content: &input[header_len..total],
		},
		&input[total..],
	))
}

/// Read one TLV and require its identifier octet.
pub fn read_expected(input: &[u8], expected: u8) -> Result<(Tlv<'_>, &[u8]), DerError> {
	let (tlv, rest) = read_tlv(input)?;
	if tlv.tag != expected {
		return Err(DerError::UnexpectedTag {
			expected,
			found: tlv.tag,
		});
	}
	Ok((tlv, rest))
}

/// Iterate the TLVs inside a constructed value's content.
pub fn iter(content: &[u8]) -> TlvIter<'_> {
	TlvIter { rest: content }
}

pub struct TlvIter<'a> {
	rest: &'a [u8],
}

impl<'a> Iterator for TlvIter<'a> {
	type Item = Result<Tlv<'a>, DerError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.rest.is_empty() {
			return None;
		}
		match read_tlv(self.rest) {
			Ok((tlv, rest)) => {
				self.rest = rest;
				Some(Ok(tlv))
			},
			Err(e) => {
				// stop after an error
				self.rest = &[];
				Some(Err(e))
			},
		}
	}
}

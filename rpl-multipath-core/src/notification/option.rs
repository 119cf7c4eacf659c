use std::fmt;
use thiserror::Error;

/// Type byte of the packet count sub-option.
///
/// The value is assigned by the host routing protocol, it only needs to be
/// the same on both ends of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketCountOptionType(u8);

impl PacketCountOptionType {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[inline]
    pub fn into_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PacketCountOptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// The sub-option a child appends to its upward report.
///
/// It carries the number of packets the child forwarded toward its parent
/// since the previous exchange. The layout is fixed:
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Option Type  |  Length (= 2) |      Packet Count (u16 BE)    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Integers use network byte order, like the rest of the routing messages.
///
/// ```
/// # use rpl_multipath_core::notification::{PacketCountOption, PacketCountOptionType};
/// let option = PacketCountOption::new(PacketCountOptionType::new(0x0A), 0x0102);
/// assert_eq!(option.to_bytes(), [0x0A, 0x02, 0x01, 0x02]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketCountOption {
    option_type: PacketCountOptionType,
    count: u16,
}

/// Error returned when a packet count sub-option cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionDecodeError {
    #[error("sub-option truncated: {available} bytes available, {required} required")]
    Truncated { available: usize, required: usize },
    #[error("unexpected sub-option type {found}, expecting {expected}")]
    UnexpectedType {
        expected: PacketCountOptionType,
        found: PacketCountOptionType,
    },
    #[error("invalid sub-option length {length}, expecting {}", PacketCountOption::PAYLOAD_LEN)]
    InvalidLength { length: u8 },
}

/// Error returned when the output buffer cannot hold the sub-option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("buffer too small for the sub-option: {available} bytes available, {required} required")]
pub struct OptionEncodeError {
    available: usize,
    required: usize,
}

impl PacketCountOption {
    /// Value of the length byte.
    pub const PAYLOAD_LEN: u8 = 2;

    /// Size of the encoded sub-option, type and length bytes included.
    pub const ENCODED_LEN: usize = 2 + Self::PAYLOAD_LEN as usize;

    /// Build the sub-option. Counts above [`u16::MAX`] saturate.
    pub fn new(option_type: PacketCountOptionType, count: u32) -> Self {
        Self {
            option_type,
            count: u16::try_from(count).unwrap_or(u16::MAX),
        }
    }

    #[inline]
    pub fn option_type(&self) -> PacketCountOptionType {
        self.option_type
    }

    #[inline]
    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let [high, low] = self.count.to_be_bytes();
        [self.option_type.into_u8(), Self::PAYLOAD_LEN, high, low]
    }

    /// Write the sub-option at the start of `buffer` and return the number
    /// of bytes written.
    ///
    /// # Errors
    ///
    /// Fails if `buffer` is shorter than [`PacketCountOption::ENCODED_LEN`].
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, OptionEncodeError> {
        let Some(out) = buffer.get_mut(..Self::ENCODED_LEN) else {
            return Err(OptionEncodeError {
                available: buffer.len(),
                required: Self::ENCODED_LEN,
            });
        };
        out.copy_from_slice(&self.to_bytes());
        Ok(Self::ENCODED_LEN)
    }

    /// Decode the sub-option starting at the first byte of `bytes`.
    ///
    /// Bytes after the sub-option are ignored, so the caller can pass the
    /// remainder of the message from the option's offset.
    ///
    /// # Errors
    ///
    /// Fails on a truncated input, a type byte other than `expected` or a
    /// length byte other than [`PacketCountOption::PAYLOAD_LEN`].
    pub fn decode(
        bytes: &[u8],
        expected: PacketCountOptionType,
    ) -> Result<Self, OptionDecodeError> {
        let Some(&[option_type, length, high, low]) = bytes.first_chunk::<4>() else {
            return Err(OptionDecodeError::Truncated {
                available: bytes.len(),
                required: Self::ENCODED_LEN,
            });
        };

        let option_type = PacketCountOptionType::new(option_type);
        if option_type != expected {
            return Err(OptionDecodeError::UnexpectedType {
                expected,
                found: option_type,
            });
        }
        if length != Self::PAYLOAD_LEN {
            return Err(OptionDecodeError::InvalidLength { length });
        }

        Ok(Self {
            option_type,
            count: u16::from_be_bytes([high, low]),
        })
    }

    /// Decode the sub-option found at `offset` in a routing message.
    ///
    /// # Errors
    ///
    /// See [`PacketCountOption::decode`]. An offset past the end of the
    /// message is reported as [`OptionDecodeError::Truncated`].
    pub fn decode_at(
        message: &[u8],
        offset: usize,
        expected: PacketCountOptionType,
    ) -> Result<Self, OptionDecodeError> {
        let bytes = message.get(offset..).unwrap_or_default();
        Self::decode(bytes, expected)
    }
}

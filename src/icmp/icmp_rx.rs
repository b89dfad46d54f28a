use pnet::packet::icmp::{IcmpCode, IcmpType};
use pnet::packet::icmpv6::{Icmpv6Code, Icmpv6Type};
use pnet::packet::ip::IpNextHeaderProtocols;

use crate::checksum::{Checksum, PseudoHeader};
use crate::packet::{Checkable, CheckableMut, Header};
use crate::util::{read_u16, read_u32, write_u16, write_u32};
use crate::{RxError, RxResult};

use super::ICMP_HEADER_LEN;

const TYPE_OFFSET: usize = 0;
const CODE_OFFSET: usize = 1;
const CHECKSUM_OFFSET: usize = 2;
const REST_OFFSET: usize = 4;
const IDENTIFIER_OFFSET: usize = 4;
const SEQUENCE_OFFSET: usize = 6;

/// Accessors shared by both ICMP versions, expanded once per view type.
macro_rules! icmp_common {
    ($packet:ident) => {
        impl<B: AsRef<[u8]>> $packet<B> {
            /// Parses the whole of `buffer` as one message. The checksum
            /// covers every byte of it.
            pub fn new(buffer: B) -> RxResult<Self> {
                if buffer.as_ref().len() < ICMP_HEADER_LEN {
                    Err(RxError::Truncated)
                } else {
                    Ok($packet { buffer })
                }
            }

            pub(crate) fn new_unchecked(buffer: B) -> Self {
                $packet { buffer }
            }

            pub fn rest_of_header(&self) -> u32 {
                read_u32(self.buffer.as_ref(), REST_OFFSET)
            }

            /// Echo identifier. Only meaningful for echo requests and replies.
            pub fn identifier(&self) -> u16 {
                read_u16(self.buffer.as_ref(), IDENTIFIER_OFFSET)
            }

            /// Echo sequence number. Only meaningful for echo requests and
            /// replies.
            pub fn sequence(&self) -> u16 {
                read_u16(self.buffer.as_ref(), SEQUENCE_OFFSET)
            }

            pub fn payload(&self) -> &[u8] {
                &self.buffer.as_ref()[ICMP_HEADER_LEN..]
            }

            pub fn packet(&self) -> &[u8] {
                self.buffer.as_ref()
            }
        }

        impl<B: AsRef<[u8]> + AsMut<[u8]>> $packet<B> {
            pub fn set_rest_of_header(&mut self, rest: u32) {
                write_u32(self.buffer.as_mut(), REST_OFFSET, rest);
            }

            pub fn set_identifier(&mut self, identifier: u16) {
                write_u16(self.buffer.as_mut(), IDENTIFIER_OFFSET, identifier);
            }

            pub fn set_sequence(&mut self, sequence: u16) {
                write_u16(self.buffer.as_mut(), SEQUENCE_OFFSET, sequence);
            }

            pub fn payload_mut(&mut self) -> &mut [u8] {
                &mut self.buffer.as_mut()[ICMP_HEADER_LEN..]
            }
        }

        impl<B: AsRef<[u8]>> Header for $packet<B> {
            const MIN_SIZE: usize = ICMP_HEADER_LEN;

            fn header_len(&self) -> usize {
                ICMP_HEADER_LEN
            }
        }

        impl<B: AsRef<[u8]> + AsMut<[u8]>> CheckableMut for $packet<B> {
            fn set_checksum(&mut self, checksum: u16) {
                write_u16(self.buffer.as_mut(), CHECKSUM_OFFSET, checksum);
            }
        }
    };
}

/// View of an ICMP (v4) message.
#[derive(Debug, Clone)]
pub struct IcmpPacket<B> {
    buffer: B,
}

icmp_common!(IcmpPacket);

impl<B: AsRef<[u8]>> IcmpPacket<B> {
    pub fn icmp_type(&self) -> IcmpType {
        IcmpType::new(self.buffer.as_ref()[TYPE_OFFSET])
    }

    pub fn icmp_code(&self) -> IcmpCode {
        IcmpCode::new(self.buffer.as_ref()[CODE_OFFSET])
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> IcmpPacket<B> {
    pub fn set_icmp_type(&mut self, icmp_type: IcmpType) {
        self.buffer.as_mut()[TYPE_OFFSET] = icmp_type.0;
    }

    pub fn set_icmp_code(&mut self, icmp_code: IcmpCode) {
        self.buffer.as_mut()[CODE_OFFSET] = icmp_code.0;
    }
}

impl<B: AsRef<[u8]>> Checkable for IcmpPacket<B> {
    type Context = ();

    fn checksum(&self) -> u16 {
        read_u16(self.buffer.as_ref(), CHECKSUM_OFFSET)
    }

    fn compute_checksum(&self, _context: &()) -> u16 {
        Checksum::new().add_bytes_skipping(self.buffer.as_ref(), CHECKSUM_OFFSET).finish()
    }
}

/// View of an ICMPv6 message. Its checksum includes the IPv6 pseudo-header,
/// so verifying needs the addresses of the enclosing packet.
#[derive(Debug, Clone)]
pub struct Icmpv6Packet<B> {
    buffer: B,
}

icmp_common!(Icmpv6Packet);

impl<B: AsRef<[u8]>> Icmpv6Packet<B> {
    pub fn icmpv6_type(&self) -> Icmpv6Type {
        Icmpv6Type::new(self.buffer.as_ref()[TYPE_OFFSET])
    }

    pub fn icmpv6_code(&self) -> Icmpv6Code {
        Icmpv6Code::new(self.buffer.as_ref()[CODE_OFFSET])
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Icmpv6Packet<B> {
    pub fn set_icmpv6_type(&mut self, icmpv6_type: Icmpv6Type) {
        self.buffer.as_mut()[TYPE_OFFSET] = icmpv6_type.0;
    }

    pub fn set_icmpv6_code(&mut self, icmpv6_code: Icmpv6Code) {
        self.buffer.as_mut()[CODE_OFFSET] = icmpv6_code.0;
    }
}

impl<B: AsRef<[u8]>> Checkable for Icmpv6Packet<B> {
    type Context = PseudoHeader;

    fn checksum(&self) -> u16 {
        read_u16(self.buffer.as_ref(), CHECKSUM_OFFSET)
    }

    fn compute_checksum(&self, pseudo: &PseudoHeader) -> u16 {
        let data = self.buffer.as_ref();
        Checksum::new()
            .add_pseudo_header(pseudo, IpNextHeaderProtocols::Icmpv6, data.len())
            .add_bytes_skipping(data, CHECKSUM_OFFSET)
            .finish()
    }
}

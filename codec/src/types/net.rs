//! Codec implementations for network addresses.

use crate::{Decode, Encode, Error, Reader};
use reef_buffer::BufferList;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

impl Encode for SocketAddr {
    fn write(&self, buf: &mut BufferList) {
        match self.ip() {
            IpAddr::V4(ip) => {
                4u8.write(buf);
                buf.append(&ip.octets());
            }
            IpAddr::V6(ip) => {
                6u8.write(buf);
                buf.append(&ip.octets());
            }
        }
        self.port().write(buf);
    }
}

impl Decode for SocketAddr {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let ip = match u8::read(reader)? {
            4 => IpAddr::V4(Ipv4Addr::from(reader.read_array::<4>()?)),
            6 => IpAddr::V6(Ipv6Addr::from(reader.read_array::<16>()?)),
            _ => return Err(Error::Invalid("SocketAddr", "unknown family")),
        };
        let port = u16::read(reader)?;
        Ok(SocketAddr::new(ip, port))
    }
}

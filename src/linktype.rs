use rusticata_macros::newtype_enum;

/// Data link type of captured frames
///
/// Legacy pcap files store it as a 32-bit value in the global header, pcap-ng files as a
/// 16-bit value in each Interface Description Block. Handlers are registered by link type.
///
/// See <http://www.tcpdump.org/linktypes.html>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Linktype(pub i32);

newtype_enum! {
impl display Linktype {
    NULL = 0,
    ETHERNET = 1,
    IEEE802_5 = 6,
    PPP = 9,
    FDDI = 10,
    RAW = 101,
    IEEE802_11 = 105,
    LOOP = 108,
    LINUX_SLL = 113,
    IEEE802_11_RADIOTAP = 127,
    IPV4 = 228,
    IPV6 = 229,
    NFLOG = 239,
    LINUX_SLL2 = 276,
}
}

impl From<u16> for Linktype {
    fn from(v: u16) -> Self {
        Linktype(i32::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_known_and_unknown() {
        assert_eq!(Linktype::ETHERNET.to_string(), "ETHERNET");
        assert_eq!(Linktype(4242).to_string(), "Linktype(4242 / 0x1092)");
        assert_eq!(Linktype::from(113u16), Linktype::LINUX_SLL);
    }
}

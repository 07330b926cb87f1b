//! Synthetic capture files
#![allow(dead_code)]

use std::io::Write;

use pcap_import::ByteOrder;
use tempfile::NamedTempFile;

pub const BOM: u32 = 0x1a2b_3c4d;

fn put_u16(out: &mut Vec<u8>, order: ByteOrder, v: u16) {
    match order {
        ByteOrder::LittleEndian => out.extend_from_slice(&v.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&v.to_be_bytes()),
    }
}

fn put_u32(out: &mut Vec<u8>, order: ByteOrder, v: u32) {
    match order {
        ByteOrder::LittleEndian => out.extend_from_slice(&v.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&v.to_be_bytes()),
    }
}

fn pad32(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Legacy pcap file
pub struct PcapBuilder {
    order: ByteOrder,
    linktype: u32,
    thiszone: i32,
    nanosecond: bool,
    records: Vec<u8>,
}

impl PcapBuilder {
    pub fn new(order: ByteOrder, linktype: u32) -> PcapBuilder {
        PcapBuilder {
            order,
            linktype,
            thiszone: 0,
            nanosecond: false,
            records: Vec::new(),
        }
    }

    pub fn thiszone(mut self, thiszone: i32) -> Self {
        self.thiszone = thiszone;
        self
    }

    pub fn nanosecond(mut self) -> Self {
        self.nanosecond = true;
        self
    }

    pub fn record(self, ts_sec: u32, ts_frac: u32, data: &[u8]) -> Self {
        let origlen = data.len() as u32;
        self.truncated_record(ts_sec, ts_frac, data, origlen)
    }

    pub fn truncated_record(mut self, ts_sec: u32, ts_frac: u32, data: &[u8], origlen: u32) -> Self {
        let order = self.order;
        put_u32(&mut self.records, order, ts_sec);
        put_u32(&mut self.records, order, ts_frac);
        put_u32(&mut self.records, order, data.len() as u32);
        put_u32(&mut self.records, order, origlen);
        self.records.extend_from_slice(data);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let order = self.order;
        let magic = if self.nanosecond { 0xa1b2_3c4d } else { 0xa1b2_c3d4 };
        let mut out = Vec::new();
        put_u32(&mut out, order, magic);
        put_u16(&mut out, order, 2);
        put_u16(&mut out, order, 4);
        put_u32(&mut out, order, self.thiszone as u32);
        put_u32(&mut out, order, 0);
        put_u32(&mut out, order, 65535);
        put_u32(&mut out, order, self.linktype);
        out.extend_from_slice(&self.records);
        out
    }
}

/// Pcap-ng file, built block by block
///
/// Blocks use the byte order of the last section started.
pub struct PcapNgBuilder {
    order: ByteOrder,
    data: Vec<u8>,
}

impl Default for PcapNgBuilder {
    fn default() -> Self {
        PcapNgBuilder::new()
    }
}

impl PcapNgBuilder {
    pub fn new() -> PcapNgBuilder {
        PcapNgBuilder {
            order: ByteOrder::LittleEndian,
            data: Vec::new(),
        }
    }

    /// Append a block with the given body, padded to 32 bits
    pub fn block(mut self, block_type: u32, body: &[u8]) -> Self {
        let mut padded = body.to_vec();
        pad32(&mut padded);
        let len = (12 + padded.len()) as u32;
        let order = self.order;
        put_u32(&mut self.data, order, block_type);
        put_u32(&mut self.data, order, len);
        self.data.extend_from_slice(&padded);
        put_u32(&mut self.data, order, len);
        self
    }

    pub fn section(mut self, order: ByteOrder) -> Self {
        self.order = order;
        let mut body = Vec::new();
        put_u32(&mut body, order, BOM);
        put_u16(&mut body, order, 1);
        put_u16(&mut body, order, 0);
        body.extend_from_slice(&[0xff; 8]);
        self.block(0x0a0d_0d0a, &body)
    }

    pub fn interface(self, linktype: u16) -> Self {
        self.interface_with_tsresol(linktype, None)
    }

    pub fn interface_with_tsresol(self, linktype: u16, tsresol: Option<u8>) -> Self {
        let order = self.order;
        let mut body = Vec::new();
        put_u16(&mut body, order, linktype);
        put_u16(&mut body, order, 0);
        put_u32(&mut body, order, 65535);
        if let Some(tsresol) = tsresol {
            put_u16(&mut body, order, 9);
            put_u16(&mut body, order, 1);
            body.extend_from_slice(&[tsresol, 0, 0, 0]);
            put_u16(&mut body, order, 0);
            put_u16(&mut body, order, 0);
        }
        self.block(1, &body)
    }

    pub fn interface_with_name(self, linktype: u16, name: &str) -> Self {
        let order = self.order;
        let mut body = Vec::new();
        put_u16(&mut body, order, linktype);
        put_u16(&mut body, order, 0);
        put_u32(&mut body, order, 65535);
        put_u16(&mut body, order, 2);
        put_u16(&mut body, order, name.len() as u16);
        body.extend_from_slice(name.as_bytes());
        pad32(&mut body);
        put_u16(&mut body, order, 0);
        put_u16(&mut body, order, 0);
        self.block(1, &body)
    }

    /// Obsolete packet block (type 2), with a 16-bit interface id and a drop count
    pub fn packet(self, if_id: u16, drops: u16, ts: u64, data: &[u8]) -> Self {
        let order = self.order;
        let mut body = Vec::new();
        put_u16(&mut body, order, if_id);
        put_u16(&mut body, order, drops);
        put_u32(&mut body, order, (ts >> 32) as u32);
        put_u32(&mut body, order, ts as u32);
        put_u32(&mut body, order, data.len() as u32);
        put_u32(&mut body, order, data.len() as u32);
        body.extend_from_slice(data);
        self.block(2, &body)
    }

    pub fn enhanced_packet(self, if_id: u32, ts: u64, data: &[u8]) -> Self {
        let order = self.order;
        let mut body = Vec::new();
        put_u32(&mut body, order, if_id);
        put_u32(&mut body, order, (ts >> 32) as u32);
        put_u32(&mut body, order, ts as u32);
        put_u32(&mut body, order, data.len() as u32);
        put_u32(&mut body, order, data.len() as u32);
        body.extend_from_slice(data);
        self.block(6, &body)
    }

    pub fn simple_packet(self, data: &[u8]) -> Self {
        let order = self.order;
        let mut body = Vec::new();
        put_u32(&mut body, order, data.len() as u32);
        body.extend_from_slice(data);
        self.block(3, &body)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Write `data` to a temporary file, removed when dropped
pub fn temp_capture(data: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("capture")
        .suffix(suffix)
        .tempfile()
        .expect("temp file");
    file.write_all(data).expect("write capture");
    file.flush().expect("flush capture");
    file
}

/// Frame of `len` bytes, filled with its length
pub fn frame(len: usize) -> Vec<u8> {
    vec![len as u8; len]
}

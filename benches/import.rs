use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pcap_import::*;
use std::io::Cursor;

const FRAMES: usize = 5000;

/// Little-endian pcap-ng capture: one Ethernet interface, `FRAMES` frames of varying size
fn synthetic_pcapng() -> Vec<u8> {
    fn block(out: &mut Vec<u8>, block_type: u32, body: &[u8]) {
        let padded = (body.len() + 3) & !3;
        let len = (12 + padded) as u32;
        out.extend_from_slice(&block_type.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(body);
        out.resize(out.len() + padded - body.len(), 0);
        out.extend_from_slice(&len.to_le_bytes());
    }
    let mut out = Vec::new();
    let mut shb = vec![0x4d, 0x3c, 0x2b, 0x1a, 1, 0, 0, 0];
    shb.extend_from_slice(&[0xff; 8]);
    block(&mut out, 0x0a0d_0d0a, &shb);
    block(&mut out, 1, &[1, 0, 0, 0, 0xff, 0xff, 0, 0]);
    for i in 0..FRAMES {
        let caplen = 60 + (i * 37) % 1400;
        let mut epb = Vec::with_capacity(20 + caplen);
        epb.extend_from_slice(&0u32.to_le_bytes());
        epb.extend_from_slice(&0u32.to_le_bytes());
        epb.extend_from_slice(&(i as u32 * 1000).to_le_bytes());
        epb.extend_from_slice(&(caplen as u32).to_le_bytes());
        epb.extend_from_slice(&(caplen as u32).to_le_bytes());
        epb.resize(20 + caplen, 0xab);
        block(&mut out, 6, &epb);
    }
    out
}

/// Same frames, legacy pcap
fn synthetic_pcap() -> Vec<u8> {
    let mut out = vec![0xd4, 0xc3, 0xb2, 0xa1, 2, 0, 4, 0];
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&[0xff, 0xff, 0, 0, 1, 0, 0, 0]);
    for i in 0..FRAMES {
        let caplen = 60 + (i * 37) % 1400;
        out.extend_from_slice(&(i as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(caplen as u32).to_le_bytes());
        out.extend_from_slice(&(caplen as u32).to_le_bytes());
        out.resize(out.len() + caplen, 0xab);
    }
    out
}

fn count_frames<R: FrameReader>(mut reader: R) -> usize {
    let mut frames = 0;
    while let Some(event) = reader.next_event().expect("reader") {
        if let ReaderEvent::Frame { frame, .. } = event {
            frames += usize::from(!frame.data.is_empty());
        }
    }
    frames
}

fn bench_readers(c: &mut Criterion) {
    let ng = synthetic_pcapng();
    let legacy = synthetic_pcap();
    let mut group = c.benchmark_group("reader");
    group.throughput(Throughput::Bytes(ng.len() as u64));
    group.bench_function("pcapng", |b| {
        b.iter(|| assert_eq!(count_frames(PcapNgReader::new(65536, &ng[..])), FRAMES))
    });
    group.throughput(Throughput::Bytes(legacy.len() as u64));
    group.bench_function("pcap", |b| {
        b.iter(|| assert_eq!(count_frames(LegacyPcapReader::new(65536, &legacy[..])), FRAMES))
    });
    group.finish();
}

fn bench_reader_buffer_size(c: &mut Criterion) {
    let ng = synthetic_pcapng();
    let mut group = c.benchmark_group("reader_pcapng buffer_size");
    const KB4: usize = 4096;
    for buffer_size in [KB4, KB4 * 4, KB4 * 16, KB4 * 64].iter() {
        group.throughput(Throughput::Bytes(ng.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            buffer_size,
            |b, &size| b.iter(|| count_frames(PcapNgReader::new(size, &ng[..]))),
        );
    }
    group.finish();
}

fn length_handler(ctx: HandlerContext<usize>) -> Box<dyn PacketHandler> {
    let sink = ctx.sink;
    Box::new(move |frame: &RawFrame<'_>| {
        sink.push(frame.data.len());
        0
    })
}

fn bench_importer(c: &mut Criterion) {
    let ng = synthetic_pcapng();
    let size = ng.len() as u64;
    let importer = Importer::new(
        HandlerRegistry::new().with(Linktype::ETHERNET, length_handler),
        ImportConfig::default(),
    );
    let mut group = c.benchmark_group("importer");
    group.throughput(Throughput::Bytes(size));
    group.bench_function("pcapng", |b| {
        b.iter(|| {
            let stream = importer
                .open_reader("bench.pcapng", size, FormatKind::PcapNg, Cursor::new(ng.clone()))
                .expect("open");
            assert_eq!(stream.count(), FRAMES);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_readers,
    bench_reader_buffer_size,
    bench_importer
);
criterion_main!(benches);

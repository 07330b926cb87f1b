use pcap_import::*;
use std::env;
use std::error::Error;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Frame summary produced by the demo handler
#[derive(Debug)]
struct FrameInfo {
    interface_id: u32,
    linktype: Linktype,
    len: usize,
    timestamp_millis: i64,
}

fn counting_handler(ctx: HandlerContext<FrameInfo>) -> Box<dyn PacketHandler> {
    let HandlerContext {
        sink,
        linktype,
        interface_id,
        ..
    } = ctx;
    Box::new(move |frame: &RawFrame<'_>| {
        sink.push(FrameInfo {
            interface_id,
            linktype,
            len: frame.data.len(),
            timestamp_millis: frame.timestamp_millis,
        });
        0
    })
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut registry = HandlerRegistry::new();
    for linktype in [
        Linktype::NULL,
        Linktype::ETHERNET,
        Linktype::RAW,
        Linktype::LOOP,
        Linktype::LINUX_SLL,
        Linktype::IPV4,
        Linktype::IPV6,
    ] {
        registry.register(linktype, counting_handler);
    }
    let importer = Importer::new(registry, ImportConfig::default());

    for arg in env::args().skip(1) {
        if let Err(e) = import_file(&importer, &arg) {
            eprintln!("{}: {}", arg, e);
        }
    }
}

fn import_file(importer: &Importer<FrameInfo>, arg: &str) -> Result<(), Box<dyn Error>> {
    println!("Name: {}", arg);
    let stream = importer.open(arg)?;

    let mut frames = 0u64;
    let mut bytes = 0u64;
    let mut first_ts = None;
    let mut last_ts = None;
    loop {
        match stream.poll_timeout(Duration::from_millis(500)) {
            Polled::Item(info) => {
                frames += 1;
                bytes += info.len as u64;
                first_ts.get_or_insert(info.timestamp_millis);
                last_ts = Some(info.timestamp_millis);
                if frames == 1 {
                    println!(
                        "\tfirst frame: interface {} ({}), {} bytes",
                        info.interface_id, info.linktype, info.len
                    );
                }
            }
            Polled::Pending => println!("\t{}", stream.source()),
            Polled::Done => break,
        }
    }

    println!("\tframes: {}", frames);
    println!("\tcaptured bytes: {}", bytes);
    if let (Some(first), Some(last)) = (first_ts, last_ts) {
        println!("\tduration: {} ms", last - first);
    }
    match stream.outcome() {
        Some(ImportOutcome::Completed) => println!("\tcomplete"),
        Some(ImportOutcome::Cancelled) => println!("\tcancelled"),
        Some(ImportOutcome::Failed(e)) => return Err(e.to_string().into()),
        None => return Err("import did not complete".into()),
    }
    Ok(())
}

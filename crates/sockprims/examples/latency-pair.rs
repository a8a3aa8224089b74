//! Measure latency across a local socket pair.
//!
//! Run with: `cargo run --example latency-pair`

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::os::unix::net::UnixStream;
    use std::thread;

    use sockprims::{ignore_sigpipe, Connection, EndpointAddress, LatencyExt, SocketFd};

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .with_target(false)
        .init();

    ignore_sigpipe();
    let (left, right) = UnixStream::pair()?;

    let mut responder = Connection::new(SocketFd::try_from(right)?, EndpointAddress::Unnamed);
    let _on_error = responder.register_error_handler(|| {
        tracing::error!("responder transport error");
        Ok::<_, std::io::Error>(())
    });
    let server = thread::spawn(move || {
        for _ in 0..5 {
            if let Err(err) = responder.pong() {
                tracing::error!(error = %err, "pong failed");
                break;
            }
        }
    });

    let mut initiator = Connection::new(SocketFd::try_from(left)?, EndpointAddress::Unnamed);
    for round in 1..=5 {
        let m = initiator.ping()?;
        println!(
            "round {round}: rtt {:?}, offset {}",
            m.round_trip, m.clock_offset
        );
    }

    server.join().map_err(|_| "responder thread panicked")?;
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("latency-pair requires Unix domain sockets");
}

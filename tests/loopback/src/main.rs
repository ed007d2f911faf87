fn main() {
    println!("Run `cargo test -p loopback-tests` to execute the loopback tests.");
}

#[cfg(test)]
mod tests {
    use std::io::{IoSlice, IoSliceMut, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::{Duration, Instant};

    use tcpkit_file_transfer::{FileSize, footer, recv_file, recv_file_sha256, send_file};
    use tcpkit_sockio::connect::{
        ConnectOptions, Family, connect_timeout, connect_to, create_socket,
    };
    use tcpkit_sockio::listen::{accept_timeout, listen};
    use tcpkit_sockio::sockopt::{keepalive_info, linger, nodelay, set_server_options};
    use tcpkit_sockio::{IoContext, IoError, SocketIo, Timeout, batch_cap, set_nonblocking};

    fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn pattern(len: usize, seed: usize) -> Vec<u8> {
        (0..len).map(|i| ((i + seed) * 131 % 256) as u8).collect()
    }

    fn closed_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    // ---------------------------------------------------------------------
    // Scalar transfer
    // ---------------------------------------------------------------------

    fn scalar_roundtrip(size: usize, chunk: usize, nonblocking: bool) {
        let (client, server) = pair();
        if nonblocking {
            set_nonblocking(&client).unwrap();
            set_nonblocking(&server).unwrap();
        }
        let data = pattern(size, chunk);
        let expected = data.clone();

        let sender = thread::spawn(move || {
            SocketIo::new(&server)
                .send(&data, Timeout::from_secs(10))
                .unwrap()
        });

        let io = SocketIo::new(&client);
        let mut out = Vec::with_capacity(size);
        let mut buf = vec![0u8; chunk];
        while out.len() < size {
            let want = chunk.min(size - out.len());
            let n = io.recv(&mut buf[..want], Timeout::from_secs(10)).unwrap();
            assert_eq!(n, want);
            out.extend_from_slice(&buf[..n]);
        }

        assert_eq!(sender.join().unwrap(), size);
        assert_eq!(out, expected, "size {size} chunk {chunk}");
    }

    #[test]
    fn scalar_roundtrip_any_size_and_chunk() {
        for (size, chunk) in [
            (1, 1),
            (1000, 7),
            (65_539, 4096),
            (65_536, 65_536),
            (1_000_003, 65_536),
            (3_000_000, 1_000_000),
        ] {
            scalar_roundtrip(size, chunk, false);
            scalar_roundtrip(size, chunk, true);
        }
    }

    #[test]
    fn peer_close_mid_transfer_reports_progress() {
        let (client, mut server) = pair();
        server.write_all(&pattern(12_345, 0)).unwrap();
        drop(server);

        let mut buf = vec![0u8; 20_000];
        let err = SocketIo::new(&client)
            .recv(&mut buf, Timeout::from_secs(2))
            .unwrap_err();
        assert!(matches!(err.kind, IoError::NotConnected));
        assert_eq!(err.transferred, 12_345);
    }

    // ---------------------------------------------------------------------
    // Vectored transfer
    // ---------------------------------------------------------------------

    fn geometry(count: usize) -> Vec<usize> {
        (0..count).map(|i| i * 37 % 97).collect()
    }

    #[test]
    fn vectored_roundtrip_past_batch_cap() {
        let lens = geometry(1000);
        assert!(lens.len() > batch_cap());
        assert!(lens.contains(&0));
        let total: usize = lens.iter().sum();

        let (client, server) = pair();
        set_nonblocking(&client).unwrap();
        set_nonblocking(&server).unwrap();

        let stream = pattern(total, 3);
        let expected = stream.clone();
        let write_lens = lens.clone();
        let writer = thread::spawn(move || {
            let mut parts = Vec::with_capacity(write_lens.len());
            let mut at = 0;
            for len in &write_lens {
                parts.push(&stream[at..at + len]);
                at += len;
            }
            let slices: Vec<IoSlice<'_>> = parts.iter().map(|p| IoSlice::new(p)).collect();
            SocketIo::new(&server)
                .writev_nonblocking(total, &slices, Timeout::from_secs(10))
                .unwrap()
        });

        let mut bufs: Vec<Vec<u8>> = lens.iter().map(|&len| vec![0u8; len]).collect();
        let n = {
            let mut slices: Vec<IoSliceMut<'_>> =
                bufs.iter_mut().map(|b| IoSliceMut::new(b)).collect();
            SocketIo::new(&client)
                .readv_nonblocking(total, &mut slices, Timeout::from_secs(10))
                .unwrap()
        };

        assert_eq!(writer.join().unwrap(), total);
        assert_eq!(n, total);
        assert_eq!(bufs.concat(), expected);
    }

    #[test]
    fn vectored_size_mismatch_is_overflow() {
        let (client, _server) = pair();
        set_nonblocking(&client).unwrap();
        let data = pattern(500, 0);
        let slices: Vec<IoSlice<'_>> = data.chunks(7).map(IoSlice::new).collect();
        let io = SocketIo::new(&client);

        for declared in [499, 501, 0] {
            let err = io
                .writev_nonblocking(declared, &slices, Timeout::from_secs(1))
                .unwrap_err();
            assert!(matches!(err.kind, IoError::Overflow), "declared {declared}");
            assert_eq!(err.transferred, 0);
        }

        let mut bufs = vec![vec![0u8; 10]; 3];
        let mut slices: Vec<IoSliceMut<'_>> =
            bufs.iter_mut().map(|b| IoSliceMut::new(b)).collect();
        let err = io
            .readv_nonblocking(31, &mut slices, Timeout::from_secs(1))
            .unwrap_err();
        assert!(matches!(err.kind, IoError::Overflow));
    }

    // ---------------------------------------------------------------------
    // Timeouts
    // ---------------------------------------------------------------------

    #[test]
    fn stalled_recv_times_out_with_exact_count() {
        let (client, mut server) = pair();
        set_nonblocking(&client).unwrap();
        let io = SocketIo::new(&client);
        let mut buf = [0u8; 64];

        let err = io.recv(&mut buf, Timeout::from_millis(100)).unwrap_err();
        assert!(matches!(err.kind, IoError::TimedOut));
        assert_eq!(err.transferred, 0);

        server.write_all(b"seven!!").unwrap();
        let err = io.recv(&mut buf, Timeout::from_millis(100)).unwrap_err();
        assert!(matches!(err.kind, IoError::TimedOut));
        assert_eq!(err.transferred, 7);
    }

    #[test]
    fn stalled_send_times_out_with_partial_count() {
        let (client, _server) = pair();
        set_nonblocking(&client).unwrap();
        let data = vec![0u8; 64 * 1024 * 1024];

        let err = SocketIo::new(&client)
            .send(&data, Timeout::from_millis(200))
            .unwrap_err();
        assert!(matches!(err.kind, IoError::TimedOut));
        assert!(err.transferred > 0);
        assert!(err.transferred < data.len() as u64);
    }

    #[test]
    fn connect_to_closed_port_is_bounded() {
        let port = closed_port();
        let start = Instant::now();
        let opts = ConnectOptions {
            timeout: Timeout::from_secs(1),
            ..Default::default()
        };
        let err = connect_to("127.0.0.1", port, &opts).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(3));
        let cause = err.cause();
        assert!(
            matches!(cause, IoError::TimedOut) || cause.errno() == libc::ECONNREFUSED,
            "{err}"
        );
    }

    #[test]
    fn connect_to_unroutable_address_is_bounded() {
        // 192.0.2.0/24 is never routed: the connect either fails at once or
        // stalls until the timeout.
        let sock = create_socket("192.0.2.1", &ConnectOptions::default()).unwrap();
        let start = Instant::now();
        let result = connect_timeout(
            &sock,
            "192.0.2.1",
            9,
            Timeout::from_millis(300),
            true,
            &IoContext::default(),
        );
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    // ---------------------------------------------------------------------
    // Socket options
    // ---------------------------------------------------------------------

    #[test]
    fn server_options_are_idempotent() {
        let listener = listen(Family::V4, Some("127.0.0.1"), 0).unwrap();
        let port = listener.local_addr().unwrap().as_socket().unwrap().port();

        let opts = ConnectOptions {
            timeout: Timeout::from_secs(2),
            ..Default::default()
        };
        let once = connect_to("127.0.0.1", port, &opts).unwrap();
        let twice = connect_to("127.0.0.1", port, &opts).unwrap();
        let ctx = IoContext::default();
        let timeout = Timeout::from_secs(30);

        set_server_options(&once, timeout, &ctx).unwrap();
        set_server_options(&twice, timeout, &ctx).unwrap();
        set_server_options(&twice, timeout, &ctx).unwrap();

        assert_eq!(keepalive_info(&once).unwrap(), keepalive_info(&twice).unwrap());
        assert_eq!(nodelay(&once).unwrap(), nodelay(&twice).unwrap());
        assert_eq!(linger(&once).unwrap(), linger(&twice).unwrap());
    }

    // ---------------------------------------------------------------------
    // File transfer
    // ---------------------------------------------------------------------

    fn write_source(dir: &tempfile::TempDir, len: usize) -> (std::path::PathBuf, Vec<u8>) {
        let path = dir.path().join("source.bin");
        let data = pattern(len, 11);
        std::fs::write(&path, &data).unwrap();
        (path, data)
    }

    #[test]
    fn unbounded_receive_strips_footer() {
        let dir = tempfile::tempdir().unwrap();
        let (source, data) = write_source(&dir, 1_234_567);
        let dest = dir.path().join("dest.bin");

        let listener = listen(Family::V4, Some("127.0.0.1"), 0).unwrap();
        let port = listener.local_addr().unwrap().as_socket().unwrap().port();
        let len = data.len() as u64;

        let sender = thread::spawn(move || {
            let opts = ConnectOptions {
                timeout: Timeout::from_secs(5),
                ..Default::default()
            };
            let socket = connect_to("127.0.0.1", port, &opts).unwrap();
            let io = SocketIo::new(&socket);
            send_file(&io, &source, 0, len, Timeout::from_secs(10)).unwrap();
            footer::send_footer(&io, len, Timeout::from_secs(10)).unwrap();
        });

        let (conn, _) =
            accept_timeout(&listener, Timeout::from_secs(5), &IoContext::default()).unwrap();
        let n = recv_file(
            &SocketIo::new(&conn),
            &dest,
            FileSize::Unbounded,
            256 * 1024,
            Timeout::from_secs(10),
        )
        .unwrap();
        sender.join().unwrap();

        assert_eq!(n, len);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[test]
    fn unbounded_receive_with_bad_footer_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest.bin");
        let (client, mut server) = pair();

        let writer = thread::spawn(move || {
            server.write_all(&pattern(4096, 0)).unwrap();
            server.write_all(&footer::encode(4097)).unwrap();
        });

        let err = recv_file(
            &SocketIo::new(&client),
            &dest,
            FileSize::Unbounded,
            0,
            Timeout::from_secs(5),
        )
        .unwrap_err();
        writer.join().unwrap();

        assert!(matches!(err.kind, IoError::InvalidData(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn checksum_receive_matches_sender_file() {
        let dir = tempfile::tempdir().unwrap();
        let (source, data) = write_source(&dir, 2_000_000);
        let dest = dir.path().join("dest.bin");
        let (client, server) = pair();
        set_nonblocking(&server).unwrap();

        let expected = tcpkit_file_transfer::file_sha256(&source).unwrap();
        let len = data.len() as u64;
        let sender = thread::spawn(move || {
            send_file(&SocketIo::new(&server), &source, 0, len, Timeout::from_secs(10)).unwrap()
        });

        let got = recv_file_sha256(
            &SocketIo::new(&client),
            &dest,
            len,
            0,
            Timeout::from_secs(10),
        )
        .unwrap();
        assert_eq!(sender.join().unwrap(), len);
        assert_eq!(got, expected);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[test]
    fn discard_then_read_tail() {
        let (client, mut server) = pair();
        let data = pattern(1_000_000, 5);
        let tail = data[999_000..].to_vec();
        let writer = thread::spawn(move || server.write_all(&data).unwrap());

        let io = SocketIo::new(&client);
        let skipped = tcpkit_file_transfer::discard(&io, 999_000, Timeout::from_secs(5)).unwrap();
        assert_eq!(skipped, 999_000);
        let mut rest = vec![0u8; 1000];
        io.recv(&mut rest, Timeout::from_secs(5)).unwrap();
        writer.join().unwrap();
        assert_eq!(rest, tail);
    }

    // ---------------------------------------------------------------------
    // Collaborators
    // ---------------------------------------------------------------------

    #[test]
    fn resolved_loopback_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let ip = tcpkit_netinfo::resolve("127.0.0.1").unwrap()[0];
        let opts = ConnectOptions {
            timeout: Timeout::from_secs(2),
            ..Default::default()
        };
        connect_to(&ip.to_string(), port, &opts).unwrap();
        assert_eq!(
            tcpkit_netinfo::classify(&ip.to_string()),
            tcpkit_netinfo::NetType::Outer
        );
    }
}

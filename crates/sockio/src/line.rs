//! Line-oriented receive.

use crate::error::{IoError, TransferError};
use crate::io::{Mode, SocketIo};
use crate::timeout::Timeout;

impl SocketIo<'_> {
    /// Reads one line into `buf`, a byte at a time.
    ///
    /// Carriage returns are dropped; a line feed is stored and ends the
    /// line. Stops early without error when `buf` is full. Returns the
    /// number of bytes stored.
    pub fn read_line(&self, buf: &mut [u8], timeout: Timeout) -> Result<usize, TransferError> {
        if buf.is_empty() {
            return Err(TransferError::at_start(IoError::InvalidArgument(
                "line buffer has zero capacity".into(),
            )));
        }

        let mode = self.mode().map_err(TransferError::at_start)?;
        let mut len = 0;
        let mut byte = [0u8; 1];
        while len < buf.len() {
            match mode {
                Mode::Blocking => self.recv_blocking(&mut byte, timeout),
                Mode::NonBlocking => self.recv_nonblocking(&mut byte, timeout),
            }
            .map_err(|e| TransferError::new(e.kind, len as u64))?;

            match byte[0] {
                b'\r' => continue,
                b'\n' => {
                    buf[len] = b'\n';
                    return Ok(len + 1);
                }
                b => {
                    buf[len] = b;
                    len += 1;
                }
            }
        }
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn strips_carriage_returns() {
        let (client, mut server) = pair();
        server.write_all(b"GET / HTTP/1.0\r\nHost: x\r\n").unwrap();

        let io = SocketIo::new(&client);
        let mut buf = [0u8; 64];
        let n = io.read_line(&mut buf, Timeout::from_secs(1)).unwrap();
        assert_eq!(&buf[..n], b"GET / HTTP/1.0\n");
        let n = io.read_line(&mut buf, Timeout::from_secs(1)).unwrap();
        assert_eq!(&buf[..n], b"Host: x\n");
    }

    #[test]
    fn nonblocking_socket_reads_split_line() {
        let (client, mut server) = pair();
        crate::io::set_nonblocking(&client).unwrap();
        let writer = std::thread::spawn(move || {
            server.write_all(b"he").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(50));
            server.write_all(b"llo\r\n").unwrap();
            server
        });

        let mut buf = [0u8; 16];
        let n = SocketIo::new(&client)
            .read_line(&mut buf, Timeout::from_secs(2))
            .unwrap();
        assert_eq!(&buf[..n], b"hello\n");
        writer.join().unwrap();
    }

    #[test]
    fn stops_at_capacity() {
        let (client, mut server) = pair();
        server.write_all(b"abcdefgh\n").unwrap();

        let io = SocketIo::new(&client);
        let mut buf = [0u8; 4];
        let n = io.read_line(&mut buf, Timeout::from_secs(1)).unwrap();
        assert_eq!(&buf[..n], b"abcd");
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let (client, _server) = pair();
        let err = SocketIo::new(&client)
            .read_line(&mut [], Timeout::from_secs(1))
            .unwrap_err();
        assert!(matches!(err.kind, IoError::InvalidArgument(_)));
    }

    #[test]
    fn close_mid_line_keeps_partial_count() {
        let (client, mut server) = pair();
        server.write_all(b"par").unwrap();
        drop(server);

        let mut buf = [0u8; 16];
        let err = SocketIo::new(&client)
            .read_line(&mut buf, Timeout::from_secs(1))
            .unwrap_err();
        assert!(matches!(err.kind, IoError::NotConnected));
        assert_eq!(err.transferred, 3);
        assert_eq!(&buf[..3], b"par");
    }
}

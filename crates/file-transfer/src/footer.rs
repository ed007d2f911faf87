//! The 8-byte length footer that ends an unbounded stream.
//!
//! Wire format: the payload length as an unsigned 64-bit integer in
//! network byte order, sent right after the last payload byte.

use tcpkit_sockio::{SocketIo, Timeout, TransferError};

pub const FOOTER_LEN: usize = 8;

pub fn encode(payload_len: u64) -> [u8; FOOTER_LEN] {
    payload_len.to_be_bytes()
}

pub fn decode(bytes: [u8; FOOTER_LEN]) -> u64 {
    u64::from_be_bytes(bytes)
}

/// Sends the footer for a stream that carried `payload_len` bytes.
///
/// Call after the payload, then close the socket.
pub fn send_footer(
    io: &SocketIo<'_>,
    payload_len: u64,
    timeout: Timeout,
) -> Result<(), TransferError> {
    io.send(&encode(payload_len), timeout).map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_byte_order() {
        assert_eq!(encode(0x0102_0304_0506_0708), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(decode([0, 0, 0, 0, 0, 0, 0x10, 0]), 4096);
    }
}

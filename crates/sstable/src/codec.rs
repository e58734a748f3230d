//! Fixed-width integer codec.
//!
//! Every on-disk integer is big-endian. Decoding from a slice shorter than
//! the integer width panics: callers bounds-check before decoding.

use byteorder::{BigEndian, ByteOrder};

/// Byte order used by every run file.
pub type Order = BigEndian;

pub fn put_i32(buf: &mut Vec<u8>, v: i32) {
    let mut b = [0u8; 4];
    Order::write_i32(&mut b, v);
    buf.extend_from_slice(&b);
}

pub fn put_u32(buf: &mut Vec<u8>, v: u32) {
    let mut b = [0u8; 4];
    Order::write_u32(&mut b, v);
    buf.extend_from_slice(&b);
}

pub fn put_i64(buf: &mut Vec<u8>, v: i64) {
    let mut b = [0u8; 8];
    Order::write_i64(&mut b, v);
    buf.extend_from_slice(&b);
}

pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
    let mut b = [0u8; 8];
    Order::write_u64(&mut b, v);
    buf.extend_from_slice(&b);
}

pub fn get_i32(buf: &[u8]) -> i32 {
    Order::read_i32(buf)
}

pub fn get_u32(buf: &[u8]) -> u32 {
    Order::read_u32(buf)
}

pub fn get_i64(buf: &[u8]) -> i64 {
    Order::read_i64(buf)
}

pub fn get_u64(buf: &[u8]) -> u64 {
    Order::read_u64(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_big_endian() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 0x0102_0304);
        put_u64(&mut buf, 0x0A0B_0C0D_0E0F_1011);
        assert_eq!(
            buf,
            vec![1, 2, 3, 4, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11]
        );
        assert_eq!(get_u32(&buf), 0x0102_0304);
        assert_eq!(get_u64(&buf[4..]), 0x0A0B_0C0D_0E0F_1011);
    }

    #[test]
    fn signed_values_keep_their_sign() {
        let mut buf = Vec::new();
        put_i32(&mut buf, -7);
        put_i64(&mut buf, i64::MIN + 1);
        assert_eq!(get_i32(&buf), -7);
        assert_eq!(get_i64(&buf[4..]), i64::MIN + 1);
    }

    #[test]
    #[should_panic]
    fn short_buffer_is_a_contract_violation() {
        get_u64(&[0u8; 7]);
    }
}

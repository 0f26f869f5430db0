use std::io::Cursor;
use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use anyhow::{Result, anyhow};

/// Width of one timestamp field: the platform word, as in `struct timeval`.
pub const FIELD_LEN: usize = std::mem::size_of::<usize>();

/// Seconds field followed by microseconds field.
pub const TIMESTAMP_LEN: usize = 2 * FIELD_LEN;

pub const MICROS_PER_SEC: i64 = 1_000_000;

/// Sender timestamp at the head of every probe datagram.
///
/// Host byte order and host word size on both ends; this is not a portable
/// wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub secs: i64,
    pub micros: i64,
}

impl Timestamp {
    pub fn new(secs: i64, micros: i64) -> Self {
        Timestamp { secs, micros }
    }

    /// Decode the leading timestamp. Trailing payload is ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < TIMESTAMP_LEN {
            return Err(anyhow!(
                "Datagram too short for timestamp ({} < {} bytes)",
                data.len(),
                TIMESTAMP_LEN
            ));
        }
        let mut rdr = Cursor::new(data);
        let secs = rdr.read_int::<NativeEndian>(FIELD_LEN)?;
        let micros = rdr.read_int::<NativeEndian>(FIELD_LEN)?;
        Ok(Timestamp { secs, micros })
    }

    /// Encode in the same layout `parse` reads. Values are truncated to the
    /// field width on 32-bit hosts.
    pub fn to_bytes(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TIMESTAMP_LEN);
        // Writing into a Vec cannot fail
        let _ = buf.write_int::<NativeEndian>(truncate(self.secs), FIELD_LEN);
        let _ = buf.write_int::<NativeEndian>(truncate(self.micros), FIELD_LEN);
        buf
    }

    /// One-way delay in microseconds from `sent` to `self`.
    pub fn micros_since(&self, sent: &Timestamp) -> i64 {
        (self.secs.wrapping_sub(sent.secs))
            .wrapping_mul(MICROS_PER_SEC)
            .wrapping_add(self.micros)
            .wrapping_sub(sent.micros)
    }
}

fn truncate(v: i64) -> i64 {
    if FIELD_LEN >= 8 {
        v
    } else {
        let shift = 64 - 8 * FIELD_LEN as u32;
        (v << shift) >> shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_len_matches_word_size() {
        assert_eq!(TIMESTAMP_LEN, 2 * std::mem::size_of::<usize>());
    }

    #[test]
    fn test_parse_native_layout() {
        let mut data = Vec::new();
        data.extend_from_slice(&(1_700_000_000usize).to_ne_bytes());
        data.extend_from_slice(&(250_000usize).to_ne_bytes());
        data.extend_from_slice(&[0xAB; 56]); // payload padding

        let ts = Timestamp::parse(&data).unwrap();
        assert_eq!(ts, Timestamp::new(1_700_000_000, 250_000));
    }

    #[test]
    fn test_parse_short_datagram() {
        let data = vec![0u8; TIMESTAMP_LEN - 1];
        assert!(Timestamp::parse(&data).is_err());
        assert!(Timestamp::parse(&[]).is_err());
    }

    #[test]
    fn test_to_bytes_layout() {
        let ts = Timestamp::new(12, 345);
        let bytes = ts.to_bytes();
        assert_eq!(bytes.len(), TIMESTAMP_LEN);
        assert_eq!(&bytes[..FIELD_LEN], &12usize.to_ne_bytes());
        assert_eq!(Timestamp::parse(&bytes).unwrap(), ts);
    }

    #[test]
    fn test_delay_across_second_boundary() {
        let sent = Timestamp::new(100, 999_900);
        let now = Timestamp::new(101, 100);
        assert_eq!(now.micros_since(&sent), 200);
    }

    #[test]
    fn test_negative_delay_from_clock_skew() {
        let sent = Timestamp::new(200, 500_000);
        let now = Timestamp::new(200, 400_000);
        assert_eq!(now.micros_since(&sent), -100_000);
    }
}

//! MPEG-2 CRC32: polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no final
//! XOR, MSB-first, table-driven (ISO/IEC 13818-1 Annex B).
use std::sync::OnceLock;

const POLY: u32 = 0x04C1_1DB7;

fn table() -> &'static [u32; 256] {
    static TABLE: OnceLock<[u32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = (i as u32) << 24;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 0x8000_0000 != 0 {
                    (crc << 1) ^ POLY
                } else {
                    crc << 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    })
}

pub fn crc32_mpeg2(data: &[u8]) -> u32 {
    let table = table();
    let mut crc = 0xFFFF_FFFFu32;
    for &b in data {
        let idx = (((crc >> 24) ^ u32::from(b)) & 0xFF) as usize;
        crc = (crc << 8) ^ table[idx];
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_of_empty_is_init_value() {
        assert_eq!(crc32_mpeg2(&[]), 0xFFFF_FFFF);
    }

    #[test]
    fn crc_is_deterministic_and_sensitive_to_input() {
        let a = crc32_mpeg2(b"hello");
        let b = crc32_mpeg2(b"hellp");
        assert_ne!(a, b);
        assert_eq!(a, crc32_mpeg2(b"hello"));
    }
}

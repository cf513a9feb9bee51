//! CRC-64 for packet payloads.
//!
//! ECMA-182 polynomial, reflected form: 0xC96C5795D7870F42
//! Init all-ones, final inversion (a.k.a. CRC-64/XZ).
//!
//! Deployed receivers compute exactly this variant; the header checksum
//! covers the payload only.

const POLY: u64 = 0xC96C_5795_D787_0F42;

// ---------------------------------------------------------------------------
// CRC lookup table (compile-time)
// ---------------------------------------------------------------------------

const fn build_crc_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u64;
        let mut bit = 0;
        while bit < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u64; 256] = build_crc_table();

// ---------------------------------------------------------------------------
// Core CRC functions
// ---------------------------------------------------------------------------

/// Continue a checksum over more bytes.
///
/// `crc64_update(crc64(a), b) == crc64(a ++ b)`; start from 0.
pub fn crc64_update(crc: u64, data: &[u8]) -> u64 {
    let mut crc = !crc;
    for &byte in data {
        crc = CRC_TABLE[((crc as u8) ^ byte) as usize] ^ (crc >> 8);
    }
    !crc
}

/// CRC-64/ECMA-182 of `data`.
pub fn crc64(data: &[u8]) -> u64 {
    crc64_update(0, data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_table_entry_zero() {
        assert_eq!(CRC_TABLE[0], 0);
    }

    #[test]
    fn test_crc_table_high_bit_is_poly() {
        // 0x80 shifts out seven zero bits, then the set bit folds in POLY
        assert_eq!(CRC_TABLE[0x80], POLY);
    }

    #[test]
    fn test_check_value() {
        assert_eq!(crc64(b"123456789"), 0x995D_C9BB_DF19_39FA);
    }

    #[test]
    fn test_empty() {
        assert_eq!(crc64(&[]), 0);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = b"KXYZ 121200Z 27010KT 10SM FEW040 12/04 A3001";
        let (a, b) = data.split_at(17);
        assert_eq!(crc64_update(crc64(a), b), crc64(data));
    }

    #[test]
    fn test_single_bit_changes_crc() {
        let data = b"TAF KXYZ 121130Z 1212/1312 27012KT P6SM SCT050".to_vec();
        let base = crc64(&data);
        for bit in 0..data.len() * 8 {
            let mut flipped = data.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert_ne!(crc64(&flipped), base, "bit {bit} went undetected");
        }
    }
}

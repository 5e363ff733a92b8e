/// CRC7 (x^7 + x^3 + 1) over a command frame, MSB first.
///
/// Returns the bare 7-bit remainder; see [`crc7_frame`] for the on-wire byte.
pub fn crc7(bytes: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in bytes {
        for bit in (0..8).rev() {
            let feedback = ((byte >> bit) & 1) ^ ((crc >> 6) & 1);
            crc = (crc << 1) & 0x7f;
            if feedback != 0 {
                crc ^= 0x09;
            }
        }
    }
    crc
}

/// CRC7 placed in bits [7:1] with the end bit set.
pub fn crc7_frame(bytes: &[u8]) -> u8 {
    (crc7(bytes) << 1) | 1
}

/// Extract `width` bits starting at bit `lsb` of a register delivered as
/// big-endian 32-bit words (`words[0]` holds the most significant bits).
///
/// Bits beyond the end of `words` read as zero.
pub fn extract_bits(words: &[u32], lsb: usize, width: usize) -> u32 {
    debug_assert!(width <= 32);
    let total = words.len() * 32;
    let mut value = 0u32;
    for bit in (lsb..lsb + width).rev() {
        let set = if bit < total {
            (words[words.len() - 1 - bit / 32] >> (bit % 32)) & 1
        } else {
            0
        };
        value = (value << 1) | set;
    }
    value
}

/// Copy a register into exactly `N` words, keeping `words[0]` as the most
/// significant word. Missing trailing words read as zero, extra ones are dropped.
pub fn left_aligned<const N: usize>(words: &[u32]) -> [u32; N] {
    let mut out = [0u32; N];
    let len = words.len().min(N);
    out[..len].copy_from_slice(&words[..len]);
    out
}

/// Pack big-endian bytes into big-endian words, as a host hands back SCR data.
pub fn be_words<const N: usize>(bytes: &[u8]) -> [u32; N] {
    let mut words = [0u32; N];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks(4)) {
        let mut raw = [0u8; 4];
        raw[..chunk.len()].copy_from_slice(chunk);
        *word = u32::from_be_bytes(raw);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u8, arg: u32) -> [u8; 5] {
        let a = arg.to_be_bytes();
        [0x40 | index, a[0], a[1], a[2], a[3]]
    }

    #[test]
    fn crc7_matches_reference_frames() {
        assert_eq!(crc7(&frame(0, 0)), 0x4a);
        assert_eq!(crc7(&frame(8, 0x1aa)), 0x43);
        assert_eq!(crc7(&frame(17, 0)), 0x2a);
        assert_eq!(crc7(&frame(55, 0)), 0x32);
        assert_eq!(crc7(&frame(41, 0x4000_0000)), 0x3b);
    }

    #[test]
    fn crc7_frame_sets_end_bit() {
        assert_eq!(crc7_frame(&frame(0, 0)), 0x95);
        assert_eq!(crc7_frame(&frame(8, 0x1aa)), 0x87);
        assert_eq!(crc7_frame(&frame(17, 0)), 0x55);
    }

    #[test]
    fn crc7_over_register_body() {
        // CSD body whose trailing CRC byte on the wire is 0xA5
        let body = [
            0x00, 0x26, 0x00, 0x32, 0x5f, 0x59, 0x83, 0xc8, 0xad, 0xdb, 0xcf, 0xff, 0xd2, 0x40,
            0x40,
        ];
        assert_eq!(crc7_frame(&body), 0xa5);
    }

    #[test]
    fn extract_bits_spans_words() {
        let words = [0x1234_5678, 0x9abc_def0];
        assert_eq!(extract_bits(&words, 60, 4), 0x1);
        assert_eq!(extract_bits(&words, 0, 8), 0xf0);
        assert_eq!(extract_bits(&words, 28, 8), 0x89);
        assert_eq!(extract_bits(&words, 0, 32), 0x9abc_def0);
        assert_eq!(extract_bits(&words, 64, 8), 0);
    }

    #[test]
    fn left_aligned_pads_least_significant_end() {
        let words: [u32; 4] = left_aligned(&[0x0300_0000]);
        assert_eq!(words, [0x0300_0000, 0, 0, 0]);
        assert_eq!(extract_bits(&words, 120, 8), 0x03);

        let words: [u32; 2] = left_aligned(&[1, 2, 3]);
        assert_eq!(words, [1, 2]);
    }

    #[test]
    fn be_words_packs_scr_bytes() {
        let words: [u32; 2] = be_words(&[0x02, 0x35, 0x80, 0x00, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(words, [0x0235_8000, 0x0102_0304]);
    }
}

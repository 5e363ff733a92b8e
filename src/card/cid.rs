use crate::tools::{extract_bits, left_aligned};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SdCid {
    pub manufacturer_id: u8,
    pub application_id: u16,
    pub product_name: [u8; 5],
    pub product_version: u8,
    pub serial_number: u32,
    /// [11:4] years since 2000, [3:0] month.
    pub manufacturing_date: u16,
}

impl SdCid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the CID from an R2 response, `words[0]` = bits [127:96].
    ///
    /// Short input is padded at the least significant end.
    pub fn decode(words: &[u32]) -> Self {
        let words: [u32; 4] = left_aligned(words);
        let words = &words[..];
        let mut product_name = [0u8; 5];
        for (i, ch) in product_name.iter_mut().enumerate() {
            *ch = extract_bits(words, 96 - i * 8, 8) as u8;
        }
        SdCid {
            manufacturer_id: extract_bits(words, 120, 8) as u8,
            application_id: extract_bits(words, 104, 16) as u16,
            product_name,
            product_version: extract_bits(words, 56, 8) as u8,
            serial_number: extract_bits(words, 24, 32),
            manufacturing_date: extract_bits(words, 8, 12) as u16,
        }
    }

    pub fn product_name(&self) -> &str {
        core::str::from_utf8(&self.product_name).unwrap_or("")
    }

    pub fn manufacturing_year(&self) -> u16 {
        2000 + (self.manufacturing_date >> 4)
    }

    pub fn manufacturing_month(&self) -> u8 {
        (self.manufacturing_date & 0xf) as u8
    }
}

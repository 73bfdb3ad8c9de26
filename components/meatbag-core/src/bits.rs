//! Packs transcribed probe bits back into bytes, most significant bit first.

use crate::event::Level;

const BITS_PER_BYTE: u8 = 8;

#[derive(Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitAssembler {
    value: u8,
    count: u8,
}

impl BitAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bit: Level) -> Option<u8> {
        self.value = (self.value << 1) | bit.bit();
        self.count += 1;
        if self.count == BITS_PER_BYTE {
            let byte = self.value;
            trace!("Bits> assembled {:02X}", byte);
            self.clear();
            Some(byte)
        } else {
            None
        }
    }

    pub fn pending(&self) -> u8 {
        self.count
    }

    pub fn clear(&mut self) {
        self.value = 0;
        self.count = 0;
    }
}

/// The near address space that task and interrupt stacks live in.
///
/// Words are little-endian.
pub trait StackMemory {
    fn read_byte(&self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);

    fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    fn write_word(&mut self, addr: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_byte(addr, low);
        self.write_byte(addr.wrapping_add(1), high);
    }

    fn write_bytes(&mut self, addr: u16, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            self.write_byte(addr.wrapping_add(offset as u16), *byte);
        }
    }
}

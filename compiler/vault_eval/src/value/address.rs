//! Account addresses.

use std::fmt;

/// An 8-byte account address. Owners of stored values are addresses.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; Address::LEN]);

impl Address {
    pub const LEN: usize = 8;

    pub const fn new(bytes: [u8; Address::LEN]) -> Self {
        Address(bytes)
    }

    pub const fn from_u64(value: u64) -> Self {
        Address(value.to_be_bytes())
    }

    pub const fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    pub const fn bytes(&self) -> &[u8; Address::LEN] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

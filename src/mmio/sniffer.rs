use crate::mmio::{BankAccess, RegisterBank};

/// Wraps a [`RegisterBank`], forwarding accesses to the underlying window
/// while also reporting each one to the provided callback. Trace aid for
/// bring-up and tests.
#[derive(Debug)]
pub struct BankSniffer<'a, B, F: FnMut(BankAccess)> {
    bank: &'a mut B,
    on_access: F,
}

impl<'a, B: RegisterBank, F: FnMut(BankAccess)> BankSniffer<'a, B, F> {
    pub fn new(bank: &'a mut B, on_access: F) -> BankSniffer<'a, B, F> {
        BankSniffer { bank, on_access }
    }
}

impl<'a, B: RegisterBank, F: FnMut(BankAccess)> RegisterBank for BankSniffer<'a, B, F> {
    fn read(&mut self, offset: u32) -> u32 {
        let val = self.bank.read(offset);
        (self.on_access)(BankAccess::read(offset, val));
        val
    }

    fn write(&mut self, offset: u32, val: u32) {
        self.bank.write(offset, val);
        (self.on_access)(BankAccess::write(offset, val));
    }
}

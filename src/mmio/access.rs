/// Register access kind (read or write).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BankAccessKind {
    Read,
    Write,
}

/// One register access, as observed by [`super::BankSniffer`] or recorded
/// by [`super::soft::SoftLcdc`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BankAccess {
    pub kind: BankAccessKind,
    pub offset: u32,
    pub val: u32,
}

impl BankAccess {
    pub fn read(offset: u32, val: u32) -> BankAccess {
        BankAccess {
            kind: BankAccessKind::Read,
            offset,
            val,
        }
    }

    pub fn write(offset: u32, val: u32) -> BankAccess {
        BankAccess {
            kind: BankAccessKind::Write,
            offset,
            val,
        }
    }
}

impl std::fmt::Display for BankAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            BankAccessKind::Read => {
                write!(f, "r32({:#06x?}) // {:#010x?}", self.offset, self.val)
            }
            BankAccessKind::Write => {
                write!(f, "w32({:#06x?}, {:#010x?})", self.offset, self.val)
            }
        }
    }
}

//! PKA of the CC2538, driven through the `cc2538-pac` register blocks.

use core::ptr::{read_volatile, write_volatile};

use cc2538_pac::{PKA, SYS_CTRL};

use super::{Coprocessor, Register};
use crate::layout::PKA_RAM_WORDS;

/// The PKA RAM is not part of the register block.
const PKA_RAM_BASE: usize = 0x4400_6000;

/// The PKA bit in the `*SEC` clock gating and reset registers.
const SEC_PKA: u32 = 1 << 0;

/// The PKA peripheral.
///
/// Owning the PAC's `PKA` grants exclusive access to the engine registers and
/// its RAM. `SYS_CTRL` is borrowed to gate the engine clocks.
pub struct Pka<'d> {
    pka: PKA,
    sys_ctrl: &'d SYS_CTRL,
}

impl<'d> Pka<'d> {
    /// Takes ownership of the PKA peripheral.
    pub fn new(pka: PKA, sys_ctrl: &'d SYS_CTRL) -> Self {
        Self { pka, sys_ctrl }
    }

    /// Returns the PKA peripheral.
    pub fn free(self) -> PKA {
        self.pka
    }

    fn gate_clocks(&self, enable: bool) {
        let sys_ctrl = self.sys_ctrl;
        // The three gating registers have distinct PAC types, so they cannot
        // share an array; apply the same update to each.
        macro_rules! gate {
            ($register:expr) => {
                $register.modify(|r, w| unsafe {
                    if enable {
                        w.bits(r.bits() | SEC_PKA)
                    } else {
                        w.bits(r.bits() & !SEC_PKA)
                    }
                });
            };
        }
        gate!(sys_ctrl.rcgcsec);
        gate!(sys_ctrl.scgcsec);
        gate!(sys_ctrl.dcgcsec);
    }
}

impl core::fmt::Debug for Pka<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pka").finish_non_exhaustive()
    }
}

impl Coprocessor for Pka<'_> {
    fn init(&mut self) {
        self.gate_clocks(true);

        let srsec = &self.sys_ctrl.srsec;
        srsec.modify(|r, w| unsafe { w.bits(r.bits() | SEC_PKA) });
        srsec.modify(|r, w| unsafe { w.bits(r.bits() & !SEC_PKA) });
    }

    fn disable(&mut self) {
        self.gate_clocks(false);
    }

    fn read_register(&self, register: Register) -> u32 {
        let pka = &self.pka;
        match register {
            Register::APtr => pka.aptr.read().bits(),
            Register::BPtr => pka.bptr.read().bits(),
            Register::CPtr => pka.cptr.read().bits(),
            Register::DPtr => pka.dptr.read().bits(),
            Register::ALength => pka.alength.read().bits(),
            Register::BLength => pka.blength.read().bits(),
            Register::Shift => pka.shift.read().bits(),
            Register::Function => pka.function.read().bits(),
            Register::Compare => pka.compare.read().bits(),
            Register::Msw => pka.msw.read().bits(),
            Register::DivMsw => pka.divmsw.read().bits(),
        }
    }

    fn write_register(&mut self, register: Register, value: u32) {
        let pka = &self.pka;
        match register {
            Register::APtr => pka.aptr.write(|w| unsafe { w.bits(value) }),
            Register::BPtr => pka.bptr.write(|w| unsafe { w.bits(value) }),
            Register::CPtr => pka.cptr.write(|w| unsafe { w.bits(value) }),
            Register::DPtr => pka.dptr.write(|w| unsafe { w.bits(value) }),
            Register::ALength => pka.alength.write(|w| unsafe { w.bits(value) }),
            Register::BLength => pka.blength.write(|w| unsafe { w.bits(value) }),
            Register::Shift => pka.shift.write(|w| unsafe { w.bits(value) }),
            Register::Function => pka.function.write(|w| unsafe { w.bits(value) }),
            Register::Compare | Register::Msw | Register::DivMsw => {}
        }
    }

    fn read_ram(&self, offset: usize, words: &mut [u32]) {
        assert!(offset + words.len() <= PKA_RAM_WORDS);

        let base = (PKA_RAM_BASE as *const u32).wrapping_add(offset);
        for (i, word) in words.iter_mut().enumerate() {
            // SAFETY: bounds checked above, and `self` owns the PKA.
            *word = unsafe { read_volatile(base.add(i)) };
        }
    }

    fn write_ram(&mut self, offset: usize, words: &[u32]) {
        assert!(offset + words.len() <= PKA_RAM_WORDS);

        let base = (PKA_RAM_BASE as *mut u32).wrapping_add(offset);
        for (i, word) in words.iter().enumerate() {
            // SAFETY: bounds checked above, and `self` owns the PKA.
            unsafe { write_volatile(base.add(i), *word) };
        }
    }

    fn is_busy(&self) -> bool {
        self.pka.function.read().run().bit_is_set()
    }
}

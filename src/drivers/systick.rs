use cortex_m::peripheral::{syst::RegisterBlock, SCB, SYST};

use crate::{TickRegisters, MAX_RELOAD};

const CSR_ENABLE: u32 = 1 << 0;
const CSR_TICKINT: u32 = 1 << 1;
const CSR_CLKSOURCE: u32 = 1 << 2;
const CSR_COUNTFLAG: u32 = 1 << 16;
const ICSR_PENDSTCLR: u32 = 1 << 25;

/// The cortex SysTick counter.
///
/// SysTick is inherently racy as reading COUNTFLAG, which tells whether the counter has reached zero,
/// _also clears the flag_. The control bits are therefore kept in a shadow copy and written,
/// never read-modify-written, so that CSR is only read by `consume_zero_flag()`.
pub struct SysTickRegisters {
    ctrl: u32,
}

impl SysTickRegisters {
    /// Take ownership of the SysTick peripheral.
    pub fn new(_syst: SYST) -> Self {
        Self { ctrl: 0 }
    }

    /// Create the driver without the peripheral token, e.g. for a `static` timer.
    ///
    /// # Safety
    ///
    /// Nothing else may access the SysTick registers.
    pub const unsafe fn steal() -> Self {
        Self { ctrl: 0 }
    }

    #[inline]
    fn regs(&self) -> &'static RegisterBlock {
        unsafe { &*SYST::PTR }
    }

    #[inline]
    fn write_ctrl(&mut self, ctrl: u32) {
        self.ctrl = ctrl;
        unsafe { self.regs().csr.write(ctrl) };
    }
}

impl TickRegisters for SysTickRegisters {
    fn program(&mut self, reload: u32) {
        unsafe {
            self.regs().rvr.write(reload & MAX_RELOAD);
            // Any write clears the current value and COUNTFLAG.
            self.regs().cvr.write(0);
            // Drop an exception that was pended by the previous period.
            (*SCB::PTR).icsr.write(ICSR_PENDSTCLR);
        }
    }

    fn reload(&mut self, reload: u32) {
        // The counter keeps running and loads the new value at the next wrap.
        unsafe { self.regs().rvr.write(reload & MAX_RELOAD) };
    }

    fn start(&mut self) {
        self.write_ctrl(self.ctrl | CSR_ENABLE);
    }

    fn stop(&mut self) {
        self.write_ctrl(self.ctrl & !CSR_ENABLE);
        unsafe { (*SCB::PTR).icsr.write(ICSR_PENDSTCLR) };
    }

    fn current_value(&self) -> u32 {
        self.regs().cvr.read()
    }

    fn consume_zero_flag(&mut self) -> bool {
        // This reads the register and returns 1 if the counter reached 0 _since last time this was read_.
        self.regs().csr.read() & CSR_COUNTFLAG != 0
    }

    fn enable_interrupt(&mut self) {
        // Counting down to 0 triggers the SysTick exception.
        self.write_ctrl(self.ctrl | CSR_TICKINT);
    }

    fn disable_interrupt(&mut self) {
        self.write_ctrl(self.ctrl & !CSR_TICKINT);
    }

    fn select_core_clock(&mut self) {
        self.write_ctrl(self.ctrl | CSR_CLKSOURCE);
    }
}

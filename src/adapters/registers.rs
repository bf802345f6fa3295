/// The register interface of a 24 bit down-counter with a latched zero-cross flag.
pub trait TickRegisters: Send {
    /// Write the reload register and clear the current value.
    /// This does not start the counter.
    fn program(&mut self, reload: u32);

    /// Write the reload register only, leaving the running count alone.
    /// The new value takes effect at the next zero-cross.
    fn reload(&mut self, reload: u32);

    /// Start counting down.
    fn start(&mut self);

    /// Stop counting and drop a zero-cross interrupt that is already pending.
    fn stop(&mut self);

    /// Get the number of ticks remaining until the counter reaches zero.
    fn current_value(&self) -> u32;

    /// Get whether the counter has reached zero since the flag was last read.
    ///
    /// Reading the flag also clears it, so a read that discards the result loses the edge.
    fn consume_zero_flag(&mut self) -> bool;

    /// Enable the zero-cross interrupt.
    fn enable_interrupt(&mut self);

    /// Disable the zero-cross interrupt.
    fn disable_interrupt(&mut self);

    /// Let the counter run from the system clock.
    fn select_core_clock(&mut self) {}
}

//! Watchdog and device identity

/// Device supervision services
pub trait Supervisor {
    /// Watchdog timeout in seconds, `None` when disabled
    fn watchdog_timeout(&self) -> Option<u32>;

    /// Set the watchdog timeout; zero disables it
    ///
    /// Acknowledges a pending watchdog reset.
    fn set_watchdog(&mut self, seconds: u32);

    /// The last reset was caused by the watchdog and has not been acknowledged
    fn reset_by_watchdog(&self) -> bool;

    /// 128-bit unique device identifier
    fn serial_number(&self) -> [u32; 4];
}

//! Device collaborators used by the syscall layer
//!
//! The kernel owns the real drivers. This layer only needs three narrow
//! views of them:
//! - [`Console`]: byte sink behind descriptor 1 and the exit records
//! - [`Keyboard`]: byte source behind descriptor 0
//! - [`Power`]: the `halt` syscall
//!
//! All methods take `&self`. Drivers are shared by every process and do
//! their own locking, the same way a UART sits behind a spinlock.

pub mod console;

pub use console::ConsoleWriter;

/// Output device that user programs reach through descriptor 1.
pub trait Console {
    /// Write every byte of `buf`. Console writes are never partial.
    fn write_bytes(&self, buf: &[u8]);
}

/// Input device that user programs reach through descriptor 0.
pub trait Keyboard {
    /// Next byte of input, or `None` once the device has nothing more to give.
    ///
    /// A hardware keyboard blocks instead of returning `None`.
    fn read_byte(&self) -> Option<u8>;
}

/// Machine power control.
pub trait Power {
    fn power_off(&self);
}

/// The device set handed to the dispatcher.
#[derive(Clone, Copy)]
pub struct Devices {
    pub console: &'static (dyn Console + Sync),
    pub keyboard: &'static (dyn Keyboard + Sync),
    pub power: &'static (dyn Power + Sync),
}

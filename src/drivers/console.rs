//! Formatted output over a [`Console`]
//!
//! The console driver itself lives with the kernel. This adapter lets the
//! syscall layer use `write!` for the records it prints on behalf of user
//! processes, such as `"echo: exit(0)"`.

use core::fmt::{self, Write};

use super::Console;

/// `core::fmt::Write` adapter over a console device.
pub struct ConsoleWriter<'a> {
    console: &'a dyn Console,
}

impl<'a> ConsoleWriter<'a> {
    pub fn new(console: &'a dyn Console) -> Self {
        Self { console }
    }
}

impl Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.console.write_bytes(s.as_bytes());
        Ok(())
    }
}

/// Print a formatted line to a console device.
#[macro_export]
macro_rules! console_println {
    ($console:expr, $($arg:tt)*) => {{
        use core::fmt::Write;
        let mut writer = $crate::drivers::ConsoleWriter::new($console);
        let _ = writeln!(writer, $($arg)*);
    }};
}

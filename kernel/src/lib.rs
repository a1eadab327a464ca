//! # Paged-memory emulator core
//!
//! ## Overview
//!
//! - A 16-bit machine with 65536 words of memory split into 32 frames of
//!   2048 words.
//! - Every process gets its own single-level page table: two read-only code
//!   pages and two read/write heap pages at creation, more heap on request.
//! - Processes share the CPU cooperatively and switch on `YIELD` and `HALT`.
//! - Any memory fault ends the whole run.
//!
//! ```no_run
//! use pagevm_kernel::{console::StdConsole, Emulator};
//!
//! let mut emu = Emulator::new(StdConsole);
//! let pid = emu.create_process(&[0xf025], &[]).unwrap();
//! emu.load_process(pid);
//! emu.run().unwrap();
//! ```

pub mod config;
pub mod console;
pub mod cpu;
pub mod emulator;
pub mod loader;
pub mod logging;
pub mod mm;
pub mod syscall;
pub mod task;
pub mod trap;

pub use emulator::Emulator;
pub use loader::{load_image, LoadError};
pub use mm::MapError;
pub use task::{CreateError, ProcessStatus};
pub use trap::{Fault, TrapCode};

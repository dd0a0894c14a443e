//! Host-side implementation of the WASI `snapshot_preview1` file I/O
//! surface: a rights/flags codec, a composable virtual file system, a
//! dense descriptor table, and the call dispatcher tying the three
//! together for an embedder to drive against guest linear memory.

pub mod ctx;
pub mod dispatcher;
mod error;
pub mod fs;
pub mod rights;
pub mod table;
pub mod wire;

pub use ctx::{PreopenDir, WasiCtx, WasiCtxBuilder};
pub use dispatcher::{Dispatcher, GuestMemory};
pub use error::{Error, Result};

//! # Resource Watch
//!
//! The File Observer (§4.6, a pure transport over `notify`) and the
//! Hot-Reload Manager (§4.7, debounced classification + dispatch) that sits
//! between it and the loader/registry pairs built in `resource-loaders`.

mod observer;
mod reload;

pub use observer::{FileObserver, FilenameFilters, Operation, RawEvent};
pub use reload::{ChangeType, HotReloadManager, LoaderReloadHandler, ReloadEvent, ReloadHandler, Registration};

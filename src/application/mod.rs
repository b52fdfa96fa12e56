// Application layer - use cases over the ledger store.
// The CLI (and any other client) talks to `SplitService` only.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;

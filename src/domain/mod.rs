mod error;
mod expense;
mod group;
mod integrity;
mod ledger;
mod money;
mod settlement;
mod simplify;
mod split;
mod summary;

pub use error::*;
pub use expense::*;
pub use group::*;
pub use integrity::*;
pub use ledger::*;
pub use money::*;
pub use settlement::*;
pub use simplify::*;
pub use split::*;
pub use summary::*;

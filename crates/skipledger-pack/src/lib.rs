//! Wire encodings layered on top of `skipledger-core`: the authenticated
//! path container (`PathPack`, full and condensed), the timechain witness
//! record (`NotarizedRow`), and the named-section container (`Bundle`).

mod bundle;
mod error;
mod notarized;
mod pack;

pub use bundle::{Bundle, RESERVED_PREFIX};
pub use error::Error;
pub use notarized::{NotarizedRow, Trail, CRUM_SIZE};
pub use pack::{fold_funnel, FunnelEntry, PackKind, PathPack, RefEntry};

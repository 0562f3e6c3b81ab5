mod panel;
mod result;

pub use panel::{Credential, Panel, ProbeTarget};
pub use result::{ConnectionResult, ResultRow, TransportErrorKind};

//! Remote configuration transport.
//!
//! A [`Transport`] applies or removes one [`ResourceDescriptor`] on the
//! target environment. Deployment steps turn catalog entries into
//! descriptors and hand them over one at a time.

mod error;
mod http;
mod traits;
mod types;

pub use error::TransportError;
pub use http::HttpTransport;
pub use traits::Transport;
pub use types::{ResourceDescriptor, ResourceKind};

//! Client-side building blocks for ClassChat: the transport selector, the
//! two transport implementations it chooses between, and the reconciliation
//! layer that merges either transport's stream into the on-screen lists.

pub mod cache;
pub mod hosted;
pub mod profile;
pub mod relay;
pub mod selector;
pub mod session;
pub mod transport;
pub mod view;

pub use profile::Profile;
pub use selector::{select_transport, DeploymentEnv};
pub use session::{ChatSession, SendFailure};
pub use transport::{ChatTransport, ConnectionState, TransportError, TransportUpdate};
pub use view::{ChatView, TypingState};

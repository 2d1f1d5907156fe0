mod cache;
mod codec;
mod keys;
mod runtime;
mod store;

pub use cache::{PermissionSnapshotCache, SessionCache};
pub use codec::{TokenCodec, TokenKind};
pub use keys::cache_keys;
pub use runtime::{Clock, IdGenerator};
pub use store::{ChangeLogQuery, CredentialStore, GrantMutation};

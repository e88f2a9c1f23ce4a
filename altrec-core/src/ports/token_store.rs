//! Durable token storage port

use crate::domain::result::Result;
use crate::domain::AccessToken;

/// Key-value storage for the single persisted access token
///
/// Written only by the session manager; the authenticated API client reads
/// it before every request.
pub trait TokenStore: Send + Sync {
    /// Read the persisted token
    fn load(&self) -> Result<Option<AccessToken>>;

    /// Persist a token, replacing any previous one
    fn save(&self, token: &AccessToken) -> Result<()>;

    /// Remove the persisted token; succeeds when nothing is stored
    fn clear(&self) -> Result<()>;
}

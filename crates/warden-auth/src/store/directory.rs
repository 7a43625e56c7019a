//! Principal lookup.

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_database::repositories::PrincipalRepository;
use warden_entity::principal::Principal;

/// Loads principals, with their role assignments, for authentication.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync + 'static {
    /// Looks a principal up by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Principal>>;

    /// Looks a principal up by login name.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Principal>>;
}

#[async_trait]
impl PrincipalDirectory for PrincipalRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Principal>> {
        PrincipalRepository::find_by_id(self, id).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Principal>> {
        PrincipalRepository::find_by_username(self, username).await
    }
}

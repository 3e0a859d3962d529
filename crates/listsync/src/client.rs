//! The Client: one gateway, one session, many stores.
//!
//! The client owns the gateway and hands out stores that share it. It also
//! carries the auth and upload services used to fill drafts before they are
//! inserted.

use std::path::Path;
use std::sync::Arc;

use listsync_core::{Criteria, Entity, Record};
use listsync_gateway::{Gateway, MemoryGateway, SqliteGateway};
use listsync_services::{
    Attachable, AuthProvider, Authored, MemoryAuth, MemoryUploads, Upload, UploadService,
    UploadedFile, User,
};
use listsync_store::{StoreConfig, SyncStore};

use crate::error::Result;

/// Configuration for the Client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Configuration given to every store the client creates.
    pub store: StoreConfig,
}

/// Entry point tying a gateway to auth and uploads.
pub struct Client<G: Gateway, A: AuthProvider, U: UploadService> {
    gateway: Arc<G>,
    auth: A,
    uploads: U,
    config: ClientConfig,
}

impl Client<MemoryGateway, MemoryAuth, MemoryUploads> {
    /// A client with every backend in memory, signed out.
    pub fn in_memory(config: ClientConfig) -> Self {
        Self::new(
            MemoryGateway::new(),
            MemoryAuth::new(),
            MemoryUploads::new(),
            config,
        )
    }
}

impl<A: AuthProvider, U: UploadService> Client<SqliteGateway, A, U> {
    /// A client backed by a SQLite file, created if missing.
    pub fn open_sqlite(
        path: impl AsRef<Path>,
        auth: A,
        uploads: U,
        config: ClientConfig,
    ) -> Result<Self> {
        let gateway = SqliteGateway::open(path)?;
        Ok(Self::new(gateway, auth, uploads, config))
    }
}

impl<G, A, U> Client<G, A, U>
where
    G: Gateway + 'static,
    A: AuthProvider,
    U: UploadService,
{
    pub fn new(gateway: G, auth: A, uploads: U, config: ClientConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            auth,
            uploads,
            config,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    pub fn uploads(&self) -> &U {
        &self.uploads
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stores
    // ─────────────────────────────────────────────────────────────────────────

    /// A new, uninitialized store sharing this client's gateway.
    pub fn store<E: Entity>(&self) -> SyncStore<E, Arc<G>> {
        SyncStore::new(Arc::clone(&self.gateway), self.config.store.clone())
    }

    /// A new store, initialized with `criteria` and loaded.
    ///
    /// A failed first load is reported through the store's `load_error`.
    pub async fn open<E: Entity>(&self, criteria: Criteria) -> SyncStore<E, Arc<G>> {
        let store = self.store::<E>();
        store.initialize(criteria).await;
        if let Some(error) = store.load_error() {
            tracing::warn!(entity = E::NAME, error = %error, "store opened without data");
        }
        store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.auth.current_user().await?)
    }

    /// The current user, or `Unauthenticated`.
    pub async fn require_user(&self) -> Result<User> {
        Ok(self.auth.require_user().await?)
    }

    pub async fn login(&self, user: User) -> Result<()> {
        Ok(self.auth.login(user).await?)
    }

    pub async fn logout(&self) -> Result<()> {
        Ok(self.auth.logout().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Drafts
    // ─────────────────────────────────────────────────────────────────────────

    /// Stamp the current user on `draft` and insert it optimistically.
    ///
    /// Fails with `Unauthenticated` before touching the store when signed
    /// out.
    pub async fn insert_authored<E, S>(&self, store: &SyncStore<E, S>, mut draft: E) -> Result<Record<E>>
    where
        E: Entity + Authored,
        S: Gateway + 'static,
    {
        let user = self.require_user().await?;
        draft.set_author(&user);
        Ok(store.insert_optimistic(draft).await?)
    }

    /// Upload a file.
    pub async fn upload(&self, file: Upload) -> Result<UploadedFile> {
        let name = file.name.clone();
        let uploaded = self.uploads.upload(file).await?;
        tracing::debug!(file = %name, url = %uploaded.url, "uploaded");
        Ok(uploaded)
    }

    /// Upload `file`, point `draft` at it, and insert it optimistically.
    ///
    /// A failed upload leaves the store untouched.
    pub async fn insert_with_attachment<E, S>(
        &self,
        store: &SyncStore<E, S>,
        mut draft: E,
        file: Upload,
    ) -> Result<Record<E>>
    where
        E: Entity + Attachable,
        S: Gateway + 'static,
    {
        let uploaded = self.upload(file).await?;
        draft.attach(&uploaded);
        Ok(store.insert_optimistic(draft).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use listsync_services::ServiceError;

    #[test]
    fn test_service_errors_map() {
        assert!(matches!(
            ClientError::from(ServiceError::Unauthenticated),
            ClientError::Unauthenticated
        ));
        assert!(matches!(
            ClientError::from(ServiceError::UploadRejected("empty".into())),
            ClientError::Service(_)
        ));
    }

    #[tokio::test]
    async fn test_session_passthrough() {
        let client = Client::in_memory(ClientConfig::default());
        assert!(client.current_user().await.unwrap().is_none());
        assert!(matches!(
            client.require_user().await,
            Err(ClientError::Unauthenticated)
        ));

        client
            .login(User::new("u-1", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(client.require_user().await.unwrap().id, "u-1");

        client.logout().await.unwrap();
        assert!(client.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stores_share_the_gateway() {
        let client = Client::in_memory(ClientConfig {
            store: StoreConfig::manual(),
        });
        assert!(client.config().store.poll_interval.is_none());

        let a = client.store::<Note>();
        let b = client.open::<Note>(Criteria::all()).await;
        a.initialize(Criteria::all()).await;
        a.insert_optimistic(Note { text: "x".into() }).await.unwrap();

        b.refresh().await.unwrap();
        assert_eq!(b.records().len(), 1);
        assert_eq!(client.gateway().count("Note").unwrap(), 1);
    }

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Note {
        text: String,
    }

    impl Entity for Note {
        const NAME: &'static str = "Note";
        type Patch = Note;

        fn apply_patch(&mut self, patch: &Note) {
            self.text = patch.text.clone();
        }
    }
}

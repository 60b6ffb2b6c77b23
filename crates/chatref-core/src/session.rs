//! Per-command session.
//!
//! A `Session` owns the messaging connection and the identity store for the
//! duration of one command. `Session::run` connects, runs the command and
//! disconnects on every path out, including errors.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{
    messaging::port::MessagingPort,
    resolver::{Resolved, Resolver},
    store::IdentityStore,
    Result,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub struct Session {
    port: Arc<dyn MessagingPort>,
    store: IdentityStore,
}

impl Session {
    pub fn new(port: Arc<dyn MessagingPort>, store: IdentityStore) -> Self {
        Self { port, store }
    }

    pub fn port(&self) -> &dyn MessagingPort {
        self.port.as_ref()
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    /// Connect, run `f`, disconnect. A failed disconnect is logged and does not
    /// replace the command's own result.
    pub async fn run<T, F>(port: Arc<dyn MessagingPort>, store: IdentityStore, f: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s Session) -> BoxFuture<'s, Result<T>>,
    {
        let session = Session::new(port, store);
        session.port.connect().await?;
        tracing::debug!("messaging session connected");

        let result = f(&session).await;

        match session.port.disconnect().await {
            Ok(()) => tracing::debug!("messaging session closed"),
            Err(e) => tracing::warn!(error = %e, "disconnect failed"),
        }
        result
    }

    /// Resolve an operator token against the current tables, falling back to
    /// a remote handle lookup.
    pub async fn resolve(&self, token: &str) -> Result<Resolved> {
        let hashes = self.store.load_hashes()?;
        let tags = self.store.load_tags()?;
        Resolver::new(&hashes, &tags)
            .resolve(token, self.port())
            .await
    }
}

use anyhow::Context as _;
use rsa::pkcs8::{EncodePrivateKey as _, EncodePublicKey as _, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::process::Child;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

/// An axum app served on an ephemeral localhost port for the duration of a test.
pub struct TestHttpServer {
    base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestHttpServer {
    /// Bind `127.0.0.1:0` and start serving `app` in a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or its local address cannot be read.
    pub async fn start(app: axum::Router) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind ephemeral port")?;
        let addr = listener.local_addr().context("local_addr")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let handle = tokio::spawn(async move { server.await });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Stop accepting connections and wait for the server task.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task panicked or the server itself failed.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle
            .await
            .context("server task join")?
            .context("server result")
    }
}

/// PEM-encoded RSA key pair standing in for a Google service-account key.
pub struct TestServiceAccountKey {
    /// PKCS#8 `BEGIN PRIVATE KEY` block, the format Google issues.
    pub private_key_pem: String,
    pub public_key_pem: String,
}

impl TestServiceAccountKey {
    /// The private key as it usually appears in an env var: one line, newlines escaped as `\n`.
    #[must_use]
    pub fn escaped_private_key(&self) -> String {
        self.private_key_pem.replace('\n', "\\n")
    }
}

/// A process-wide RSA key, generated once (key generation is slow in debug builds).
///
/// # Panics
///
/// Panics if key generation or PEM encoding fails.
pub fn service_account_key() -> &'static TestServiceAccountKey {
    static KEY: OnceLock<TestServiceAccountKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("generate rsa key");
        let public_key = RsaPublicKey::from(&private_key);

        let private_key_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("encode private key")
            .to_string();
        let public_key_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .expect("encode public key");

        TestServiceAccountKey {
            private_key_pem,
            public_key_pem,
        }
    })
}

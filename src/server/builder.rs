//! ServerBuilder for fluent API to build HTTP servers

use super::entity_registry::{EntityDescriptor, EntityRegistry};
use super::exposure::RestExposure;
use super::host::ServerHost;
use crate::config::{AppConfig, PaginationConfig, PermissionsConfig, StorageConfig};
use crate::core::auth::{AuthProvider, TokenAuthProvider};
use crate::core::service::{AuthorService, BookService, Datastore, UserService};
use crate::storage::{InMemoryStore, apply_seed};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Storage handles taken from one datastore
struct Services {
    authors: Arc<dyn AuthorService>,
    books: Arc<dyn BookService>,
    users: Arc<dyn UserService>,
}

/// Builder for creating the HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_store(InMemoryStore::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    services: Option<Services>,
    auth: Option<Arc<dyn AuthProvider>>,
    permissions: PermissionsConfig,
    pagination: PaginationConfig,
    registry: EntityRegistry,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder serving books and authors
    pub fn new() -> Self {
        Self {
            services: None,
            auth: None,
            permissions: PermissionsConfig::default(),
            pagination: PaginationConfig::default(),
            registry: RestExposure::default_registry(),
            custom_routes: Vec::new(),
        }
    }

    /// Build from configuration: connect storage, apply the seed data
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let builder = Self::new()
            .with_permissions(config.permissions)
            .with_pagination(config.pagination);

        match &config.storage {
            StorageConfig::InMemory => {
                let store = InMemoryStore::new();
                let report = apply_seed(&store, &config.seed).await?;
                tracing::info!(?report, "Using in-memory storage");
                Ok(builder.with_store(store))
            }
            #[cfg(feature = "postgres")]
            StorageConfig::Postgres {
                url,
                max_connections,
            } => {
                let store = crate::storage::PostgresStore::connect(url, *max_connections).await?;
                let report = apply_seed(&store, &config.seed).await?;
                tracing::info!(?report, "Using PostgreSQL storage");
                Ok(builder.with_store(store))
            }
            #[cfg(not(feature = "postgres"))]
            StorageConfig::Postgres { .. } => Err(anyhow::anyhow!(
                "PostgreSQL storage requires building with the `postgres` feature"
            )),
        }
    }

    /// Set the datastore (required)
    pub fn with_store(mut self, store: impl Datastore) -> Self {
        let store = Arc::new(store);
        self.services = Some(Services {
            authors: store.clone(),
            books: store.clone(),
            users: store,
        });
        self
    }

    /// Replace the default token authentication
    pub fn with_auth_provider(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionsConfig) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Register an additional entity (or replace a default one)
    pub fn register_entity(mut self, descriptor: impl EntityDescriptor + 'static) -> Self {
        self.registry.register(Box::new(descriptor));
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this to add routes that don't fit the CRUD pattern, such as
    /// webhooks or admin endpoints.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(&mut self) -> Result<ServerHost> {
        let services = self
            .services
            .take()
            .ok_or_else(|| anyhow::anyhow!("A datastore is required. Call .with_store()"))?;

        let auth = self
            .auth
            .take()
            .unwrap_or_else(|| Arc::new(TokenAuthProvider::new(services.users.clone())));

        Ok(ServerHost::from_parts(
            services.authors,
            services.books,
            services.users,
            auth,
            self.permissions,
            self.pagination,
        ))
    }

    /// Build the final REST router, wrapped in request tracing and CORS
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        let app = RestExposure::build_router(host, &self.registry, custom_routes)?;

        Ok(app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        ))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Permissive CORS: the API is token based, no cookies are involved
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SeedAuthor, SeedConfig};
    use crate::core::auth::AuthContext;
    use crate::core::error::StorageResult;
    use async_trait::async_trait;
    use axum::http::HeaderMap;
    use axum::routing::get;

    struct AlwaysAnonymous;

    #[async_trait]
    impl AuthProvider for AlwaysAnonymous {
        async fn authenticate(&self, _: &HeaderMap) -> StorageResult<AuthContext> {
            Ok(AuthContext::Anonymous)
        }
    }

    #[test]
    fn test_new_creates_builder_with_default_resources() {
        let builder = ServerBuilder::new();
        assert!(builder.services.is_none());
        assert!(builder.custom_routes.is_empty());
        assert_eq!(builder.registry.entity_types(), vec!["book", "author"]);
    }

    #[test]
    fn test_build_without_store_fails() {
        let result = ServerBuilder::new().build();
        let err_msg = format!("{}", result.err().expect("should be Err"));
        assert!(
            err_msg.contains("datastore is required"),
            "error should mention the datastore: {}",
            err_msg
        );
    }

    #[test]
    fn test_build_host_uses_custom_auth_provider() {
        let mut builder = ServerBuilder::new()
            .with_store(InMemoryStore::new())
            .with_auth_provider(AlwaysAnonymous);
        let host = builder.build_host().expect("build_host should succeed");
        assert_eq!(host.book_query.default_page_size, 20);
    }

    #[tokio::test]
    async fn test_build_with_custom_routes() {
        let custom = Router::new().route("/custom", get(|| async { "ok" }));
        let router = ServerBuilder::new()
            .with_store(InMemoryStore::new())
            .with_custom_routes(custom)
            .build()
            .expect("build should succeed with custom routes");

        let server = axum_test::TestServer::new(router).unwrap();
        server.get("/custom").await.assert_text("ok");
        server.get("/health").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_from_config_seeds_in_memory_store() {
        let config = AppConfig {
            seed: SeedConfig {
                authors: vec![SeedAuthor {
                    name: "Jane Austen".to_string(),
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let router = ServerBuilder::from_config(&config).await.unwrap().build().unwrap();
        let server = axum_test::TestServer::new(router).unwrap();

        let authors: serde_json::Value = server.get("/api/authors/").await.json();
        assert_eq!(authors[0]["name"], "Jane Austen");
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_from_config_rejects_postgres_without_feature() {
        let config = AppConfig {
            storage: StorageConfig::Postgres {
                url: "postgres://localhost/books".to_string(),
                max_connections: 1,
            },
            ..Default::default()
        };
        assert!(ServerBuilder::from_config(&config).await.is_err());
    }
}

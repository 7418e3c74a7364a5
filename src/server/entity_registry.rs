//! Entity registry for managing entity descriptors and building guarded CRUD routes

use super::host::ServerHost;
use super::router::guarded_routes;
use crate::core::auth::{PermissionTable, Target};
use axum::Router;
use axum::routing::MethodRouter;
use std::sync::Arc;

/// Describes how one entity is exposed over HTTP
///
/// Each resource provides a collection route (list, create) and an item
/// route (retrieve, update, partial update, delete); the registry puts the
/// permission guard in front of both.
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g., "book")
    fn entity_type(&self) -> &str;

    /// e.g. `/api/books_all/`
    fn collection_path(&self) -> &str;

    /// e.g. `/api/books_all/{id}/`
    fn item_path(&self) -> &str;

    /// Permission table in effect for this entity
    fn permissions(&self, host: &ServerHost) -> PermissionTable;

    fn collection_routes(&self) -> MethodRouter<Arc<ServerHost>>;

    fn item_routes(&self) -> MethodRouter<Arc<ServerHost>>;
}

/// Registry for all entities in the application, in registration order
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: Vec<Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Register an entity descriptor; a second descriptor for the same
    /// entity type replaces the first
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        self.descriptors
            .retain(|d| d.entity_type() != descriptor.entity_type());
        self.descriptors.push(descriptor);
    }

    /// Build a router with all registered entity routes
    pub fn build_routes(&self, host: &Arc<ServerHost>) -> Router<Arc<ServerHost>> {
        let mut router = Router::new();

        for descriptor in &self.descriptors {
            let permissions = descriptor.permissions(host);
            router = router
                .merge(guarded_routes(
                    host,
                    descriptor.collection_path(),
                    Target::Collection,
                    permissions,
                    descriptor.collection_routes(),
                ))
                .merge(guarded_routes(
                    host,
                    descriptor.item_path(),
                    Target::Item,
                    permissions,
                    descriptor.item_routes(),
                ));
        }

        router
    }

    /// Get all registered entity types
    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.entity_type()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PaginationConfig, PermissionsConfig};
    use crate::storage::InMemoryStore;
    use axum::routing::get;

    /// Minimal mock EntityDescriptor for testing
    struct MockDescriptor {
        entity_type: &'static str,
        plural: &'static str,
    }

    impl EntityDescriptor for MockDescriptor {
        fn entity_type(&self) -> &str {
            self.entity_type
        }

        fn collection_path(&self) -> &str {
            self.plural
        }

        fn item_path(&self) -> &str {
            "/shelves/{id}/"
        }

        fn permissions(&self, _host: &ServerHost) -> PermissionTable {
            PermissionTable::default()
        }

        fn collection_routes(&self) -> MethodRouter<Arc<ServerHost>> {
            get(|| async { "shelves" })
        }

        fn item_routes(&self) -> MethodRouter<Arc<ServerHost>> {
            get(|| async { "shelf" })
        }
    }

    fn host() -> Arc<ServerHost> {
        Arc::new(ServerHost::from_store(
            Arc::new(InMemoryStore::new()),
            PermissionsConfig::default(),
            PaginationConfig::default(),
        ))
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = EntityRegistry::new();
        assert!(registry.entity_types().is_empty());
    }

    #[test]
    fn test_register_keeps_order() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor {
            entity_type: "shelf",
            plural: "/shelves/",
        }));
        registry.register(Box::new(MockDescriptor {
            entity_type: "rack",
            plural: "/racks/",
        }));
        assert_eq!(registry.entity_types(), vec!["shelf", "rack"]);
    }

    #[test]
    fn test_register_duplicate_replaces() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor {
            entity_type: "shelf",
            plural: "/shelves/",
        }));
        registry.register(Box::new(MockDescriptor {
            entity_type: "shelf",
            plural: "/bookshelves/",
        }));
        assert_eq!(registry.entity_types().len(), 1);
        assert_eq!(registry.descriptors[0].collection_path(), "/bookshelves/");
    }

    #[tokio::test]
    async fn test_build_routes_serves_registered_paths() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor {
            entity_type: "shelf",
            plural: "/shelves/",
        }));
        let host = host();
        let app = registry.build_routes(&host).with_state(host);
        let server = axum_test::TestServer::new(app).unwrap();

        server.get("/shelves/").await.assert_text("shelves");
        server.get("/shelves/3/").await.assert_text("shelf");
    }
}

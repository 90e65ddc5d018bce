//! Read caches and the invalidation table.
//!
//! Every cacheable query result lives in one of nine namespaces, each its own
//! `moka` cache so a whole namespace can be dropped in one call. All
//! invalidation rules are in [`CacheRegistry::apply`]: services report the
//! [`Mutation`] they performed and the registry evicts everything that could
//! have been derived from the touched rows, synchronously, before the write
//! is reported back to the caller.
//!
//! List and search namespaces are invalidated wholesale because their entries
//! depend on unpredictable combinations of rows; point namespaces are evicted
//! by id.

use std::time::Duration;

use moka::future::Cache;

use bazaar_core::{CartItemId, CategoryId, ProductId, UserId};

use crate::models::{CartItemView, CategoryView, ProductView, UserView};

/// How long read-cache entries live without being invalidated.
const READ_CACHE_TTL: Duration = Duration::from_secs(300);

/// Entries per namespace before LRU eviction.
const READ_CACHE_CAPACITY: u64 = 1_000;

/// A state-changing operation, as reported by the service that performed it.
///
/// One variant per mutating operation; the mapping from variant to evicted
/// namespaces is the single place invalidation rules are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// A user edited their profile.
    UserUpdated(UserId),
    /// A user was soft-deleted (self-service or admin). Seller products may
    /// have been deactivated alongside, so product namespaces go too.
    UserDeleted(UserId),
    /// Email verification created a user row.
    UserCreated,
    /// A category was added.
    CategoryAdded,
    /// A category was renamed.
    CategoryUpdated(CategoryId),
    /// A category was removed; products referencing it changed shape.
    CategoryDeleted(CategoryId),
    /// A product was listed.
    ProductAdded,
    /// A product's fields changed.
    ProductUpdated(ProductId),
    /// A product was removed; cart lines referencing it are gone.
    ProductDeleted(ProductId),
    /// A line was added to a user's cart.
    CartItemAdded { user: UserId },
    /// A cart line's quantity changed.
    CartItemUpdated { user: UserId, item: CartItemId },
    /// A cart line was removed.
    CartItemDeleted { user: UserId, item: CartItemId },
    /// A whole cart was deleted; the ids of its lines are unknown here.
    CartCleared { user: UserId },
    /// The purge sweep hard-deleted expired accounts; affected ids cannot be
    /// enumerated cheaply, so both user namespaces are dropped wholesale.
    DeletedAccountsPurged,
}

/// The nine read-cache namespaces.
pub struct CacheRegistry {
    users: Cache<String, Vec<UserView>>,
    user: Cache<UserId, UserView>,
    products: Cache<String, Vec<ProductView>>,
    product: Cache<ProductId, ProductView>,
    searched_products: Cache<String, Vec<ProductView>>,
    categories: Cache<String, Vec<CategoryView>>,
    category: Cache<CategoryId, CategoryView>,
    cart_items: Cache<UserId, Vec<CartItemView>>,
    cart_item: Cache<CartItemId, (CartItemView, UserId)>,
}

fn build_cache<K, V>() -> Cache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(READ_CACHE_CAPACITY)
        .time_to_live(READ_CACHE_TTL)
        .build()
}

impl CacheRegistry {
    /// Create the registry with empty namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: build_cache(),
            user: build_cache(),
            products: build_cache(),
            product: build_cache(),
            searched_products: build_cache(),
            categories: build_cache(),
            category: build_cache(),
            cart_items: build_cache(),
            cart_item: build_cache(),
        }
    }

    /// Key for list namespaces (`users`, `products`).
    #[must_use]
    pub fn page_key(page: u32, size: u32) -> String {
        format!("{page}-{size}")
    }

    /// Key for the `searched-products` namespace.
    #[must_use]
    pub fn search_key(page: u32, size: u32, filters: &str) -> String {
        format!("{page}-{size}-{filters}")
    }

    /// The `users` list namespace.
    #[must_use]
    pub const fn users(&self) -> &Cache<String, Vec<UserView>> {
        &self.users
    }

    /// The `user` point namespace.
    #[must_use]
    pub const fn user(&self) -> &Cache<UserId, UserView> {
        &self.user
    }

    /// The `products` list namespace.
    #[must_use]
    pub const fn products(&self) -> &Cache<String, Vec<ProductView>> {
        &self.products
    }

    /// The `product` point namespace.
    #[must_use]
    pub const fn product(&self) -> &Cache<ProductId, ProductView> {
        &self.product
    }

    /// The `searched-products` namespace.
    #[must_use]
    pub const fn searched_products(&self) -> &Cache<String, Vec<ProductView>> {
        &self.searched_products
    }

    /// The `categories` list namespace.
    #[must_use]
    pub const fn categories(&self) -> &Cache<String, Vec<CategoryView>> {
        &self.categories
    }

    /// The `category` point namespace.
    #[must_use]
    pub const fn category(&self) -> &Cache<CategoryId, CategoryView> {
        &self.category
    }

    /// The `cart-items` namespace, keyed by the cart owner.
    #[must_use]
    pub const fn cart_items(&self) -> &Cache<UserId, Vec<CartItemView>> {
        &self.cart_items
    }

    /// The `cart-item` point namespace. Values carry the cart owner so
    /// ownership checks hold on cache hits.
    #[must_use]
    pub const fn cart_item(&self) -> &Cache<CartItemId, (CartItemView, UserId)> {
        &self.cart_item
    }

    /// Evict everything the mutation may have made stale.
    ///
    /// Runs in the same call that performed the write, before the result is
    /// returned, so no later request can read a value computed from the old
    /// rows.
    pub async fn apply(&self, mutation: Mutation) {
        match mutation {
            Mutation::UserUpdated(id) => {
                self.users.invalidate_all();
                self.user.invalidate(&id).await;
            }
            Mutation::UserDeleted(id) => {
                self.users.invalidate_all();
                self.user.invalidate(&id).await;
                self.products.invalidate_all();
                self.product.invalidate_all();
                self.searched_products.invalidate_all();
                self.cart_items.invalidate_all();
                self.cart_item.invalidate_all();
            }
            Mutation::UserCreated => {
                self.users.invalidate_all();
            }
            Mutation::CategoryAdded => {
                self.categories.invalidate_all();
            }
            Mutation::CategoryUpdated(id) => {
                self.categories.invalidate_all();
                self.category.invalidate(&id).await;
            }
            Mutation::CategoryDeleted(id) => {
                self.categories.invalidate_all();
                self.category.invalidate(&id).await;
                self.products.invalidate_all();
                self.product.invalidate_all();
                self.searched_products.invalidate_all();
            }
            Mutation::ProductAdded => {
                self.products.invalidate_all();
                self.searched_products.invalidate_all();
            }
            Mutation::ProductUpdated(id) => {
                self.products.invalidate_all();
                self.searched_products.invalidate_all();
                self.product.invalidate(&id).await;
            }
            Mutation::ProductDeleted(id) => {
                self.products.invalidate_all();
                self.searched_products.invalidate_all();
                self.product.invalidate(&id).await;
                self.cart_items.invalidate_all();
                self.cart_item.invalidate_all();
            }
            Mutation::CartItemAdded { user } => {
                self.cart_items.invalidate(&user).await;
            }
            Mutation::CartItemUpdated { user, item }
            | Mutation::CartItemDeleted { user, item } => {
                self.cart_items.invalidate(&user).await;
                self.cart_item.invalidate(&item).await;
            }
            Mutation::CartCleared { user } => {
                self.cart_items.invalidate(&user).await;
                self.cart_item.invalidate_all();
            }
            Mutation::DeletedAccountsPurged => {
                self.users.invalidate_all();
                self.user.invalidate_all();
            }
        }
        self.run_pending().await;
    }

    /// Flush pending invalidation housekeeping on every namespace.
    async fn run_pending(&self) {
        self.users.run_pending_tasks().await;
        self.user.run_pending_tasks().await;
        self.products.run_pending_tasks().await;
        self.product.run_pending_tasks().await;
        self.searched_products.run_pending_tasks().await;
        self.categories.run_pending_tasks().await;
        self.category.run_pending_tasks().await;
        self.cart_items.run_pending_tasks().await;
        self.cart_item.run_pending_tasks().await;
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::{Email, Role};
    use rust_decimal::Decimal;

    fn user_view(id: i64) -> UserView {
        UserView {
            id: UserId::new(id),
            full_name: "Test User".to_owned(),
            email: Email::parse("test@example.com").unwrap(),
            age: 30,
            role: Role::Buyer,
        }
    }

    fn product_view(id: i64) -> ProductView {
        ProductView {
            id: ProductId::new(id),
            name: "Ceramic Mug".to_owned(),
            description: "A perfectly ordinary mug".to_owned(),
            price: Decimal::new(1299, 2),
            stock_quantity: 10,
            active: true,
            category_id: CategoryId::new(1),
            seller_id: UserId::new(2),
        }
    }

    fn category_view(id: i64) -> CategoryView {
        CategoryView {
            id: CategoryId::new(id),
            name: "Kitchen".to_owned(),
        }
    }

    fn cart_item_view(id: i64) -> CartItemView {
        CartItemView {
            id: CartItemId::new(id),
            quantity: 2,
            product: product_view(1),
        }
    }

    /// Fill every namespace with one entry.
    async fn seed(registry: &CacheRegistry) {
        registry
            .users()
            .insert(CacheRegistry::page_key(0, 10), vec![user_view(1)])
            .await;
        registry.user().insert(UserId::new(1), user_view(1)).await;
        registry
            .products()
            .insert(CacheRegistry::page_key(0, 10), vec![product_view(1)])
            .await;
        registry
            .product()
            .insert(ProductId::new(1), product_view(1))
            .await;
        registry
            .searched_products()
            .insert(CacheRegistry::search_key(0, 10, "mug:::"), vec![product_view(1)])
            .await;
        registry
            .categories()
            .insert("all".to_owned(), vec![category_view(1)])
            .await;
        registry
            .category()
            .insert(CategoryId::new(1), category_view(1))
            .await;
        registry
            .cart_items()
            .insert(UserId::new(1), vec![cart_item_view(1)])
            .await;
        registry
            .cart_item()
            .insert(CartItemId::new(1), (cart_item_view(1), UserId::new(1)))
            .await;
    }

    #[tokio::test]
    async fn test_user_update_evicts_user_namespaces_only() {
        let registry = CacheRegistry::new();
        seed(&registry).await;

        registry.apply(Mutation::UserUpdated(UserId::new(1))).await;

        assert!(registry.users().get(&CacheRegistry::page_key(0, 10)).await.is_none());
        assert!(registry.user().get(&UserId::new(1)).await.is_none());
        // Unrelated namespaces are retained.
        assert!(registry.products().get(&CacheRegistry::page_key(0, 10)).await.is_some());
        assert!(registry.categories().get(&"all".to_owned()).await.is_some());
        assert!(registry.cart_items().get(&UserId::new(1)).await.is_some());
    }

    #[tokio::test]
    async fn test_user_delete_evicts_derived_namespaces() {
        let registry = CacheRegistry::new();
        seed(&registry).await;

        registry.apply(Mutation::UserDeleted(UserId::new(1))).await;

        assert!(registry.users().get(&CacheRegistry::page_key(0, 10)).await.is_none());
        assert!(registry.user().get(&UserId::new(1)).await.is_none());
        assert!(registry.products().get(&CacheRegistry::page_key(0, 10)).await.is_none());
        assert!(registry.product().get(&ProductId::new(1)).await.is_none());
        assert!(
            registry
                .searched_products()
                .get(&CacheRegistry::search_key(0, 10, "mug:::"))
                .await
                .is_none()
        );
        assert!(registry.cart_items().get(&UserId::new(1)).await.is_none());
        assert!(registry.cart_item().get(&CartItemId::new(1)).await.is_none());
        // Categories are not derived from users.
        assert!(registry.categories().get(&"all".to_owned()).await.is_some());
        assert!(registry.category().get(&CategoryId::new(1)).await.is_some());
    }

    #[tokio::test]
    async fn test_user_created_evicts_users_list_only() {
        let registry = CacheRegistry::new();
        seed(&registry).await;

        registry.apply(Mutation::UserCreated).await;

        assert!(registry.users().get(&CacheRegistry::page_key(0, 10)).await.is_none());
        assert!(registry.user().get(&UserId::new(1)).await.is_some());
    }

    #[tokio::test]
    async fn test_category_delete_reaches_product_namespaces() {
        let registry = CacheRegistry::new();
        seed(&registry).await;

        registry
            .apply(Mutation::CategoryDeleted(CategoryId::new(1)))
            .await;

        assert!(registry.categories().get(&"all".to_owned()).await.is_none());
        assert!(registry.category().get(&CategoryId::new(1)).await.is_none());
        assert!(registry.products().get(&CacheRegistry::page_key(0, 10)).await.is_none());
        assert!(registry.product().get(&ProductId::new(1)).await.is_none());
        // Cart namespaces survive a category delete.
        assert!(registry.cart_items().get(&UserId::new(1)).await.is_some());
    }

    #[tokio::test]
    async fn test_category_rename_keeps_product_namespaces() {
        let registry = CacheRegistry::new();
        seed(&registry).await;

        registry
            .apply(Mutation::CategoryUpdated(CategoryId::new(1)))
            .await;

        assert!(registry.categories().get(&"all".to_owned()).await.is_none());
        assert!(registry.category().get(&CategoryId::new(1)).await.is_none());
        assert!(registry.products().get(&CacheRegistry::page_key(0, 10)).await.is_some());
    }

    #[tokio::test]
    async fn test_product_delete_reaches_cart_namespaces() {
        let registry = CacheRegistry::new();
        seed(&registry).await;

        registry
            .apply(Mutation::ProductDeleted(ProductId::new(1)))
            .await;

        assert!(registry.products().get(&CacheRegistry::page_key(0, 10)).await.is_none());
        assert!(registry.product().get(&ProductId::new(1)).await.is_none());
        assert!(registry.cart_items().get(&UserId::new(1)).await.is_none());
        assert!(registry.cart_item().get(&CartItemId::new(1)).await.is_none());
        assert!(registry.users().get(&CacheRegistry::page_key(0, 10)).await.is_some());
    }

    #[tokio::test]
    async fn test_cart_item_update_is_scoped_to_owner() {
        let registry = CacheRegistry::new();
        seed(&registry).await;
        registry
            .cart_items()
            .insert(UserId::new(2), vec![cart_item_view(9)])
            .await;

        registry
            .apply(Mutation::CartItemUpdated {
                user: UserId::new(1),
                item: CartItemId::new(1),
            })
            .await;

        assert!(registry.cart_items().get(&UserId::new(1)).await.is_none());
        assert!(registry.cart_item().get(&CartItemId::new(1)).await.is_none());
        // Another user's cached cart is untouched.
        assert!(registry.cart_items().get(&UserId::new(2)).await.is_some());
    }

    #[tokio::test]
    async fn test_purge_drops_both_user_namespaces() {
        let registry = CacheRegistry::new();
        seed(&registry).await;

        registry.apply(Mutation::DeletedAccountsPurged).await;

        assert!(registry.users().get(&CacheRegistry::page_key(0, 10)).await.is_none());
        assert!(registry.user().get(&UserId::new(1)).await.is_none());
        assert!(registry.products().get(&CacheRegistry::page_key(0, 10)).await.is_some());
    }
}

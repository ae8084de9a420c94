//! The storefront session.
//!
//! One explicit object owns what the client remembers between runs: who is
//! logged in, their bearer token, a snapshot of each user's cart and the
//! last orders they placed. It is created from the store
//! ([`Session::restore`]), mutated through [`Session::login`] and
//! [`Session::logout`], and persists every change immediately.

use crate::{AuthError, BearerToken};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use turbo_cache::{cache_key, Cache};
use turbo_commerce::cart::LineItem;
use turbo_commerce::checkout::OrderRecord;
use turbo_commerce::events::EventBus;

const SESSION_KEY: &str = "session:current";
const GUEST: &str = "guest";

/// Number of orders kept per user.
pub const MAX_RECENT_ORDERS: usize = 20;

/// Login state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    LoggedOut { username: String },
}

/// Persisted login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub username: String,
    pub token: BearerToken,
}

/// The logged-in user, if any, and their local state.
pub struct Session {
    cache: Cache,
    current: RwLock<Option<SessionData>>,
    events: EventBus<SessionEvent>,
}

impl Session {
    /// Load the persisted login from `cache`.
    ///
    /// An expired or unreadable login is discarded.
    pub fn restore(cache: Cache) -> Result<Self, AuthError> {
        let current = match cache.get::<SessionData>(SESSION_KEY) {
            Ok(Some(data)) if data.token.is_expired() => {
                tracing::info!(username = %data.username, "stored session expired");
                cache.delete(SESSION_KEY)?;
                None
            }
            Ok(data) => data,
            Err(turbo_cache::CacheError::SerializeError(e)) => {
                tracing::warn!(error = %e, "discarding unreadable session");
                cache.delete(SESSION_KEY)?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(data) = &current {
            tracing::debug!(username = %data.username, "restored session");
        }

        Ok(Self {
            cache,
            current: RwLock::new(current),
            events: EventBus::new(),
        })
    }

    /// A logged-out session over an in-memory store.
    pub fn in_memory() -> Self {
        Self {
            cache: Cache::memory(),
            current: RwLock::new(None),
            events: EventBus::new(),
        }
    }

    /// Login and logout notifications.
    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.events
    }

    /// Record a successful login. A different user still logged in is
    /// logged out first.
    pub fn login(&self, username: &str, token: BearerToken) -> Result<(), AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidUsername(username.to_string()));
        }
        token.validate()?;

        if let Some(previous) = self.username() {
            if previous != username {
                self.logout()?;
            }
        }

        let data = SessionData {
            username: username.to_string(),
            token,
        };
        self.cache.set(SESSION_KEY, &data)?;
        *self.current.write() = Some(data);

        tracing::info!(username, "logged in");
        self.events.publish(&SessionEvent::LoggedIn {
            username: username.to_string(),
        });
        Ok(())
    }

    /// Forget the login. Returns the user that was logged out.
    pub fn logout(&self) -> Result<Option<String>, AuthError> {
        let previous = self.current.write().take();
        self.cache.delete(SESSION_KEY)?;

        let Some(data) = previous else {
            return Ok(None);
        };
        tracing::info!(username = %data.username, "logged out");
        self.events.publish(&SessionEvent::LoggedOut {
            username: data.username.clone(),
        });
        Ok(Some(data.username))
    }

    pub fn username(&self) -> Option<String> {
        self.current.read().as_ref().map(|d| d.username.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    /// The raw bearer token, if logged in and not expired.
    pub fn bearer(&self) -> Option<String> {
        self.current
            .read()
            .as_ref()
            .filter(|d| !d.token.is_expired())
            .map(|d| d.token.as_str().to_string())
    }

    /// The bearer token or [`AuthError::NotAuthenticated`].
    pub fn require_bearer(&self) -> Result<String, AuthError> {
        let current = self.current.read();
        let data = current.as_ref().ok_or(AuthError::NotAuthenticated)?;
        data.token.validate()?;
        Ok(data.token.as_str().to_string())
    }

    /// Snapshot of the current user's (or the guest's) cart.
    pub fn load_cart(&self) -> Result<Vec<LineItem>, AuthError> {
        self.load_cart_for(self.username().as_deref())
    }

    /// Snapshot of `username`'s cart; `None` is the guest.
    pub fn load_cart_for(&self, username: Option<&str>) -> Result<Vec<LineItem>, AuthError> {
        let key = cart_key(username);
        match self.cache.get::<Vec<LineItem>>(&key) {
            Ok(lines) => Ok(lines.unwrap_or_default()),
            Err(turbo_cache::CacheError::SerializeError(e)) => {
                tracing::warn!(key = %key, error = %e, "discarding unreadable cart snapshot");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the current user's cart. An empty cart removes the snapshot.
    pub fn save_cart(&self, lines: &[LineItem]) -> Result<(), AuthError> {
        self.save_cart_for(self.username().as_deref(), lines)
    }

    /// Persist `username`'s cart; `None` is the guest.
    pub fn save_cart_for(&self, username: Option<&str>, lines: &[LineItem]) -> Result<(), AuthError> {
        let key = cart_key(username);
        if lines.is_empty() {
            self.cache.delete(&key)?;
        } else {
            self.cache.set(&key, &lines)?;
        }
        Ok(())
    }

    /// Remove `username`'s cart snapshot.
    pub fn clear_cart_for(&self, username: Option<&str>) -> Result<(), AuthError> {
        self.cache.delete(&cart_key(username))?;
        Ok(())
    }

    /// Remember a placed order for the current user, newest first.
    pub fn record_order(&self, record: OrderRecord) -> Result<(), AuthError> {
        let username = self.username().ok_or(AuthError::NotAuthenticated)?;
        self.cache
            .update(&cache_key!("orders", username), |orders: Option<Vec<OrderRecord>>| {
                let mut orders = orders.unwrap_or_default();
                orders.retain(|o| o.order_id != record.order_id);
                orders.insert(0, record);
                orders.truncate(MAX_RECENT_ORDERS);
                Some(orders)
            })?;
        Ok(())
    }

    /// The current user's remembered orders, newest first.
    pub fn recent_orders(&self) -> Result<Vec<OrderRecord>, AuthError> {
        let username = self.username().ok_or(AuthError::NotAuthenticated)?;
        Ok(self
            .cache
            .get(&cache_key!("orders", username))?
            .unwrap_or_default())
    }
}

fn cart_key(username: Option<&str>) -> String {
    match username {
        Some(username) => cache_key!("cart", "user", username),
        None => cache_key!("cart", GUEST),
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username())
            .finish_non_exhaustive()
    }
}

//! Request-scoped values without global state.
//!
//! A [`Scope`] is an immutable, persistent list of `(Key, value)` bindings.
//! Every middleware layer derives a *child* scope carrying its own binding on
//! top of everything its ancestors attached:
//!
//! ```text
//! root ─▶ path ─▶ service ─▶ version        ← what the handler sees
//!          ▲
//!          └── what the path layer saw: nothing below it
//! ```
//!
//! Deriving a child never touches the parent, so layers upstream of N can
//! never observe what N attached. Bindings are shared via `Arc` and never
//! mutated after publication, so no locking is needed.
//!
//! Keys come from a closed registry returned by [`keys`]. There is no way to
//! mint a key at runtime, which rules out collisions between independently
//! written middleware.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

// ── Key ───────────────────────────────────────────────────────────────────────

/// An opaque slot identifier.
///
/// Keys compare by identity of the slot they name. [`Key::name`] and the
/// `Display` impl exist for diagnostics only.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Key(&'static str);

impl Key {
    /// The slot name, for log fields.
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// The closed registry of scope keys. Obtain it with [`keys`].
#[derive(Clone, Copy, Debug)]
pub struct Store {
    _sealed: (),
}

impl Store {
    /// Request path. See [`middleware::Path`](crate::middleware::Path).
    pub const fn path(self) -> Key {
        Key("path")
    }

    /// Service name. See [`middleware::Service`](crate::middleware::Service).
    pub const fn service(self) -> Key {
        Key("service")
    }

    /// Service version. See [`middleware::Versioning`](crate::middleware::Versioning).
    pub const fn version(self) -> Key {
        Key("version")
    }

    /// Route telemetry. See [`middleware::Telemetry`](crate::middleware::Telemetry).
    pub const fn telemetry(self) -> Key {
        Key("telemetry")
    }

    /// Server name. See [`middleware::ServerName`](crate::middleware::ServerName).
    pub const fn server(self) -> Key {
        Key("server")
    }

    /// Request deadline. See [`middleware::Timeout`](crate::middleware::Timeout).
    pub const fn timeout(self) -> Key {
        Key("timeout")
    }

    /// Service-mesh proxy metadata. See [`middleware::Envoy`](crate::middleware::Envoy).
    pub const fn envoy(self) -> Key {
        Key("envoy")
    }

    /// Span factory. See [`middleware::Tracing`](crate::middleware::Tracing).
    pub const fn tracer(self) -> Key {
        Key("tracer")
    }

    /// Shared application state. See [`middleware::State`](crate::middleware::State).
    pub const fn state(self) -> Key {
        Key("state")
    }

    /// Every registered key, in declaration order.
    pub const fn all(self) -> [Key; 9] {
        [
            self.path(),
            self.service(),
            self.version(),
            self.telemetry(),
            self.server(),
            self.timeout(),
            self.envoy(),
            self.tracer(),
            self.state(),
        ]
    }
}

/// Returns the key registry.
pub const fn keys() -> Store {
    Store { _sealed: () }
}

// ── Scope ─────────────────────────────────────────────────────────────────────

struct Node {
    key: Key,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

/// An immutable chain of keyed, request-scoped values.
///
/// Cloning is one `Arc` increment. Lookups walk from the newest binding to the
/// oldest, so a child binding shadows an ancestor's binding for the same key.
#[derive(Clone, Default)]
pub struct Scope {
    head: Option<Arc<Node>>,
}

impl Scope {
    /// An empty root scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a child scope that binds `key` to `value`. `self` is untouched.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(&self, key: Key, value: T) -> Scope {
        Scope {
            head: Some(Arc::new(Node {
                key,
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// The nearest value bound to `key`, if it has type `T`.
    pub fn get<T: Any>(&self, key: Key) -> Option<&T> {
        self.nodes()
            .find(|node| node.key == key)
            .and_then(|node| node.value.as_ref().downcast_ref::<T>())
    }

    pub fn contains(&self, key: Key) -> bool {
        self.nodes().any(|node| node.key == key)
    }

    /// Number of bindings, shadowed ones included.
    pub fn depth(&self) -> usize {
        self.nodes().count()
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.head.as_deref(), |node| node.parent.as_deref())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes().map(|node| node.key)).finish()
    }
}

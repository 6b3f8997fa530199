//! Sans-I/O HTTP caching policy engine (RFC 7234).
//!
//! This crate decides, for one request at a time, whether a cached response
//! can be served, when to revalidate with the origin and how to update the
//! cache afterwards. It never touches a socket or a store itself: the
//! [`CachingPolicy`] state machine emits [`IoAction`]s and is resumed with
//! their [`ActionResult`]s. Transports and stores live in sibling crates.
//!
//! # Features
//!
//! - **Directive parsing** - lenient `Cache-Control` parsing ([`CacheControl`])
//! - **Freshness** - `max-age`, `Expires`, `min-fresh` and permanent redirects
//! - **Revalidation** - `ETag` / `Last-Modified` conditional requests and 304 merging
//! - **Vary** - entries are only served to requests with matching headers
//! - **Heuristics** - optional expiry for responses without explicit freshness
//! - **Entry codec** - versioned MessagePack encoding ([`MsgPackCodec`])
//!
//! # Examples
//!
//! Running a policy against a handler that has nothing cached and answers
//! every request itself:
//!
//! ```
//! use httpcache_core::*;
//!
//! struct Origin;
//!
//! impl BlockingIoHandler for Origin {
//!     type Error = PolicyError;
//!
//!     fn handle(&self, action: IoAction) -> Result<ActionResult, PolicyError> {
//!         Ok(match action {
//!             IoAction::CacheGet { .. } => ActionResult::Entry(None),
//!             IoAction::MakeRequest { .. } => {
//!                 ActionResult::Response(Response::new(200).with_body("hello"))
//!             }
//!             IoAction::CacheSet { response, deferred, .. } => {
//!                 ActionResult::Stored(deferred.then_some(response))
//!             }
//!             IoAction::CacheDelete { .. } | IoAction::CloseResponseStream { .. } => {
//!                 ActionResult::Done
//!             }
//!         })
//!     }
//! }
//!
//! let request = Request::get("http://example.com/".parse().unwrap());
//! let policy = CachingPolicy::new(request, PolicyConfig::default());
//! let (response, source) = policy.run_blocking(&Origin).unwrap();
//!
//! assert_eq!(response.status, 200);
//! assert_eq!(source, Source::Server);
//! ```

pub mod actions;
pub mod body;
pub mod clock;
pub mod codec;
pub mod config;
pub mod directives;
pub mod driver;
pub mod error;
pub mod freshness;
pub mod headers;
pub mod heuristics;
pub mod models;
pub mod observer;
pub mod policy;
pub mod write;

pub use actions::{ActionResult, IoAction, Step};
pub use body::{BlockingBody, Body, BodyStream};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{CacheEntry, EntryCodec, MsgPackCodec};
pub use config::{PolicyConfig, PolicyConfigBuilder};
pub use directives::{CacheControl, CacheDirective};
pub use driver::{BlockingIoHandler, IoHandler};
pub use error::{BoxError, CodecError, PolicyError};
pub use freshness::Evaluation;
pub use headers::VaryData;
pub use heuristics::{
    ExpiresAfterHeuristic, Heuristic, LastModifiedHeuristic, OneDayCacheHeuristic,
};
pub use models::{Extensions, Request, RequestHead, Response, ResponseHead, Source};
pub use observer::{CacheEvent, CacheObserver};
pub use policy::CachingPolicy;
pub use write::{CacheWrite, cache_write_decision};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::{ActionResult, IoAction, Step};
    pub use crate::body::Body;
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::codec::{CacheEntry, EntryCodec, MsgPackCodec};
    pub use crate::config::PolicyConfig;
    pub use crate::directives::CacheControl;
    pub use crate::driver::{BlockingIoHandler, IoHandler};
    pub use crate::error::{CodecError, PolicyError};
    pub use crate::heuristics::{
        ExpiresAfterHeuristic, Heuristic, LastModifiedHeuristic, OneDayCacheHeuristic,
    };
    pub use crate::models::{Request, Response, Source};
    pub use crate::observer::CacheEvent;
    pub use crate::policy::CachingPolicy;
}

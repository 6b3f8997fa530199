//! I/O actions requested by the caching policy and their results.

use crate::body::Body;
use crate::codec::CacheEntry;
use crate::headers::VaryData;
use crate::models::{Request, Response, Source};

/// Side effect the policy needs performed before it can continue.
#[derive(Debug)]
pub enum IoAction {
    /// Load the entry stored under `key`. Answer with [`ActionResult::Entry`].
    CacheGet { key: String },

    /// Write `response` under `key`.
    ///
    /// When `deferred` is false the body is materialized and can be written
    /// right away; answer with [`ActionResult::Stored`]`(None)`. When
    /// `deferred` is true the write must wait until the body has been read
    /// to its end, and the (possibly wrapped) response must be handed back
    /// as [`ActionResult::Stored`]`(Some(..))`.
    CacheSet {
        key: String,
        response: Response,
        vary: VaryData,
        deferred: bool,
    },

    /// Remove the entry stored under `key`. Answer with [`ActionResult::Done`].
    CacheDelete { key: String },

    /// Send `request` to the origin. Answer with [`ActionResult::Response`].
    MakeRequest { request: Request },

    /// Drain and release a response body that will not be returned.
    /// Answer with [`ActionResult::Done`].
    CloseResponseStream { body: Body },
}

impl IoAction {
    pub fn name(&self) -> &'static str {
        match self {
            IoAction::CacheGet { .. } => "CacheGet",
            IoAction::CacheSet { .. } => "CacheSet",
            IoAction::CacheDelete { .. } => "CacheDelete",
            IoAction::MakeRequest { .. } => "MakeRequest",
            IoAction::CloseResponseStream { .. } => "CloseResponseStream",
        }
    }
}

/// Result of performing an [`IoAction`].
#[derive(Debug)]
pub enum ActionResult {
    /// Decoded cache entry, if one was stored.
    Entry(Option<CacheEntry>),
    /// Response from the origin.
    Response(Response),
    /// Outcome of a cache write. Deferred writes return the response.
    Stored(Option<Response>),
    /// The action completed with nothing to report.
    Done,
}

impl ActionResult {
    pub fn name(&self) -> &'static str {
        match self {
            ActionResult::Entry(_) => "Entry",
            ActionResult::Response(_) => "Response",
            ActionResult::Stored(_) => "Stored",
            ActionResult::Done => "Done",
        }
    }
}

/// What the policy wants next.
#[derive(Debug)]
pub enum Step {
    /// Perform the action and resume with its result.
    Action(IoAction),
    /// Final response and where it came from.
    Done(Response, Source),
}

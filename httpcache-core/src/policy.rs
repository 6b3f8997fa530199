//! The caching policy state machine.
//!
//! [`CachingPolicy`] performs no I/O. It emits an [`IoAction`] at every point
//! where it needs the cache or the network, and continues once it is resumed
//! with the matching [`ActionResult`]. The drivers in [`crate::driver`] run
//! the loop against blocking or async handlers.
//!
//! The decision sequence for one request:
//!
//! 1. Try the cache: skipped for non-cacheable methods and for requests with
//!    `no-cache` or `max-age=0`. A fresh entry whose Vary data matches is
//!    returned as is; a stale entry with an `ETag` becomes a revalidation
//!    candidate; a stale entry without one is deleted.
//! 2. Ask the server, with `If-None-Match` / `If-Modified-Since` when there is
//!    a candidate. Successful unsafe methods invalidate the entry.
//! 3. A `304 Not Modified` refreshes the candidate's headers and serves it
//!    from the cache. Any other response goes through
//!    [`cache_write_decision`].

use crate::actions::{ActionResult, IoAction, Step};
use crate::config::PolicyConfig;
use crate::directives::CacheControl;
use crate::error::PolicyError;
use crate::freshness::{Evaluation, evaluate};
use crate::headers::{merge_headers, vary_header_values, vary_matches};
use crate::models::{Request, Response, Source};
use crate::observer::CacheEvent;
use crate::write::{CacheWrite, cache_write_decision};
use http::header::{self, HeaderMap};
use http::Method;
use std::mem;
use tracing::{debug, trace};

/// Conditional request headers derived from the cached validators.
const VALIDATORS: [(header::HeaderName, header::HeaderName); 2] = [
    (header::ETAG, header::IF_NONE_MATCH),
    (header::LAST_MODIFIED, header::IF_MODIFIED_SINCE),
];

enum State {
    Start,
    AwaitEntry,
    AwaitPurge,
    AwaitServerResponse {
        cached: Option<Response>,
    },
    AwaitInvalidate {
        cached: Option<Response>,
        response: Response,
    },
    AwaitClose {
        cached: Option<Response>,
        response: Response,
    },
    AwaitRevalidatedWrite {
        updated: Response,
    },
    AwaitDelete {
        response: Response,
    },
    AwaitRedirectWrite {
        response: Response,
    },
    AwaitDeferredWrite,
    Finished,
}

impl State {
    fn expects(&self) -> &'static str {
        match self {
            State::Start => "start",
            State::AwaitEntry => "Entry",
            State::AwaitServerResponse { .. } => "Response",
            State::AwaitPurge
            | State::AwaitInvalidate { .. }
            | State::AwaitClose { .. }
            | State::AwaitDelete { .. } => "Done",
            State::AwaitRevalidatedWrite { .. }
            | State::AwaitRedirectWrite { .. }
            | State::AwaitDeferredWrite => "Stored",
            State::Finished => "nothing",
        }
    }
}

/// Caching decisions for a single request.
///
/// ```
/// use httpcache_core::{ActionResult, CachingPolicy, IoAction, PolicyConfig, Request, Step};
///
/// let request = Request::get("http://example.com/".parse().unwrap());
/// let mut policy = CachingPolicy::new(request, PolicyConfig::default());
///
/// let Step::Action(IoAction::CacheGet { key }) = policy.start().unwrap() else {
///     panic!("expected a cache lookup");
/// };
/// assert_eq!(key, "http://example.com/");
///
/// // Nothing cached: the policy asks for the network next.
/// let step = policy.resume(ActionResult::Entry(None)).unwrap();
/// assert!(matches!(step, Step::Action(IoAction::MakeRequest { .. })));
/// ```
pub struct CachingPolicy {
    config: PolicyConfig,
    key: String,
    method: Method,
    request_headers: HeaderMap,
    request: Option<Request>,
    state: State,
}

impl CachingPolicy {
    pub fn new(request: Request, config: PolicyConfig) -> Self {
        Self {
            key: request.cache_key(),
            method: request.method.clone(),
            request_headers: request.headers.clone(),
            request: Some(request),
            config,
            state: State::Start,
        }
    }

    /// Cache key of the request.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    /// Begin evaluation.
    pub fn start(&mut self) -> Result<Step, PolicyError> {
        match mem::replace(&mut self.state, State::Finished) {
            State::Start => self.try_from_cache(),
            _ => Err(PolicyError::Finished),
        }
    }

    /// Continue with the result of the last emitted action.
    pub fn resume(&mut self, result: ActionResult) -> Result<Step, PolicyError> {
        let state = mem::replace(&mut self.state, State::Finished);
        trace!(key = %self.key, expected = state.expects(), got = result.name(), "Resuming caching policy");

        match (state, result) {
            (State::AwaitEntry, ActionResult::Entry(entry)) => self.on_cache_entry(entry),
            (State::AwaitPurge, ActionResult::Done) => {
                self.config.notify(CacheEvent::Miss {
                    key: self.key.clone(),
                });
                self.try_from_server(None)
            }
            (State::AwaitServerResponse { cached }, ActionResult::Response(response)) => {
                self.on_server_response(cached, response)
            }
            (State::AwaitInvalidate { cached, response }, ActionResult::Done) => {
                self.after_invalidation(cached, response)
            }
            (State::AwaitClose { cached, response }, ActionResult::Done) => {
                self.on_not_modified(cached, response)
            }
            (State::AwaitRevalidatedWrite { updated }, ActionResult::Stored(_)) => {
                Ok(self.finish(updated, Source::Cache))
            }
            (State::AwaitDelete { response }, ActionResult::Done)
            | (State::AwaitRedirectWrite { response }, ActionResult::Stored(_)) => {
                Ok(self.finish(response, Source::Server))
            }
            (State::AwaitDeferredWrite, ActionResult::Stored(Some(response))) => {
                Ok(self.finish(response, Source::Server))
            }
            (State::AwaitDeferredWrite, ActionResult::Stored(None)) => {
                Err(PolicyError::MissingResponse)
            }
            (State::Start | State::Finished, _) => Err(PolicyError::Finished),
            (state, result) => Err(PolicyError::UnexpectedResult {
                expected: state.expects(),
                got: result.name(),
            }),
        }
    }

    fn action(&mut self, state: State, action: IoAction) -> Step {
        self.state = state;
        Step::Action(action)
    }

    fn finish(&mut self, response: Response, source: Source) -> Step {
        self.state = State::Finished;
        debug!(key = %self.key, status = response.status, ?source, "Caching policy finished");
        Step::Done(response, source)
    }

    fn try_from_cache(&mut self) -> Result<Step, PolicyError> {
        if !self.config.is_cacheable_method(&self.method) {
            return self.try_from_server(None);
        }

        let cc = CacheControl::from_headers(&self.request_headers);
        if cc.is_no_cache() || cc.max_age() == Some(0) {
            debug!(key = %self.key, "Request insists on fresh data, cache bypassed");
            self.config.notify(CacheEvent::Bypass {
                key: self.key.clone(),
            });
            return self.try_from_server(None);
        }

        debug!(key = %self.key, "Looking up cache entry");
        let key = self.key.clone();
        Ok(self.action(State::AwaitEntry, IoAction::CacheGet { key }))
    }

    fn on_cache_entry(
        &mut self,
        entry: Option<crate::codec::CacheEntry>,
    ) -> Result<Step, PolicyError> {
        let Some(entry) = entry else {
            debug!(key = %self.key, "No cache entry available");
            self.config.notify(CacheEvent::Miss {
                key: self.key.clone(),
            });
            return self.try_from_server(None);
        };

        if !vary_matches(&self.request_headers, &entry.vary) {
            debug!(key = %self.key, "Ignoring cache entry due to vary header mismatch");
            self.config.notify(CacheEvent::VaryMismatch {
                key: self.key.clone(),
            });
            return self.try_from_server(None);
        }

        let request_cc = CacheControl::from_headers(&self.request_headers);
        match evaluate(&request_cc, &entry.response, self.config.clock.now()) {
            Evaluation::Good => {
                self.config.notify(CacheEvent::Hit {
                    key: self.key.clone(),
                });
                Ok(self.finish(entry.response, Source::Cache))
            }
            Evaluation::Inconclusive => {
                debug!(key = %self.key, "Cached response needs revalidation");
                self.try_from_server(Some(entry.response))
            }
            Evaluation::Purge => {
                debug!(key = %self.key, "Purging unusable cache entry");
                self.config.notify(CacheEvent::Purged {
                    key: self.key.clone(),
                });
                let key = self.key.clone();
                Ok(self.action(State::AwaitPurge, IoAction::CacheDelete { key }))
            }
        }
    }

    fn try_from_server(&mut self, cached: Option<Response>) -> Result<Step, PolicyError> {
        let mut request = self.request.take().ok_or(PolicyError::Finished)?;

        if let Some(cached) = &cached {
            for (validator, conditional) in VALIDATORS {
                if let Some(value) = cached.headers.get(&validator) {
                    request.headers.insert(conditional, value.clone());
                }
            }
        }

        debug!(
            key = %self.key,
            method = %request.method,
            conditional = cached.is_some(),
            "Sending request to server"
        );
        Ok(self.action(
            State::AwaitServerResponse { cached },
            IoAction::MakeRequest { request },
        ))
    }

    fn on_server_response(
        &mut self,
        cached: Option<Response>,
        response: Response,
    ) -> Result<Step, PolicyError> {
        if PolicyConfig::is_invalidating_method(&self.method) && !response.is_error() {
            debug!(key = %self.key, method = %self.method, "Invalidating cache entry");
            self.config.notify(CacheEvent::Invalidated {
                key: self.key.clone(),
            });
            let key = self.key.clone();
            return Ok(self.action(
                State::AwaitInvalidate { cached, response },
                IoAction::CacheDelete { key },
            ));
        }

        self.after_invalidation(cached, response)
    }

    fn after_invalidation(
        &mut self,
        cached: Option<Response>,
        mut response: Response,
    ) -> Result<Step, PolicyError> {
        if !self.config.is_cacheable_method(&self.method) {
            return Ok(self.finish(response, Source::Server));
        }

        if let Some(heuristic) = &self.config.heuristic {
            heuristic.apply(
                &mut response.headers,
                response.status,
                self.config.clock.now(),
            );
        }

        if response.status == 304 {
            let body = mem::take(&mut response.body);
            return Ok(self.action(
                State::AwaitClose { cached, response },
                IoAction::CloseResponseStream { body },
            ));
        }

        let decision = cache_write_decision(
            &self.request_headers,
            &response,
            cached.is_some(),
            &self.config,
        );
        let key = self.key.clone();

        match decision {
            None => Ok(self.finish(response, Source::Server)),
            Some(CacheWrite::Delete) => {
                debug!(key = %self.key, "Purging cache entry to honor no-store");
                self.config.notify(CacheEvent::Purged {
                    key: self.key.clone(),
                });
                Ok(self.action(State::AwaitDelete { response }, IoAction::CacheDelete { key }))
            }
            Some(CacheWrite::StoreRedirect { vary }) => {
                let mut redirect = Response::from_parts(response.head(), Default::default());
                redirect.ext.set_real_request(None);
                self.config.notify(CacheEvent::Stored {
                    key: self.key.clone(),
                    deferred: false,
                });
                Ok(self.action(
                    State::AwaitRedirectWrite { response },
                    IoAction::CacheSet {
                        key,
                        response: redirect,
                        vary,
                        deferred: false,
                    },
                ))
            }
            Some(CacheWrite::Store { vary }) => {
                self.config.notify(CacheEvent::Stored {
                    key: self.key.clone(),
                    deferred: true,
                });
                Ok(self.action(
                    State::AwaitDeferredWrite,
                    IoAction::CacheSet {
                        key,
                        response,
                        vary,
                        deferred: true,
                    },
                ))
            }
        }
    }

    fn on_not_modified(
        &mut self,
        cached: Option<Response>,
        response: Response,
    ) -> Result<Step, PolicyError> {
        let Some(mut updated) = cached else {
            return Ok(self.finish(response, Source::Server));
        };

        merge_headers(
            &mut updated.headers,
            &response.headers,
            &[header::CONTENT_LENGTH],
        );
        updated.status = 200;
        updated
            .ext
            .set_real_request(response.ext.real_request().cloned());

        let vary = vary_header_values(&self.request_headers, &updated.headers);
        let stored = updated.try_clone().ok_or(PolicyError::NotMaterialized)?;

        debug!(key = %self.key, "Cached response revalidated");
        self.config.notify(CacheEvent::Revalidated {
            key: self.key.clone(),
        });

        let key = self.key.clone();
        Ok(self.action(
            State::AwaitRevalidatedWrite { updated },
            IoAction::CacheSet {
                key,
                response: stored,
                vary,
                deferred: false,
            },
        ))
    }
}

//! Drivers that run a [`CachingPolicy`] against an I/O handler.

use crate::actions::{ActionResult, IoAction, Step};
use crate::error::PolicyError;
use crate::models::{Response, Source};
use crate::policy::CachingPolicy;
use async_trait::async_trait;

/// Performs policy actions synchronously.
pub trait BlockingIoHandler {
    type Error: From<PolicyError>;

    fn handle(&self, action: IoAction) -> Result<ActionResult, Self::Error>;
}

/// Performs policy actions asynchronously.
#[async_trait]
pub trait IoHandler: Send + Sync {
    type Error: From<PolicyError> + Send;

    async fn handle(&self, action: IoAction) -> Result<ActionResult, Self::Error>;
}

impl CachingPolicy {
    /// Run the policy to completion on the current thread.
    pub fn run_blocking<H>(mut self, handler: &H) -> Result<(Response, Source), H::Error>
    where
        H: BlockingIoHandler + ?Sized,
    {
        let mut step = self.start()?;
        loop {
            match step {
                Step::Done(response, source) => return Ok((response, source)),
                Step::Action(action) => {
                    let result = handler.handle(action)?;
                    step = self.resume(result)?;
                }
            }
        }
    }

    /// Run the policy to completion.
    pub async fn run<H>(mut self, handler: &H) -> Result<(Response, Source), H::Error>
    where
        H: IoHandler + ?Sized,
    {
        let mut step = self.start()?;
        loop {
            match step {
                Step::Done(response, source) => return Ok((response, source)),
                Step::Action(action) => {
                    let result = handler.handle(action).await?;
                    step = self.resume(result)?;
                }
            }
        }
    }
}

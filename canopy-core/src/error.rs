/*
 * Copyright (c) 2025. Canopy Contributors
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Error taxonomy for the framework.
//!
//! Errors are values, not panics: they travel inside response messages and
//! shutdown reasons, forming a causality chain (`ExtendedError`). Handlers
//! never throw across dispatch boundaries; a component that cannot proceed
//! records an error into the actor's shutdown reason and triggers shutdown.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Operational error codes carried by responses and escalations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    /// The operation completed.
    #[error("success")]
    Success,
    /// The request has been abandoned by the caller.
    #[error("request has been cancelled")]
    Cancelled,
    /// The request timer fired before a response arrived.
    #[error("request timeout")]
    RequestTimeout,
    /// An attempt was made to re-assign an actor's supervisor.
    #[error("supervisor is already defined")]
    SupervisorDefined,
    /// A service name collision.
    #[error("service name is already registered")]
    AlreadyRegistered,
    /// The actor's configuration is not usable.
    #[error("actor is misconfigured")]
    ActorMisconfigured,
    /// The actor does not accept links.
    #[error("actor is not linkeable")]
    ActorNotLinkable,
    /// The link already exists.
    #[error("already linked")]
    AlreadyLinked,
    /// A child's error bubbled up as the parent's init failure.
    #[error("failure escalation (child actor died)")]
    FailureEscalation,
    /// The requested service name is not registered.
    #[error("the requested service name is not registered")]
    UnknownService,
}

/// Why a shutdown happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ShutdownCode {
    /// Regular, requested shutdown.
    #[error("normal shutdown")]
    Normal,
    /// The actor's own initialization failed.
    #[error("actor initialization failed")]
    InitFailed,
    /// A child actor failed to initialize.
    #[error("child actor initialization failed")]
    ChildInitFailed,
    /// The owning supervisor is shutting down.
    #[error("supervisor is shutting down")]
    SupervisorShutdown,
    /// An unlink was requested.
    #[error("unlink has been requested")]
    UnlinkRequested,
}

/// Either side of the taxonomy, so one chain can mix operational errors and
/// shutdown reasons (e.g. `ChildInitFailed` caused by `RequestTimeout`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Code {
    #[error(transparent)]
    Error(ErrorCode),
    #[error(transparent)]
    Shutdown(ShutdownCode),
}

impl From<ErrorCode> for Code {
    fn from(code: ErrorCode) -> Self {
        Code::Error(code)
    }
}

impl From<ShutdownCode> for Code {
    fn from(code: ShutdownCode) -> Self {
        Code::Shutdown(code)
    }
}

/// An error code plus an optional cause chain.
///
/// The chain preserves causality across escalation: a supervisor failing init
/// because a child timed out carries `FailureEscalation` caused by
/// `RequestTimeout`. Cheap to clone; links are shared.
#[derive(Debug, Clone)]
pub struct ExtendedError {
    code: Code,
    cause: Option<Arc<ExtendedError>>,
}

impl ExtendedError {
    /// Wraps a bare code.
    pub fn new(code: impl Into<Code>) -> Self {
        Self {
            code: code.into(),
            cause: None,
        }
    }

    /// Wraps a code over the error that caused it.
    pub fn with_cause(code: impl Into<Code>, cause: ExtendedError) -> Self {
        Self {
            code: code.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// The outermost code of the chain.
    pub fn code(&self) -> Code {
        self.code
    }

    /// The immediate cause, if any.
    pub fn cause(&self) -> Option<&ExtendedError> {
        self.cause.as_deref()
    }

    /// The innermost error of the chain.
    pub fn root_cause(&self) -> &ExtendedError {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }

    /// True if any link of the chain carries `code`.
    pub fn contains(&self, code: impl Into<Code>) -> bool {
        let code = code.into();
        let mut current = Some(self);
        while let Some(err) = current {
            if err.code == code {
                return true;
            }
            current = err.cause.as_deref();
        }
        false
    }
}

impl fmt::Display for ExtendedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        let mut current = self.cause.as_deref();
        while let Some(err) = current {
            write!(f, " <- {}", err.code)?;
            current = err.cause.as_deref();
        }
        Ok(())
    }
}

impl std::error::Error for ExtendedError {}

impl From<ErrorCode> for ExtendedError {
    fn from(code: ErrorCode) -> Self {
        ExtendedError::new(code)
    }
}

impl From<ShutdownCode> for ExtendedError {
    fn from(code: ShutdownCode) -> Self {
        ExtendedError::new(code)
    }
}

/// Represents errors that can occur when enqueueing messages.
#[derive(Debug)]
pub enum MessageError {
    /// The target mailbox rejected the message.
    SendFailed(String),
    /// The target address no longer refers to a live supervisor.
    DeadAddress,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::SendFailed(msg) => write!(f, "Failed to send message: {}", msg),
            MessageError::DeadAddress => write!(f, "Address does not refer to a live supervisor"),
        }
    }
}

impl std::error::Error for MessageError {}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for MessageError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        MessageError::SendFailed("Channel closed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_display_preserves_causality() {
        let inner = ExtendedError::new(ErrorCode::RequestTimeout);
        let outer = ExtendedError::with_cause(ShutdownCode::ChildInitFailed, inner);
        assert_eq!(
            outer.to_string(),
            "child actor initialization failed <- request timeout"
        );
        assert!(outer.contains(ErrorCode::RequestTimeout));
        assert!(!outer.contains(ErrorCode::Cancelled));
        assert_eq!(
            outer.root_cause().code(),
            Code::Error(ErrorCode::RequestTimeout)
        );
    }
}

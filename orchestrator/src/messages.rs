//! The orchestrator's message enum: one variant per request the task
//! loop can receive.

use shared::deps::{Location, SubId};
use shared::{RegistrationCode, ResultCode};
use tokio::sync::oneshot;

use crate::subscribers::{NotifySink, SubscriberHandle};

/// Reply to a `Check` message, mirroring `request_is_allowed`'s public
/// `{code, allowed?}` shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckReply {
    pub code: ResultCode,
    pub allowed: Option<bool>,
}

impl CheckReply {
    pub fn ok(allowed: bool) -> Self {
        CheckReply {
            code: ResultCode::Ok,
            allowed: Some(allowed),
        }
    }

    pub fn forwarded(code: ResultCode) -> Self {
        CheckReply {
            code,
            allowed: Some(false),
        }
    }

    pub fn location_not_available() -> Self {
        CheckReply {
            code: ResultCode::LocationNotAvailable,
            allowed: Some(false),
        }
    }
}

pub enum OrchestratorMessage {
    Check {
        sub_id: SubId,
        reply: oneshot::Sender<CheckReply>,
    },
    LocationArrived(Option<Location>),
    LocationTimeout,
    OnDeviceResourceIdleTimeout,
    ConfigUpdated,
    RegisterSubscriber {
        sub_id: SubId,
        sink: Box<dyn NotifySink>,
        reply: oneshot::Sender<(RegistrationCode, Option<SubscriberHandle>)>,
    },
    UnregisterSubscriber {
        handle: SubscriberHandle,
    },
    Shutdown,
}

impl std::fmt::Debug for OrchestratorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorMessage::Check { sub_id, .. } => {
                f.debug_struct("Check").field("sub_id", sub_id).finish()
            }
            OrchestratorMessage::LocationArrived(loc) => {
                f.debug_tuple("LocationArrived").field(loc).finish()
            }
            OrchestratorMessage::LocationTimeout => write!(f, "LocationTimeout"),
            OrchestratorMessage::OnDeviceResourceIdleTimeout => {
                write!(f, "OnDeviceResourceIdleTimeout")
            }
            OrchestratorMessage::ConfigUpdated => write!(f, "ConfigUpdated"),
            OrchestratorMessage::RegisterSubscriber { sub_id, .. } => f
                .debug_struct("RegisterSubscriber")
                .field("sub_id", sub_id)
                .finish(),
            OrchestratorMessage::UnregisterSubscriber { handle } => f
                .debug_struct("UnregisterSubscriber")
                .field("handle", handle)
                .finish(),
            OrchestratorMessage::Shutdown => write!(f, "Shutdown"),
        }
    }
}

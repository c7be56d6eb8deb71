//! Server lifecycle state machine
//!
//! `NotStarted → Starting → Handshaking → PostHandshake → Ready → ShuttingDown → Stopped`,
//! with `Failed` reachable from every state except `Stopped`. Transitions only move
//! forward; `reset` is the single way back and requires a terminal state.

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;

use crate::error::LspError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    NotStarted,
    Starting,
    Handshaking,
    PostHandshake,
    Ready,
    ShuttingDown,
    Stopped,
    Failed,
}

impl ServerState {
    fn rank(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Starting => 1,
            Self::Handshaking => 2,
            Self::PostHandshake => 3,
            Self::Ready => 4,
            Self::ShuttingDown => 5,
            Self::Stopped => 6,
            Self::Failed => 7,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    pub fn can_transition_to(self, next: ServerState) -> bool {
        match (self, next) {
            (Self::Stopped, _) | (Self::Failed, _) => false,
            (_, Self::Failed) => true,
            // Shutdown may begin from any live state
            (from, Self::ShuttingDown) => from != Self::ShuttingDown,
            (from, to) => to.rank() > from.rank(),
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Handshaking => "handshaking",
            Self::PostHandshake => "post_handshake",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Observable lifecycle; one watch channel carries every transition
#[derive(Debug)]
pub struct StateMachine {
    name: String,
    tx: watch::Sender<ServerState>,
}

impl StateMachine {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(ServerState::NotStarted);
        Self {
            name: name.into(),
            tx,
        }
    }

    pub fn current(&self) -> ServerState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }

    /// Move forward to `next`; rejected transitions leave the state untouched
    pub fn transition(&self, next: ServerState) -> Result<ServerState, LspError> {
        let mut previous = self.current();
        let applied = self.tx.send_if_modified(|state| {
            previous = *state;
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });

        if applied {
            tracing::info!("{}: {} -> {}", self.name, previous, next);
            Ok(previous)
        } else {
            Err(LspError::InvalidTransition {
                from: previous,
                to: next,
            })
        }
    }

    /// Mark failure unless already terminal; returns whether the state changed
    pub fn fail(&self, reason: &str) -> bool {
        match self.transition(ServerState::Failed) {
            Ok(previous) => {
                tracing::error!("{} failed in state {}: {}", self.name, previous, reason);
                true
            }
            Err(_) => false,
        }
    }

    /// Return to `NotStarted`; only allowed from `Stopped` or `Failed`
    pub fn reset(&self) -> Result<(), LspError> {
        let mut previous = self.current();
        let applied = self.tx.send_if_modified(|state| {
            previous = *state;
            if state.is_terminal() {
                *state = ServerState::NotStarted;
                true
            } else {
                false
            }
        });
        if applied {
            tracing::info!("{}: reset from {}", self.name, previous);
            Ok(())
        } else {
            Err(LspError::InvalidTransition {
                from: previous,
                to: ServerState::NotStarted,
            })
        }
    }

    /// Wait until the state satisfies `predicate`
    pub async fn wait_for<F>(&self, predicate: F) -> ServerState
    where
        F: Fn(ServerState) -> bool,
    {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| predicate(*s)).await {
            Ok(state) => *state,
            // Sender lives as long as self, so this only happens on teardown
            Err(_) => self.current(),
        }
    }
}

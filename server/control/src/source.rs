use std::{collections::VecDeque, time::Duration};

use tokio::sync::mpsc;

use crate::events::VoiceStateChange;

/// Where the controller's run loop pulls voice-state-change notifications from.
#[async_trait::async_trait]
pub trait VoiceEventSource: Send {
    /// Next notification, or `None` once the source is closed.
    async fn next_event(&mut self) -> Option<VoiceStateChange>;
}

/// Production path: the platform's event handler pushes into the sender half.
#[async_trait::async_trait]
impl VoiceEventSource for mpsc::Receiver<VoiceStateChange> {
    async fn next_event(&mut self) -> Option<VoiceStateChange> {
        self.recv().await
    }
}

/// Replays a fixed sequence of events, each after a delay relative to the previous one.
#[derive(Default)]
pub struct ScriptedSource {
    script: VecDeque<(Duration, VoiceStateChange)>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, delay: Duration, ev: VoiceStateChange) -> Self {
        self.script.push_back((delay, ev));
        self
    }
}

#[async_trait::async_trait]
impl VoiceEventSource for ScriptedSource {
    async fn next_event(&mut self) -> Option<VoiceStateChange> {
        let (delay, ev) = self.script.pop_front()?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Some(ev)
    }
}

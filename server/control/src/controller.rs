//! Join-triggered resync of the operator's voice connection.
//!
//! When someone enters the operator's voice channel, the operator is moved to
//! the guild's resync channel and, after a short pause, back again. Cycles are
//! serialized by a lock and spaced by a cooldown. The cooldown deadline is read
//! unlocked as a fast path and re-checked under the lock before it is committed.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::Mutex,
    task::JoinSet,
    time::{sleep, Instant},
};
use tracing::{debug, error, info, warn};

use crate::{
    config::ResyncConfig,
    errors::PlatformError,
    events::{ChannelRef, MemberPresence, VoiceStateChange},
    platform::{resolve_member, GuildDirectory, VoiceMover},
    source::VoiceEventSource,
    GuildId,
};

/// Why an event did not lead to a resync attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Skip {
    OwnEvent,
    Bot,
    Operator,
    NoChannel,
    OperatorUnavailable,
    NotAJoin,
}

/// Step of a cycle that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    ResolveResyncChannel,
    MoveAway,
    /// The operator is left in the resync channel.
    MoveBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ignored(Skip),
    CoolingDown,
    /// Cooldown consumed, nothing moved.
    NoResyncChannel,
    Resynced,
    Failed(Stage),
}

/// Totals reported by [`ResyncController::run`] once its source is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub events: usize,
    pub resynced: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl RunStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Resynced => self.resynced += 1,
            Outcome::Failed(_) => self.failed += 1,
            _ => {}
        }
    }
}

pub struct ResyncController {
    cfg: ResyncConfig,
    directory: Arc<dyn GuildDirectory>,
    mover: Arc<dyn VoiceMover>,

    /// Origin for `cooldown_until`.
    epoch: Instant,
    /// Nanoseconds since `epoch` before which no cycle may start. Only grows.
    cooldown_until: AtomicU64,
    /// Held for the whole check-commit-move sequence.
    cycle: Mutex<()>,
}

impl ResyncController {
    pub fn new(
        cfg: ResyncConfig,
        directory: Arc<dyn GuildDirectory>,
        mover: Arc<dyn VoiceMover>,
    ) -> Self {
        Self {
            cfg,
            directory,
            mover,
            epoch: Instant::now(),
            cooldown_until: AtomicU64::new(0),
            cycle: Mutex::new(()),
        }
    }

    /// Earliest instant at which a new cycle may start, if a cycle ever started.
    pub fn cooldown_deadline(&self) -> Option<Instant> {
        match self.cooldown_until.load(Ordering::Acquire) {
            0 => None,
            n => Some(self.epoch + Duration::from_nanos(n)),
        }
    }

    fn now_offset(&self) -> u64 {
        nanos(self.epoch.elapsed())
    }

    fn cooling_down(&self, now: u64) -> bool {
        now < self.cooldown_until.load(Ordering::Acquire)
    }

    /// Process one voice-state-change notification. Never fails: every error is
    /// logged and reported through the returned [`Outcome`].
    pub async fn handle(&self, ev: VoiceStateChange) -> Outcome {
        let member = &ev.member;

        if self.directory.current_user() == Some(member.id) {
            debug!(member = %member.id, "ignoring own voice event");
            return Outcome::Ignored(Skip::OwnEvent);
        }
        if member.bot {
            debug!(member = %member.id, "ignoring bot voice event");
            return Outcome::Ignored(Skip::Bot);
        }
        if member.id == self.cfg.operator {
            debug!(member = %member.id, "ignoring operator voice event");
            return Outcome::Ignored(Skip::Operator);
        }

        let Some(context) = ev.context_channel() else {
            debug!(member = %member.id, "voice event carries no channel");
            return Outcome::Ignored(Skip::NoChannel);
        };
        let guild = context.guild_id;

        debug!(
            member = %member.display_name,
            before = ?ev.before.as_ref().map(|c| c.name.as_str()),
            after = ?ev.after.as_ref().map(|c| c.name.as_str()),
            "voice event"
        );

        let operator = match resolve_member(&*self.directory, guild, self.cfg.operator).await {
            Some(p) => p,
            None => {
                debug!(guild = %guild, operator = %self.cfg.operator, "operator not found");
                return Outcome::Ignored(Skip::OperatorUnavailable);
            }
        };
        let Some(home) = operator.voice_channel.clone() else {
            debug!(guild = %guild, operator = %self.cfg.operator, "operator not in voice");
            return Outcome::Ignored(Skip::OperatorUnavailable);
        };

        if !ev.is_join_of(home.id) {
            debug!(
                member = %member.display_name,
                channel = %home,
                "not a join of the operator's channel"
            );
            return Outcome::Ignored(Skip::NotAJoin);
        }

        if self.cooling_down(self.now_offset()) {
            debug!("cooldown active");
            return Outcome::CoolingDown;
        }

        let _guard = self.cycle.lock().await;

        let now = self.now_offset();
        if self.cooling_down(now) {
            debug!("cooldown active after lock");
            return Outcome::CoolingDown;
        }
        self.cooldown_until
            .fetch_max(now.saturating_add(nanos(self.cfg.cooldown)), Ordering::AcqRel);

        info!(
            member = %member.display_name,
            channel = %home,
            "participant joined operator's channel"
        );
        self.cycle_locked(guild, &operator, &home).await
    }

    async fn cycle_locked(
        &self,
        guild: GuildId,
        operator: &MemberPresence,
        home: &ChannelRef,
    ) -> Outcome {
        let resync = match self.directory.resync_channel(guild).await {
            Ok(Some(ch)) => ch,
            Ok(None) => {
                warn!(guild = %guild, "no resync channel configured, skipping");
                return Outcome::NoResyncChannel;
            }
            Err(e) => {
                warn!(guild = %guild, "resync channel lookup failed: {e}");
                return Outcome::Failed(Stage::ResolveResyncChannel);
            }
        };

        let reason = self.cfg.reason.as_str();

        info!(
            operator = %operator.display_name,
            from = %home,
            to = %resync,
            "moving operator to resync channel"
        );
        if let Err(e) = self.mover.move_member(guild, operator.user_id, resync.id, reason).await {
            report_move_error(&e);
            return Outcome::Failed(Stage::MoveAway);
        }

        sleep(self.cfg.pause).await;

        if let Err(e) = self.mover.move_member(guild, operator.user_id, home.id, reason).await {
            report_move_error(&e);
            error!(
                operator = %operator.display_name,
                stranded_in = %resync,
                home = %home,
                "operator left in resync channel"
            );
            return Outcome::Failed(Stage::MoveBack);
        }

        info!(operator = %operator.display_name, channel = %home, "resync done");
        Outcome::Resynced
    }

    /// Drain `source`, handling each event on its own task so a cycle's pause
    /// does not hold up later events. Returns once the source is exhausted and
    /// every handler has finished.
    pub async fn run<S: VoiceEventSource>(self: Arc<Self>, mut source: S) -> RunStats {
        let mut stats = RunStats::default();
        let mut tasks = JoinSet::new();

        info!(operator = %self.cfg.operator, "resync controller started");

        while let Some(ev) = source.next_event().await {
            while let Some(done) = tasks.try_join_next() {
                reap(&mut stats, done);
            }
            stats.events += 1;
            let ctrl = Arc::clone(&self);
            tasks.spawn(async move { ctrl.handle(ev).await });
        }

        while let Some(done) = tasks.join_next().await {
            reap(&mut stats, done);
        }

        info!(events = stats.events, resynced = stats.resynced, "event source closed");
        stats
    }
}

fn reap(stats: &mut RunStats, done: Result<Outcome, tokio::task::JoinError>) {
    match done {
        Ok(outcome) => stats.record(outcome),
        Err(e) => {
            stats.panicked += 1;
            error!("voice event handler aborted: {e}");
        }
    }
}

fn report_move_error(e: &PlatformError) {
    match e {
        PlatformError::PermissionDenied(msg) => {
            warn!("move forbidden, missing Move Members or role hierarchy issue: {msg}")
        }
        other => warn!("move error: {other}"),
    }
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

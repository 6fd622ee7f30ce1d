use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time::Instant};
use vr_control::{
    ChannelId, GuildId, InMemoryPlatform, ResyncConfig, ResyncController, RunStats, ScriptedSource,
    UserId, VoiceMember, VoiceStateChange,
};

const GUILD: GuildId = GuildId(7);
const OPERATOR: UserId = UserId(1000);
const A: ChannelId = ChannelId(1);
const R: ChannelId = ChannelId(2);

fn platform() -> InMemoryPlatform {
    let p = InMemoryPlatform::new();
    p.set_current_user(UserId(1));
    p.add_channel(GUILD, A, "lounge");
    p.add_channel(GUILD, R, "afk");
    p.set_resync_channel(GUILD, Some(R));
    p.add_member(GUILD, OPERATOR, "operator", true);
    p.set_voice(GUILD, OPERATOR, Some(A));
    p
}

fn controller(p: &InMemoryPlatform) -> Arc<ResyncController> {
    let mut cfg = ResyncConfig::new(OPERATOR);
    cfg.cooldown = Duration::from_secs(12);
    cfg.pause = Duration::from_millis(600);
    Arc::new(ResyncController::new(cfg, Arc::new(p.clone()), Arc::new(p.clone())))
}

fn joins(p: &InMemoryPlatform, user: u64) -> VoiceStateChange {
    VoiceStateChange {
        member: VoiceMember {
            id: UserId(user),
            display_name: format!("p{user}"),
            bot: false,
        },
        before: None,
        after: p.channel(A),
    }
}

#[tokio::test(start_paused = true)]
async fn joins_at_zero_five_and_thirteen_seconds() {
    let p = platform();
    let ctrl = controller(&p);
    let t0 = Instant::now();

    let source = ScriptedSource::new()
        .then(Duration::ZERO, joins(&p, 11))
        .then(Duration::from_secs(5), joins(&p, 12))
        .then(Duration::from_secs(8), joins(&p, 13));

    let stats = ctrl.run(source).await;

    assert_eq!(stats, RunStats { events: 3, resynced: 2, failed: 0, panicked: 0 });

    let moves = p.moves();
    let timeline: Vec<(Duration, ChannelId)> =
        moves.iter().map(|m| (m.at - t0, m.channel)).collect();
    assert_eq!(
        timeline,
        vec![
            (Duration::ZERO, R),
            (Duration::from_millis(600), A),
            (Duration::from_secs(13), R),
            (Duration::from_millis(13_600), A),
        ]
    );
    assert_eq!(p.voice_channel(GUILD, OPERATOR), Some(A));
}

#[tokio::test(start_paused = true)]
async fn burst_of_joins_over_channel_yields_one_cycle() {
    let p = platform();
    let ctrl = controller(&p);
    let (tx, rx) = mpsc::channel(16);

    for user in 20..25 {
        tx.send(joins(&p, user)).await.unwrap();
    }
    drop(tx);

    let stats = ctrl.run(rx).await;

    assert_eq!(stats.events, 5);
    assert_eq!(stats.resynced, 1);
    assert_eq!(p.moves().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn join_during_pause_is_rejected() {
    let p = platform();
    let ctrl = controller(&p);

    let source = ScriptedSource::new()
        .then(Duration::ZERO, joins(&p, 11))
        .then(Duration::from_millis(300), joins(&p, 12));

    let stats = ctrl.run(source).await;

    assert_eq!(stats.resynced, 1);
    assert_eq!(p.moves().len(), 2);
}

//! End-to-end tests of the program scheduler against an in-memory SQLite
//! library with migrations applied.

use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{ActiveValue::Set, EntityTrait};
use std::sync::Arc;
use uuid::Uuid;

use tvloop::{
    config::Config,
    database::{
        Database,
        repositories::{
            ChannelSeaOrmRepository, GUIDE_DAYS_KEY, ProgramSeaOrmRepository,
            SettingsSeaOrmRepository,
        },
    },
    entities::{movies, prelude::Movies},
    models::{ContentRef, NewProgram, Program},
    schedule::{find_gaps, find_overlaps},
    services::{LockOutcome, ProgramScheduler},
    utils::{Clock, ManualClock},
};

const MINUTE_MS: i64 = 60_000;

struct Fixture {
    db: Database,
    clock: ManualClock,
    scheduler: Arc<ProgramScheduler>,
    channels: ChannelSeaOrmRepository,
    programs: ProgramSeaOrmRepository,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn minutes(n: i64) -> Duration {
    Duration::minutes(n)
}

async fn setup() -> Fixture {
    let db = Database::in_memory().await.unwrap();
    // Sub-second "now" to exercise start truncation
    let clock = ManualClock::new(t0() + Duration::milliseconds(400));
    let config = Config::default();
    let scheduler =
        ProgramScheduler::from_database(&db, &config, Arc::new(clock.clone())).unwrap();

    Fixture {
        channels: ChannelSeaOrmRepository::new(db.connection()),
        programs: ProgramSeaOrmRepository::new(db.connection(), config.database.insert_batch_size),
        scheduler: Arc::new(scheduler),
        clock,
        db,
    }
}

impl Fixture {
    async fn add_movie(&self, channel_id: Uuid, order: i32, duration_ms: Option<i64>) -> Uuid {
        let movie_id = Uuid::new_v4();
        Movies::insert(movies::ActiveModel {
            id: Set(movie_id),
            title: Set(format!("Movie {order}")),
            duration_ms: Set(duration_ms),
        })
        .exec_without_returning(&*self.db.connection())
        .await
        .unwrap();
        self.channels
            .attach_movie(channel_id, movie_id, order)
            .await
            .unwrap();
        movie_id
    }

    /// Channel with movie A (30 min) then movie B (45 min)
    async fn a30_b45_channel(&self) -> (Uuid, Uuid, Uuid) {
        let channel = self.channels.create("Movies", Some(1)).await.unwrap();
        let a = self.add_movie(channel.id, 0, Some(30 * MINUTE_MS)).await;
        let b = self.add_movie(channel.id, 1, Some(45 * MINUTE_MS)).await;
        (channel.id, a, b)
    }

    async fn stored(&self, channel_id: Uuid) -> Vec<Program> {
        self.programs.find_by_channel(channel_id).await.unwrap()
    }

    async fn future_gaps(&self, channel_id: Uuid) -> usize {
        let now = self.clock_now();
        find_gaps(&self.stored(channel_id).await, 1_000)
            .into_iter()
            .filter(|gap| gap.end > now)
            .count()
    }

    fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[tokio::test]
async fn test_generation_cycles_lineup_from_truncated_now() {
    let fx = setup().await;
    let (channel_id, a, b) = fx.a30_b45_channel().await;

    let outcome = fx
        .scheduler
        .generate_for_channel(channel_id, Some(2))
        .await
        .unwrap()
        .into_ran()
        .unwrap();

    assert_eq!(outcome.start_time, Some(t0()));
    assert_eq!(outcome.end_time, Some(t0() + minutes(150)));
    assert_eq!(outcome.inserted, 4);
    assert!(!outcome.truncated);
    assert!(outcome.preserved_program.is_none());

    let stored = fx.stored(channel_id).await;
    let layout: Vec<_> = stored.iter().map(|p| (p.start_time, p.content)).collect();
    assert_eq!(
        layout,
        vec![
            (t0(), ContentRef::Movie(a)),
            (t0() + minutes(30), ContentRef::Movie(b)),
            (t0() + minutes(75), ContentRef::Movie(a)),
            (t0() + minutes(105), ContentRef::Movie(b)),
        ]
    );
}

#[tokio::test]
async fn test_regeneration_keeps_airing_program() {
    let fx = setup().await;
    let (channel_id, _, _) = fx.a30_b45_channel().await;

    fx.scheduler
        .generate_for_channel(channel_id, Some(2))
        .await
        .unwrap();
    let airing = fx.stored(channel_id).await[0].clone();

    // Ten minutes into the first program a third movie is added
    fx.clock.advance(minutes(10));
    let c = fx.add_movie(channel_id, 2, Some(20 * MINUTE_MS)).await;

    let outcome = fx
        .scheduler
        .generate_for_channel(channel_id, Some(2))
        .await
        .unwrap()
        .into_ran()
        .unwrap();

    assert_eq!(outcome.preserved_program, Some(airing.id));
    assert_eq!(outcome.start_time, Some(airing.end_time()));
    assert_eq!(outcome.deleted, 3);

    let stored = fx.stored(channel_id).await;
    assert_eq!(stored[0], airing);
    assert_eq!(stored[1].start_time, t0() + minutes(30));
    assert!(stored.iter().any(|p| p.content == ContentRef::Movie(c)));
    assert!(find_overlaps(&stored).is_empty());
    assert_eq!(fx.future_gaps(channel_id).await, 0);
}

#[tokio::test]
async fn test_concurrent_generation_runs_once() {
    let fx = setup().await;
    let (channel_id, _, _) = fx.a30_b45_channel().await;

    let results = futures::future::join_all(
        (0..5).map(|_| fx.scheduler.generate_for_channel(channel_id, Some(2))),
    )
    .await;

    let mut ran = 0;
    let mut joined = 0;
    for result in results {
        match result.unwrap() {
            LockOutcome::Ran(_) => ran += 1,
            LockOutcome::Joined => joined += 1,
        }
    }
    assert_eq!((ran, joined), (1, 4));

    let stored = fx.stored(channel_id).await;
    assert_eq!(stored.len(), 4);
    assert!(find_overlaps(&stored).is_empty());
    assert!(!fx.scheduler.locks().is_in_flight(channel_id));
}

#[tokio::test]
async fn test_maintenance_extends_guide_continuing_rotation() {
    let fx = setup().await;
    let (channel_id, a, b) = fx.a30_b45_channel().await;

    fx.scheduler
        .generate_for_channel(channel_id, Some(1))
        .await
        .unwrap();
    let before = fx.stored(channel_id).await;
    assert_eq!(before.len(), 2);
    assert_eq!(before[1].content, ContentRef::Movie(b));

    let report = fx
        .scheduler
        .maintain_channel(channel_id)
        .await
        .unwrap()
        .into_ran()
        .unwrap();
    assert!(report.programs_extended > 0);
    assert!(!report.regenerated);

    let after = fx.stored(channel_id).await;
    // Rotation continues with A right after the last B
    assert_eq!(after[2].start_time, t0() + minutes(75));
    assert_eq!(after[2].content, ContentRef::Movie(a));

    let horizon = fx.clock_now() + Duration::days(3);
    assert!(after.last().unwrap().end_time() >= horizon);
    assert!(find_overlaps(&after).is_empty());
    assert_eq!(fx.future_gaps(channel_id).await, 0);
}

#[tokio::test]
async fn test_maintenance_generates_channel_without_programs() {
    let fx = setup().await;
    let (channel_id, _, _) = fx.a30_b45_channel().await;

    let report = fx.scheduler.maintain_programs().await.unwrap();
    assert_eq!(report.channels, 1);
    assert_eq!(report.maintained, 1);
    assert_eq!(report.regenerated, 1);
    assert!(report.failed.is_empty());

    let stored = fx.stored(channel_id).await;
    assert_eq!(stored[0].start_time, t0());
    assert!(stored.last().unwrap().end_time() >= fx.clock_now() + Duration::days(3));
}

#[tokio::test]
async fn test_maintenance_repairs_overlaps_and_gaps() {
    let fx = setup().await;
    let (channel_id, a, _) = fx.a30_b45_channel().await;

    fx.scheduler
        .generate_for_channel(channel_id, None)
        .await
        .unwrap();
    let stored = fx.stored(channel_id).await;

    // Punch a 45 minute hole and overlap a later program
    fx.programs.delete_by_ids(&[stored[3].id]).await.unwrap();
    fx.programs
        .insert_many(&[NewProgram {
            channel_id,
            start_time: stored[6].start_time + minutes(10),
            duration_ms: 30 * MINUTE_MS,
            content: ContentRef::Movie(a),
        }])
        .await
        .unwrap();
    assert!(!find_overlaps(&fx.stored(channel_id).await).is_empty());

    let report = fx
        .scheduler
        .maintain_channel(channel_id)
        .await
        .unwrap()
        .into_ran()
        .unwrap();
    assert!(report.overlaps_resolved > 0);
    assert!(report.gaps_filled > 0);
    // A 15 minute remainder fits neither movie, so the channel is rebuilt
    assert!(report.regenerated);

    let repaired = fx.stored(channel_id).await;
    assert!(find_overlaps(&repaired).is_empty());
    assert_eq!(fx.future_gaps(channel_id).await, 0);
    assert_eq!(repaired[0].id, stored[0].id);
}

#[tokio::test]
async fn test_cleanup_all_overlaps() {
    let fx = setup().await;
    let (channel_id, a, _) = fx.a30_b45_channel().await;

    fx.scheduler
        .generate_for_channel(channel_id, Some(2))
        .await
        .unwrap();
    // Starts five minutes before the first program ends and ends inside it
    fx.programs
        .insert_many(&[NewProgram {
            channel_id,
            start_time: t0() + minutes(25),
            duration_ms: 4 * MINUTE_MS,
            content: ContentRef::Movie(a),
        }])
        .await
        .unwrap();

    assert_eq!(fx.scheduler.cleanup_all_overlaps().await.unwrap(), 1);
    let stored = fx.stored(channel_id).await;
    assert_eq!(stored.len(), 4);
    assert!(find_overlaps(&stored).is_empty());
}

#[tokio::test]
async fn test_retention_removes_only_expired_programs() {
    let fx = setup().await;
    let (channel_id, _, _) = fx.a30_b45_channel().await;

    fx.scheduler
        .generate_for_channel(channel_id, Some(2))
        .await
        .unwrap();

    // Cutoff lands at t0 + 90 min: A (ends 30) and B (ends 75) are expired
    fx.clock.set(t0() + Duration::hours(25) + minutes(30));
    assert_eq!(fx.scheduler.cleanup_old_programs().await.unwrap(), 2);

    let remaining = fx.stored(channel_id).await;
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].start_time, t0() + minutes(75));
}

#[tokio::test]
async fn test_guide_days_setting_sets_default_window() {
    let fx = setup().await;
    let (channel_id, _, _) = fx.a30_b45_channel().await;

    SettingsSeaOrmRepository::new(fx.db.connection(), 3)
        .set(GUIDE_DAYS_KEY, "1")
        .await
        .unwrap();

    let outcome = fx
        .scheduler
        .generate_for_channel(channel_id, None)
        .await
        .unwrap()
        .into_ran()
        .unwrap();

    let end = outcome.end_time.unwrap();
    assert!(end >= t0() + Duration::days(1));
    assert!(end < t0() + Duration::days(1) + minutes(45));
}

#[tokio::test]
async fn test_missing_channel_is_not_found() {
    let fx = setup().await;

    let err = fx
        .scheduler
        .generate_for_channel(Uuid::new_v4(), Some(2))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_channel_without_playable_content_is_left_alone() {
    let fx = setup().await;
    let channel = fx.channels.create("Empty", None).await.unwrap();
    fx.add_movie(channel.id, 0, None).await;

    let outcome = fx
        .scheduler
        .generate_for_channel(channel.id, Some(2))
        .await
        .unwrap()
        .into_ran()
        .unwrap();

    assert_eq!(outcome.inserted, 0);
    assert!(outcome.start_time.is_none());
    assert!(fx.stored(channel.id).await.is_empty());
}

#[tokio::test]
async fn test_generate_for_all_channels() {
    let fx = setup().await;
    let (first, _, _) = fx.a30_b45_channel().await;
    let (second, _, _) = fx.a30_b45_channel().await;

    let report = fx.scheduler.generate_for_all_channels(Some(2)).await.unwrap();
    assert_eq!(report.requested, 2);
    assert_eq!(report.generated, 2);
    assert_eq!(report.programs_inserted, 8);
    assert!(report.failed.is_empty());

    assert_eq!(fx.stored(first).await.len(), 4);
    assert_eq!(fx.stored(second).await.len(), 4);
}

#[tokio::test]
async fn test_generation_continues_from_program_ended_this_second() {
    let fx = setup().await;
    let (channel_id, a, b) = fx.a30_b45_channel().await;

    // Ended 200ms before "now", inside the second that truncation rounds down to
    let ended_at = t0() + Duration::milliseconds(200);
    fx.programs
        .insert_many(&[NewProgram {
            channel_id,
            start_time: ended_at - minutes(30),
            duration_ms: 30 * MINUTE_MS,
            content: ContentRef::Movie(a),
        }])
        .await
        .unwrap();

    let outcome = fx
        .scheduler
        .generate_for_channel(channel_id, Some(2))
        .await
        .unwrap()
        .into_ran()
        .unwrap();

    assert_eq!(outcome.start_time, Some(ended_at));
    assert_eq!(outcome.deleted, 0);
    assert_eq!(outcome.overlaps_resolved, 0);

    let stored = fx.stored(channel_id).await;
    assert!(find_overlaps(&stored).is_empty());
    assert_eq!(stored.len(), 5);
    assert_eq!(stored[1].start_time, ended_at);
    assert_eq!(stored[2].content, ContentRef::Movie(b));
}

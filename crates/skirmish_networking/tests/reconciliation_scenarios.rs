//! End-to-end reconciliation behaviour: buffer ordering and capacity,
//! interpolation and extrapolation bounds, teleport handling and the
//! asymmetric render delay.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use skirmish_networking::interpolation::resolve;
use skirmish_networking::{
    AdaptiveDelayController, ReconcileMode, Reconciler, SnapshotBuffer, SyncConfig, SyncSession,
};
use skirmish_shared::{ReplicationMessage, Vec2};

const EPS: f32 = 1e-4;

fn fixed_delay_session(delay: f64) -> SyncSession {
    let config = SyncConfig {
        min_delay: delay,
        max_delay: delay,
        ..SyncConfig::default()
    };
    let mut session = SyncSession::new(config).unwrap();
    session.create_sync(1);
    for t in [0.0, 0.033, 0.066] {
        let message = ReplicationMessage::new(Vec2::new(t as f32, 0.0), Vec2::X, true, t);
        assert!(session.ingest(1, &message).unwrap().is_accepted());
    }
    session
}

#[test]
fn test_interpolates_between_first_two_snapshots() {
    let mut session = fixed_delay_session(0.05);

    let pose = session.render(1, 0.080, 0.0, 0.016).unwrap();

    assert_eq!(pose.mode, ReconcileMode::Interpolate);
    assert!((pose.position.x - 0.030).abs() < EPS, "x = {}", pose.position.x);
    assert_eq!(pose.position.y, 0.0);
    assert!(!pose.teleported);

    let buffer = session.entity(1).unwrap().buffer();
    let resolved = resolve(buffer, 0.030, 0.1).unwrap();
    assert!((resolved.weight - 0.030 / 0.033).abs() < 1e-9);
}

#[test]
fn test_extrapolates_past_last_snapshot() {
    let mut session = fixed_delay_session(0.05);
    session.render(1, 0.080, 0.0, 0.016).unwrap();

    // Render time 0.150 is 84ms past the last snapshot, inside the 100ms window.
    let pose = session.render(1, 0.200, 0.0, 0.016).unwrap();
    assert_eq!(pose.mode, ReconcileMode::Extrapolate);
    assert!((pose.position.x - 0.150).abs() < EPS, "x = {}", pose.position.x);

    // Render time 0.250 would be 184ms past it; the window caps it at 100ms.
    let pose = session.render(1, 0.300, 0.0, 0.016).unwrap();
    assert!((pose.position.x - 0.166).abs() < EPS, "x = {}", pose.position.x);
    assert!((pose.extrapolated - 0.1).abs() < 1e-9);
}

#[test]
fn test_buffer_monotonic_under_shuffled_arrivals() {
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for _ in 0..50 {
        let mut timestamps: Vec<f64> = (0..60).map(|i| f64::from(i) / 30.0).collect();
        // A few duplicates on top of the shuffle.
        for _ in 0..10 {
            let i = rng.gen_range(0..timestamps.len());
            timestamps.push(timestamps[i]);
        }
        timestamps.shuffle(&mut rng);

        let mut buffer = SnapshotBuffer::new(16);
        for t in timestamps {
            buffer.ingest(t, Vec2::ZERO, Vec2::ZERO);
            let stored: Vec<f64> = buffer.iter().map(|s| s.timestamp).collect();
            assert!(stored.windows(2).all(|w| w[0] < w[1]), "not increasing: {stored:?}");
            assert!(buffer.len() <= buffer.capacity());
        }
    }
}

#[test]
fn test_capacity_evicts_oldest_first() {
    let mut buffer = SnapshotBuffer::new(24);
    for i in 0..100 {
        buffer.ingest(f64::from(i), Vec2::ZERO, Vec2::ZERO);
    }

    assert_eq!(buffer.len(), 24);
    assert_eq!(buffer.first().unwrap().timestamp, 76.0);
    assert_eq!(buffer.latest().unwrap().timestamp, 99.0);
}

#[test]
fn test_interpolation_stays_on_segment() {
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..200 {
        let a = Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
        let b = Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
        let t0: f64 = rng.gen_range(0.0..10.0);
        let t1 = t0 + rng.gen_range(0.01..0.2);

        let mut buffer = SnapshotBuffer::new(4);
        buffer.ingest(t0, a, Vec2::ZERO);
        buffer.ingest(t1, b, Vec2::ZERO);

        let render_time = rng.gen_range(t0..t1);
        let pose = resolve(&buffer, render_time, 0.1).unwrap();

        assert_eq!(pose.mode, ReconcileMode::Interpolate);
        assert!((0.0..=1.0).contains(&pose.weight));
        let detour = pose.position.distance(a) + pose.position.distance(b) - a.distance(b);
        assert!(detour.abs() < 1e-3, "off segment by {detour}");
    }
}

#[test]
fn test_extrapolation_displacement_bounded() {
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..200 {
        let velocity = Vec2::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0));
        let window: f64 = rng.gen_range(0.06..0.25);
        let last = Vec2::new(3.0, -2.0);

        let mut buffer = SnapshotBuffer::new(4);
        buffer.ingest(0.0, Vec2::ZERO, velocity);
        buffer.ingest(1.0, last, velocity);

        let render_time = 1.0 + rng.gen_range(0.0..2.0);
        let pose = resolve(&buffer, render_time, window).unwrap();

        assert_eq!(pose.mode, ReconcileMode::Extrapolate);
        let displacement = pose.position.distance(last);
        let bound = window as f32 * velocity.length();
        assert!(displacement <= bound + 1e-3, "{displacement} > {bound}");
    }
}

#[test]
fn test_teleport_happens_once() {
    let mut reconciler = Reconciler::default().with_initial_position(Vec2::ZERO);
    let mut buffer = SnapshotBuffer::new(8);
    buffer.ingest(1.0, Vec2::new(40.0, 0.0), Vec2::ZERO);

    let first = reconciler.reconcile(&mut buffer, 2.0, 0.1, 0.016).unwrap();
    assert!(first.teleported);
    assert_eq!(first.position, Vec2::new(40.0, 0.0));
    assert!(buffer.is_empty());
    assert_eq!(buffer.last_accepted_timestamp(), None);

    // Same buffer state, no new ingest.
    let second = reconciler.reconcile(&mut buffer, 2.0, 0.1, 0.016);
    assert!(second.map_or(true, |pose| !pose.teleported));
    assert_eq!(reconciler.total_teleports, 1);
    assert_eq!(reconciler.rendered_position(), Some(Vec2::new(40.0, 0.0)));

    // Ordering was reset, so an older timestamp is accepted again.
    assert!(buffer.ingest(0.5, Vec2::new(40.0, 0.0), Vec2::ZERO).is_accepted());
    let third = reconciler.reconcile(&mut buffer, 2.0, 0.1, 0.016).unwrap();
    assert!(!third.teleported);
    assert!(third.position.distance(Vec2::new(40.0, 0.0)) < EPS);
}

fn frames_to_settle(controller: &mut AdaptiveDelayController, target: f64) -> u32 {
    let mut frames = 0;
    while (controller.active_delay() - target).abs() > 0.005 {
        controller.step_toward(target, 1.0 / 60.0);
        frames += 1;
        assert!(frames < 100_000, "never settled");
    }
    frames
}

#[test]
fn test_delay_rises_fast_and_falls_slow() {
    let mut controller = AdaptiveDelayController::new(0.08, 0.15, 3.0, 0.01);

    let rise = frames_to_settle(&mut controller, 0.15);
    controller.set_active_delay(0.15);
    let fall = frames_to_settle(&mut controller, 0.08);

    assert!(rise <= 2, "rise took {rise} frames");
    assert!(fall > 100 * rise, "fall took {fall} frames");
}

#[test]
fn test_steady_stream_settles_delay() {
    let mut session = SyncSession::new(SyncConfig::default()).unwrap();
    session.create_sync(1);

    let mut clock = 0.0;
    for frame in 0..120 {
        clock = f64::from(frame) / 60.0;
        if frame % 2 == 0 {
            let message = ReplicationMessage::new(Vec2::ZERO, Vec2::ZERO, true, clock);
            session.ingest(1, &message).unwrap();
        }
        session.render(1, clock, 0.1, 1.0 / 60.0);
    }

    // 3.5 * 33.3ms + 0.25 * 100ms
    let expected = 3.5 / 30.0 + 0.025;
    let delay = session.entity(1).unwrap().delay().active_delay();
    assert!((delay - expected).abs() < 1e-3, "delay {delay} after {clock}s");
}

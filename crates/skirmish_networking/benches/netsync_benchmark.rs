//! Benchmark for the per-frame replication path and event dispatch.
//!
//! TARGET: 1,000 remote entities reconciled well inside one 60Hz frame
//!
//! Run with: cargo bench --package skirmish_networking --bench netsync_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use skirmish_networking::{
    EventBus, EventConfig, EventEnvelope, LoopbackTransport, ManualClock, NetworkConditions,
    ReplicationSimulation, SimulationConfig, SyncConfig, SyncSession,
};
use skirmish_shared::{EventKind, EventPayload, ReceiverGroup, ReplicationMessage, Vec2, PUBLISH_INTERVAL};

const ENTITIES: u32 = 1_000;
const FRAME: f64 = 1.0 / 60.0;

fn filled_session() -> SyncSession {
    let mut session = SyncSession::new(SyncConfig::default()).expect("default config is valid");
    for id in 0..ENTITIES {
        session.create_sync(id);
        for n in 0..12u8 {
            let t = f64::from(n) * PUBLISH_INTERVAL;
            let x = f32::from(n) * 0.2;
            let _ = session.ingest(id, &ReplicationMessage::new(Vec2::new(x, 0.0), Vec2::new(6.0, 0.0), true, t));
        }
    }
    session
}

fn benchmark_ingest(c: &mut Criterion) {
    let mut session = SyncSession::new(SyncConfig::default()).expect("default config is valid");
    session.create_sync(0);

    c.bench_function("ingest_in_order", |b| {
        let mut t = 0.0;
        b.iter(|| {
            t += PUBLISH_INTERVAL;
            let message = ReplicationMessage::new(Vec2::new(1.0, 2.0), Vec2::X, true, t);
            black_box(session.ingest(black_box(0), &message))
        });
    });
}

fn benchmark_render_frame(c: &mut Criterion) {
    let mut session = filled_session();

    let mut group = c.benchmark_group("render_frame");
    group.throughput(Throughput::Elements(u64::from(ENTITIES)));

    group.bench_function("1k_entities", |b| {
        let mut clock = 0.3;
        b.iter(|| {
            // Stay inside the buffered range so every frame interpolates.
            clock = if clock > 0.45 { 0.3 } else { clock + FRAME / 4.0 };
            let mut sum = Vec2::ZERO;
            session.render_frame(clock, 0.1, FRAME, |_, pose| sum += pose.position);
            black_box(sum)
        });
    });

    group.finish();
}

fn benchmark_event_dispatch(c: &mut Criterion) {
    let transport = Arc::new(LoopbackTransport::default());
    let clock = Arc::new(ManualClock::new());
    let bus = EventBus::new(&EventConfig::default(), transport.clone(), clock.clone()).expect("default config is valid");
    for _ in 0..4 {
        bus.register(EventKind::PlayerHit, |event| {
            black_box(event.latency());
            Ok(())
        });
    }

    let hit = EventPayload::PlayerHit {
        victim_actor: 2,
        shooter_actor: 1,
        hit_time: 3.0,
        force: 12.0,
        knock_dir: Vec2::X,
    };
    let bytes = EventEnvelope::new(hit.clone(), 3.0).encode().expect("payload encodes");

    c.bench_function("on_receive_4_handlers", |b| {
        b.iter(|| black_box(bus.on_receive(EventKind::PlayerHit.code(), black_box(&bytes))));
    });

    c.bench_function("send_unthrottled", |b| {
        b.iter(|| {
            clock.advance(0.001);
            black_box(bus.send(hit.clone(), ReceiverGroup::Others));
            black_box(transport.try_recv())
        });
    });
}

fn benchmark_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.sample_size(10);

    group.bench_function("poor_network_8x5s", |b| {
        b.iter(|| {
            let config = SimulationConfig {
                duration_secs: 5.0,
                network: NetworkConditions::POOR,
                ..SimulationConfig::default()
            };
            let mut simulation = ReplicationSimulation::new(config).expect("default config is valid");
            black_box(simulation.run())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_ingest,
    benchmark_render_frame,
    benchmark_event_dispatch,
    benchmark_simulation
);
criterion_main!(benches);

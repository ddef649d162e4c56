use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use strata_blocks::{BlockId, SharedBlocks};
use strata_geom::{Dims, Vec3S};
use strata_runtime::{ActionKind, ActionQueue, Scheduler, SchedulerConfig, WorldRegistry};
use strata_voxel::SYSTEM_ACTOR;
use strata_world::{
    EditFlags, RecordingSink, SinkEvent, ViewerId, ViewerSink, WorldId, WorldSettings,
};

fn registry(dir: &std::path::Path) -> Arc<WorldRegistry> {
    Arc::new(WorldRegistry::new(
        dir,
        SharedBlocks::default(),
        WorldSettings::default(),
    ))
}

#[test]
fn edit_broadcast_then_resize_through_action_queue() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let world = reg.add(0, "test", Dims::new(5, 5, 5)).unwrap();

    let sink = Arc::new(RecordingSink::new());
    world.join_viewer(1, sink.as_ref());
    world.viewer_loaded(1).unwrap();
    sink.take();

    let p = Vec3S::new(2, 2, 2);
    let flags = EditFlags {
        undo: false,
        physics: false,
        broadcast: true,
        priority: 5,
    };
    world.block_change(p, 1, SYSTEM_ACTOR, flags).unwrap();
    let report = reg.maintenance_pass(Instant::now(), sink.as_ref());
    assert_eq!(report.notified, 1);
    assert_eq!(sink.block_events_for(1), vec![(p, 1)]);

    let dyn_sink: Arc<dyn ViewerSink> = sink.clone();
    let mut queue = ActionQueue::start(Arc::clone(&reg), dyn_sink).unwrap();
    let id = queue
        .submit(
            0,
            ActionKind::Resize {
                dims: Dims::new(10, 5, 5),
            },
        )
        .unwrap();
    let out = queue
        .results()
        .recv_timeout(Duration::from_secs(10))
        .unwrap();
    assert_eq!(out.id, id);
    assert!(out.result.is_ok(), "{:?}", out.result);

    assert_eq!(world.dims(), Dims::new(10, 5, 5));
    assert_eq!(world.get_block(p), Ok(1));
    assert_eq!(world.get_block(Vec3S::new(7, 2, 2)), Ok(0));
    assert!(
        sink.take()
            .contains(&SinkEvent::Snapshot { viewer: 1, world: 0 })
    );
    queue.shutdown();
}

#[test]
fn scheduler_delivers_updates_in_the_background() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let world = reg.add(3, "bg", Dims::new(4, 4, 4)).unwrap();
    let sink = Arc::new(RecordingSink::new());
    world.join_viewer(8, sink.as_ref());
    world.viewer_loaded(8).unwrap();

    let dyn_sink: Arc<dyn ViewerSink> = sink.clone();
    let mut scheduler = Scheduler::start(
        Arc::clone(&reg),
        dyn_sink,
        SchedulerConfig {
            tick: Duration::from_millis(5),
            threads: 2,
        },
    )
    .unwrap();
    assert_eq!(scheduler.workers(), 2);

    let p = Vec3S::new(3, 3, 3);
    world.block_change(p, 4, 9, EditFlags::ACTOR).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while sink.block_events_for(8).is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    scheduler.stop();
    assert_eq!(sink.block_events_for(8), vec![(p, 4)]);
}

/// Records like `RecordingSink` but panics on any delivery to `faulty`.
struct FaultySink {
    inner: RecordingSink,
    faulty: ViewerId,
}

impl ViewerSink for FaultySink {
    fn block_changed(&self, viewer: ViewerId, pos: Vec3S, ty: BlockId) {
        if viewer == self.faulty {
            panic!("viewer {viewer} connection reset");
        }
        self.inner.block_changed(viewer, pos, ty);
    }

    fn world_snapshot(&self, viewer: ViewerId, world: WorldId) {
        self.inner.world_snapshot(viewer, world);
    }
}

fn wait_for(deadline: Instant, mut done: impl FnMut() -> bool) -> bool {
    while !done() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    true
}

#[test]
fn panicking_tick_leaves_other_worlds_running() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let bad = reg.add(0, "bad", Dims::new(4, 4, 4)).unwrap();
    let good = reg.add(1, "good", Dims::new(4, 4, 4)).unwrap();
    let sink = Arc::new(FaultySink {
        inner: RecordingSink::new(),
        faulty: 66,
    });
    bad.join_viewer(66, sink.as_ref());
    bad.viewer_loaded(66).unwrap();
    good.join_viewer(8, sink.as_ref());
    good.viewer_loaded(8).unwrap();

    let dyn_sink: Arc<dyn ViewerSink> = sink.clone();
    let mut scheduler = Scheduler::start(
        Arc::clone(&reg),
        dyn_sink,
        SchedulerConfig {
            tick: Duration::from_millis(5),
            threads: 1,
        },
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    bad.block_change(Vec3S::new(1, 1, 1), 4, 9, EditFlags::ACTOR)
        .unwrap();
    assert!(wait_for(deadline, || bad.pending_broadcasts() == 0));

    let p = Vec3S::new(2, 2, 2);
    good.block_change(p, 4, 9, EditFlags::ACTOR).unwrap();
    assert!(wait_for(deadline, || !sink.inner.block_events_for(8).is_empty()));

    // The panicked world is claimed again on later ticks.
    bad.block_change(Vec3S::new(2, 1, 1), 4, 9, EditFlags::ACTOR)
        .unwrap();
    assert!(wait_for(deadline, || bad.pending_broadcasts() == 0));

    scheduler.stop();
    assert_eq!(sink.inner.block_events_for(8), vec![(p, 4)]);
    assert!(wait_for(deadline, || bad.begin_tick().is_some()));
}

//! Unit tests for tf-schedule.

use tf_agent::{AgentInit, Kinematics, VehicleSpec};
use tf_core::{SegmentId, Tick};

use crate::SpawnRequest;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn req(tick: u64, start: u32, goal: u32) -> SpawnRequest {
    SpawnRequest::new(Tick(tick), AgentInit {
        start:   Kinematics::at_rest(SegmentId(start), 0.0, 0),
        goal:    SegmentId(goal),
        vehicle: VehicleSpec::default(),
    })
}

// ── SpawnQueue ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod spawn_queue {
    use super::*;
    use crate::SpawnQueue;

    #[test]
    fn push_and_drain_tick() {
        let mut q = SpawnQueue::new();
        q.push(req(5, 0, 1));
        q.push(req(5, 2, 3));
        q.push(req(9, 4, 5));
        assert_eq!(q.len(), 3);
        assert_eq!(q.tick_count(), 2);
        assert_eq!(q.next_tick(), Some(Tick(5)));

        let five = q.drain_tick(Tick(5)).unwrap();
        assert_eq!(five.len(), 2);
        assert_eq!(five[0].init.start.segment, SegmentId(0));
        assert_eq!(five[1].init.start.segment, SegmentId(2));
        assert_eq!(q.len(), 1);
        assert!(q.drain_tick(Tick(5)).is_none());
    }

    #[test]
    fn drain_due_takes_everything_up_to_now() {
        let mut q = SpawnQueue::from_requests([req(7, 0, 1), req(2, 1, 2), req(3, 2, 3), req(3, 3, 4)]);
        let due = q.drain_due(Tick(3));
        let ticks: Vec<u64> = due.iter().map(|r| r.tick.0).collect();
        assert_eq!(ticks, vec![2, 3, 3]);
        assert_eq!(due[1].init.start.segment, SegmentId(2));
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_tick(), Some(Tick(7)));
        assert!(q.drain_due(Tick(6)).is_empty());
    }

    #[test]
    fn clear_empties() {
        let mut q = SpawnQueue::from_requests([req(1, 0, 1)]);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.next_tick(), None);
    }
}

// ── RandomSpawner ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod random_spawner {
    use super::*;
    use crate::{RandomSpawnConfig, RandomSpawner};

    fn routes() -> Vec<(SegmentId, SegmentId)> {
        vec![(SegmentId(0), SegmentId(5)), (SegmentId(2), SegmentId(7)), (SegmentId(4), SegmentId(1))]
    }

    fn config() -> RandomSpawnConfig {
        RandomSpawnConfig { period_ticks: 10, max_live: 5, initial: 3, ..Default::default() }
    }

    #[test]
    fn initial_burst_then_periodic() {
        let mut s = RandomSpawner::new(config(), routes(), 42).unwrap();
        assert_eq!(s.poll(Tick(0), 0).len(), 3);
        assert!(s.poll(Tick(1), 3).is_empty());
        assert!(s.poll(Tick(9), 3).is_empty());
        assert_eq!(s.poll(Tick(10), 3).len(), 1);
    }

    #[test]
    fn respects_live_cap() {
        let mut s = RandomSpawner::new(config(), routes(), 42).unwrap();
        assert_eq!(s.poll(Tick(0), 4).len(), 1);
        assert!(s.poll(Tick(20), 5).is_empty());
    }

    #[test]
    fn draws_only_configured_pairs() {
        let mut s = RandomSpawner::new(config(), routes(), 7).unwrap();
        for t in 0..50 {
            for r in s.poll(Tick(t * 10), 0) {
                assert!(routes().contains(&(r.init.start.segment, r.init.goal)));
                assert_eq!(r.tick, Tick(t * 10));
            }
        }
    }

    #[test]
    fn same_seed_same_spawns_and_reset_rewinds() {
        let mut a = RandomSpawner::new(config(), routes(), 11).unwrap();
        let mut b = RandomSpawner::new(config(), routes(), 11).unwrap();
        let first: Vec<_> = (0..20).flat_map(|t| a.poll(Tick(t * 10), 0)).collect();
        let other: Vec<_> = (0..20).flat_map(|t| b.poll(Tick(t * 10), 0)).collect();
        assert_eq!(first, other);

        a.reset();
        let again: Vec<_> = (0..20).flat_map(|t| a.poll(Tick(t * 10), 0)).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn rejects_bad_config() {
        assert!(RandomSpawner::new(RandomSpawnConfig { period_ticks: 0, ..config() }, routes(), 0).is_err());
        assert!(RandomSpawner::new(config(), Vec::new(), 0).is_err());
    }
}

// ── CSV loader ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Cursor;

    use super::*;
    use crate::{load_spawns_csv, load_spawns_reader, ScheduleError};

    #[test]
    fn full_and_sparse_rows() {
        let csv = "\
tick,start_segment,goal_segment,lane,offset_m,speed_mps,length_m,max_speed_mps
0,0,5,1,3.5,8.0,,
40,4,1,,,,6.0,12.0
";
        let spawns = load_spawns_reader(Cursor::new(csv)).unwrap();
        assert_eq!(spawns.len(), 2);

        let a = &spawns[0];
        assert_eq!(a.tick, Tick(0));
        assert_eq!(a.init.start, Kinematics { segment: SegmentId(0), offset_m: 3.5, lane: 1, speed_mps: 8.0 });
        assert_eq!(a.init.goal, SegmentId(5));
        assert_eq!(a.init.vehicle, VehicleSpec::default());

        let b = &spawns[1];
        assert_eq!(b.tick, Tick(40));
        assert_eq!(b.init.start, Kinematics::at_rest(SegmentId(4), 0.0, 0));
        assert_eq!(b.init.vehicle.length_m, 6.0);
        assert_eq!(b.init.vehicle.max_speed_mps, 12.0);
        assert_eq!(b.init.vehicle.max_brake_mps2, VehicleSpec::default().max_brake_mps2);
    }

    #[test]
    fn minimal_columns() {
        let csv = "tick,start_segment,goal_segment\n3,2,7\n";
        let spawns = load_spawns_reader(Cursor::new(csv)).unwrap();
        assert_eq!(spawns, vec![req(3, 2, 7)]);
    }

    #[test]
    fn bad_number_is_parse_error() {
        let csv = "tick,start_segment,goal_segment\nsoon,2,7\n";
        let err = load_spawns_reader(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, ScheduleError::Parse(_)));
    }

    #[test]
    fn negative_speed_is_invalid() {
        let csv = "tick,start_segment,goal_segment,speed_mps\n0,0,1,-2.0\n";
        let err = load_spawns_reader(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, ScheduleError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_spawns_csv(std::path::Path::new("/nonexistent/spawns.csv")).unwrap_err();
        assert!(matches!(err, ScheduleError::Io(_)));
    }
}

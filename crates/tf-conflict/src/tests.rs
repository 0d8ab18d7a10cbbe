//! Unit tests for tf-conflict.
//!
//! Most tests drive a single four-way junction (arms N, E, S, W) through
//! the same resolve → re-integrate → commit cycle the simulation uses.

#[cfg(test)]
mod helpers {
    use std::collections::BTreeMap;

    use tf_agent::{AgentInit, AgentStore, AgentStoreBuilder, Kinematics, VehicleSpec};
    use tf_control::{Controller, FixedPhase, PhaseSpec, TrafficControl};
    use tf_core::{AgentId, AgentStatus, SegmentId, Tick};
    use tf_mobility::{integrate, Candidate, Limit};
    use tf_network::{four_way, FourWay, RoadNetwork};
    use tf_policy::Action;

    use crate::{CommitReport, ConflictConfig, Resolution, ResolveInput, Resolver};

    pub const DT_MS: u32 = 100;
    pub const N: usize = FourWay::N;
    pub const E: usize = FourWay::E;
    pub const S: usize = FourWay::S;
    pub const W: usize = FourWay::W;

    pub struct World {
        pub net:      RoadNetwork,
        pub fw:       FourWay,
        pub control:  TrafficControl,
        pub agents:   AgentStore,
        /// Route segment after the current one.
        pub next:     BTreeMap<AgentId, Option<SegmentId>>,
        pub resolver: Resolver,
    }

    impl World {
        pub fn new(lanes: u8) -> Self {
            let (net, fw) = four_way(100.0, lanes, 10.0).unwrap();
            let (agents, _) = AgentStoreBuilder::new(0).build();
            Self {
                net,
                fw,
                control: TrafficControl::new(),
                agents,
                next: BTreeMap::new(),
                resolver: Resolver::new(ConflictConfig::default()).unwrap(),
            }
        }

        /// Put a fixed-time plan on the centre junction.
        pub fn signals(&mut self, phases: Vec<(Vec<usize>, u64)>, clearance: u64) {
            let specs = phases
                .into_iter()
                .enumerate()
                .map(|(i, (arms, dur))| {
                    PhaseSpec::new(format!("p{i}"), arms.iter().map(|&a| self.fw.inbound[a]).collect(), dur)
                })
                .collect();
            let c = Controller::Fixed(FixedPhase::new(specs, clearance, 0).unwrap());
            self.control.insert(&self.net, self.fw.center, c).unwrap();
        }

        pub fn len(&self, seg: SegmentId) -> f32 {
            self.net.segment(seg).unwrap().length_m
        }

        /// Agent on the inbound segment of `from`, `dist` metres before the
        /// stop line, heading out through arm `to`.
        pub fn spawn(&mut self, from: usize, to: usize, dist: f32, lane: u8, speed: f32) -> AgentId {
            let seg = self.fw.inbound[from];
            let start = Kinematics { segment: seg, offset_m: self.len(seg) - dist, lane, speed_mps: speed };
            let goal = self.fw.outbound[to];
            let id = self.agents.spawn(AgentInit { start, goal, vehicle: VehicleSpec::default() }, Tick(0));
            self.next.insert(id, Some(goal));
            id
        }

        /// A parked (Waiting) vehicle on `seg`.
        pub fn park(&mut self, seg: SegmentId, offset: f32) -> AgentId {
            let start = Kinematics::at_rest(seg, offset, 0);
            let id = self.agents.spawn(AgentInit { start, goal: seg, vehicle: VehicleSpec::default() }, Tick(0));
            self.agents.set_waiting(id).unwrap();
            id
        }

        pub fn propose(&self, agent: AgentId, action: Action, limit: Limit) -> Candidate {
            let k = self.agents.kinematics(agent).unwrap();
            let next = self.next.get(&agent).copied().flatten();
            integrate(&self.net, agent, &VehicleSpec::default(), k, next, action, limit, DT_MS as f32 / 1000.0).unwrap()
        }

        pub fn candidates(&self, action: Action) -> BTreeMap<AgentId, Candidate> {
            self.agents.active_ids().map(|a| (a, self.propose(a, action, Limit::NONE))).collect()
        }

        pub fn resolve(&self, cands: &BTreeMap<AgentId, Candidate>, tick: Tick) -> Resolution {
            let input = ResolveInput {
                network:    &self.net,
                control:    &self.control,
                agents:     &self.agents,
                candidates: cands,
                tick,
                dt_ms:      DT_MS,
            };
            self.resolver.resolve(input).unwrap()
        }

        /// One full resolve → re-integrate → commit cycle.
        pub fn step(&mut self, tick: Tick, action: Action) -> (Resolution, CommitReport) {
            let cands = self.candidates(action);
            let resolution = self.resolve(&cands, tick);
            for (&a, c) in &cands {
                let v = resolution.verdicts[&a];
                let c = if v.needs_reintegration() { self.propose(a, action, v.limit) } else { *c };
                self.agents.set_kinematics(a, c.next, c.accel_mps2).unwrap();
                if c.crossed {
                    self.next.insert(a, None);
                }
                if c.completed {
                    self.agents.finish(a, AgentStatus::Completed, tick).unwrap();
                }
            }
            let report = self.resolver.commit(resolution.clone(), &self.net, &self.agents).unwrap();
            (resolution, report)
        }
    }
}

// ── Junction ranking ──────────────────────────────────────────────────────────

#[cfg(test)]
mod ranking {
    use tf_core::Tick;
    use tf_policy::Action;

    use tf_mobility::BrakeMode;

    use super::helpers::*;
    use crate::{Decision, DenyReason};

    #[test]
    fn perpendicular_tie_goes_to_lower_id() {
        let mut w = World::new(1);
        let a = w.spawn(N, S, 15.0, 0, 5.0);
        let b = w.spawn(E, W, 15.0, 0, 5.0);
        let cands = w.candidates(Action::KEEP);
        let r = w.resolve(&cands, Tick(0));
        assert_eq!(r.decision(a), Some(Decision::Accept));
        assert_eq!(r.decision(b), Some(Decision::Yield));
        assert_eq!(r.verdict(b).unwrap().reason, Some(DenyReason::Reserved));
        assert_eq!(r.grants.len(), 1);
        assert_eq!(r.grants[0].agent, a);
    }

    #[test]
    fn perpendicular_tie_under_shared_green() {
        let mut w = World::new(1);
        w.signals(vec![(vec![N, E], 100)], 0);
        let a = w.spawn(N, S, 15.0, 0, 5.0);
        let b = w.spawn(E, W, 15.0, 0, 5.0);
        let r = w.resolve(&w.candidates(Action::KEEP), Tick(0));
        assert_eq!(r.tally(), (1, 1, 0));
        assert_eq!(r.decision(a), Some(Decision::Accept));
        assert_eq!(r.decision(b), Some(Decision::Yield));
    }

    #[test]
    fn opposing_straights_both_accepted() {
        let mut w = World::new(1);
        let a = w.spawn(N, S, 15.0, 0, 5.0);
        let b = w.spawn(S, N, 15.0, 0, 5.0);
        let r = w.resolve(&w.candidates(Action::KEEP), Tick(0));
        assert_eq!(r.decision(a), Some(Decision::Accept));
        assert_eq!(r.decision(b), Some(Decision::Accept));
        assert_eq!(r.grants.len(), 2);
    }

    #[test]
    fn earlier_arrival_beats_lower_id() {
        let mut w = World::new(1);
        let far = w.spawn(N, S, 20.0, 0, 5.0);
        let near = w.spawn(E, W, 10.0, 0, 5.0);
        let r = w.resolve(&w.candidates(Action::KEEP), Tick(0));
        assert_eq!(r.decision(near), Some(Decision::Accept));
        assert_eq!(r.decision(far), Some(Decision::Yield));
    }

    #[test]
    fn far_agents_do_not_contend() {
        let mut w = World::new(1);
        let a = w.spawn(N, S, 60.0, 0, 5.0);
        let r = w.resolve(&w.candidates(Action::KEEP), Tick(0));
        assert_eq!(r.decision(a), Some(Decision::Accept));
        assert!(r.grants.is_empty());
    }

    #[test]
    fn too_close_to_stop_gets_stop() {
        let mut w = World::new(1);
        let a = w.spawn(N, S, 0.3, 0, 0.0);
        // 10 m/s needs 8.3 m to stop; only 5 m left.
        let b = w.spawn(E, W, 5.0, 0, 10.0);
        let r = w.resolve(&w.candidates(Action::KEEP), Tick(0));
        assert_eq!(r.decision(a), Some(Decision::Accept));
        let v = r.verdict(b).unwrap();
        assert_eq!(v.decision, Decision::Stop);
        assert_eq!(v.limit.hold_at_line, Some(BrakeMode::Hard));
    }

    #[test]
    fn denied_agent_is_held_behind_the_line() {
        let mut w = World::new(1);
        let a = w.spawn(N, S, 0.3, 0, 3.0);
        let b = w.spawn(E, W, 0.3, 0, 3.0);
        let (r, _) = w.step(Tick(0), Action::accel(2.0));
        assert_eq!(r.decision(a), Some(Decision::Accept));
        assert_eq!(r.decision(b), Some(Decision::Stop));
        assert_eq!(w.agents.segment[b.index()], w.fw.inbound[E]);
        assert!(w.agents.offset_m[b.index()] <= w.len(w.fw.inbound[E]));
        assert_eq!(w.agents.segment[a.index()], w.fw.outbound[S]);
    }
}

// ── Signals ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod signals {
    use tf_core::Tick;
    use tf_policy::Action;

    use super::helpers::*;
    use crate::{Decision, DenyReason};

    #[test]
    fn red_approach_is_refused_without_deadlock_count() {
        let mut w = World::new(1);
        w.signals(vec![(vec![N], 100), (vec![E], 100)], 5);
        let b = w.spawn(E, W, 0.2, 0, 0.0);
        for t in 0..80 {
            let (r, _) = w.step(Tick(t), Action::KEEP);
            assert_eq!(r.verdict(b).unwrap().reason, Some(DenyReason::Signal));
            assert_eq!(r.decision(b), Some(Decision::Yield));
        }
        assert_eq!(w.resolver.deadlock().count(b), 0);
    }

    #[test]
    fn fixed_plan_arrival_in_clearance_waits_for_green() {
        // 30 green (N) / 5 all-red / 30 green (E).
        let mut w = World::new(1);
        w.signals(vec![(vec![N], 30), (vec![E], 30)], 5);
        let b = w.spawn(E, W, 0.2, 0, 0.0);
        let mut first_accept = None;
        for t in 31..45 {
            let (r, _) = w.step(Tick(t), Action::KEEP);
            if r.decision(b) == Some(Decision::Accept) {
                first_accept = Some(t);
                break;
            }
        }
        assert_eq!(first_accept, Some(35));
    }
}

// ── Reservations ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod reservations {
    use tf_core::{AgentId, JunctionId, ReservationId, Tick};
    use tf_network::Movement;
    use tf_policy::Action;

    use super::helpers::*;
    use crate::{ConflictConfig, ReservationBook, Resolver};

    #[test]
    fn holder_is_not_granted_twice() {
        let mut w = World::new(1);
        let a = w.spawn(N, S, 0.2, 0, 0.0);
        let (r0, rep0) = w.step(Tick(0), Action::KEEP);
        assert_eq!(r0.grants.len(), 1);
        assert_eq!(rep0.granted.len(), 1);
        assert!(w.resolver.holds_reservation(a, Tick(1)));
        let (r1, _) = w.step(Tick(1), Action::KEEP);
        assert!(r1.grants.is_empty());
        assert_eq!(r1.decision(a), Some(crate::Decision::Accept));
    }

    #[test]
    fn released_once_clear_of_junction() {
        let mut w = World::new(1);
        let a = w.spawn(N, S, 0.2, 0, 8.0);
        w.step(Tick(0), Action::KEEP);
        assert_eq!(w.agents.segment[a.index()], w.fw.outbound[S]);
        assert_eq!(w.resolver.book().len(), 1);
        let mut released_at = None;
        for t in 1..20 {
            let (_, rep) = w.step(Tick(t), Action::KEEP);
            if !rep.released.is_empty() {
                released_at = Some(t);
                break;
            }
        }
        // 8 m/s covers the 10 m clear distance in about 13 ticks.
        assert!(released_at.is_some());
        assert!(w.agents.offset_m[a.index()] >= 10.0);
        assert!(w.resolver.book().is_empty());
        let h = w.resolver.book().history().back().unwrap();
        assert_eq!(h.end, Tick(released_at.unwrap() + 1));
    }

    #[test]
    fn unused_reservation_expires() {
        let mut w = World::new(1);
        let a = w.spawn(N, S, 0.2, 0, 0.0);
        // Grant, then keep the agent parked at the line with a hard hold so
        // it never enters.
        let (r, _) = w.step(Tick(0), Action::KEEP);
        let end = r.grants[0].end;
        let mut t = 1;
        while w.resolver.holds_reservation(a, Tick(t)) {
            let cands = w.candidates(Action::accel(-6.0));
            let res = w.resolve(&cands, Tick(t));
            w.resolver.commit(res, &w.net, &w.agents).unwrap();
            t += 1;
        }
        assert_eq!(Tick(t), end);
    }

    #[test]
    fn book_invariant_detects_conflicting_overlap() {
        let w = World::new(1);
        let ns = Movement::new(w.fw.inbound[N], w.fw.outbound[S]);
        let ew = Movement::new(w.fw.inbound[E], w.fw.outbound[W]);
        let mut book = ReservationBook::new(16);
        book.insert(w.fw.center, ns, AgentId(0), Tick(0), Tick(10));
        assert!(book.check_invariant(&w.net).is_ok());
        book.insert(w.fw.center, ew, AgentId(1), Tick(5), Tick(15));
        assert!(book.check_invariant(&w.net).is_err());
    }

    #[test]
    fn book_reuses_slots_and_keeps_history() {
        let w = World::new(1);
        let ns = Movement::new(w.fw.inbound[N], w.fw.outbound[S]);
        let mut book = ReservationBook::new(2);
        let r0 = book.insert(w.fw.center, ns, AgentId(0), Tick(0), Tick(10));
        assert_eq!(r0, ReservationId(0));
        let closed = book.release(r0, Tick(3)).unwrap();
        assert_eq!(closed.end, Tick(4));
        let r1 = book.insert(w.fw.center, ns, AgentId(1), Tick(4), Tick(10));
        assert_eq!(r1, ReservationId(0));
        assert_eq!(book.held_by(AgentId(1)).unwrap().start, Tick(4));
        assert!(book.held_by(AgentId(0)).is_none());
        let expired = book.expire(Tick(10));
        assert_eq!(expired.len(), 1);
        assert!(book.is_empty());
        assert_eq!(book.history().len(), 2);
        assert_eq!(book.at_junction(JunctionId(0)).count(), 0);
    }

    #[test]
    fn config_rejects_reservations_longer_than_deadlock_window() {
        let bad = ConflictConfig { max_reservation_ticks: 60, deadlock_ticks: 50, ..Default::default() };
        assert!(Resolver::new(bad).is_err());
        assert!(ConflictConfig::default().validate().is_ok());
    }
}

// ── Deadlock ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod deadlock {
    use tf_core::Tick;
    use tf_policy::Action;

    use super::helpers::*;
    use crate::{ConflictConfig, Decision, DeadlockTracker, DenyReason};

    #[test]
    fn tracker_flags_once_at_threshold() {
        let mut t = DeadlockTracker::new(3);
        let a = tf_core::AgentId(4);
        assert!(!t.record_denied(a));
        assert!(!t.record_denied(a));
        assert!(t.record_denied(a));
        assert!(!t.record_denied(a));
        assert!(t.is_deadlocked(a));
        assert_eq!(t.deadlocked().collect::<Vec<_>>(), vec![a]);
        t.reset(a);
        assert!(!t.is_deadlocked(a));
        assert_eq!(t.detected_total(), 1);
    }

    #[test]
    fn spillback_deadlock_escalates_within_bound() {
        let mut w = World::new(1);
        let n = ConflictConfig::default().deadlock_ticks as u64;
        let a = w.spawn(N, S, 0.2, 0, 0.0);
        // Parked right behind the junction on a's exit.
        w.park(w.fw.outbound[S], 3.0);
        // A cross-traffic contender that would otherwise keep winning.
        let b = w.spawn(E, W, 0.2, 0, 0.0);
        w.park(w.fw.outbound[W], 3.0);

        let mut detected = None;
        let mut accepted = None;
        for t in 0..(3 * n) {
            let (r, rep) = w.step(Tick(t), Action::KEEP);
            if rep.deadlocked.contains(&a) {
                detected = Some(t);
            }
            if detected.is_some() && r.decision(a) == Some(Decision::Accept) {
                accepted = Some(t);
                assert!(r.escalated.contains(&a));
                assert_eq!(r.verdict(b).unwrap().reason, Some(DenyReason::Escalation));
                break;
            }
            if detected.is_none() {
                assert_eq!(r.verdict(a).unwrap().reason, Some(DenyReason::Spillback));
            }
        }
        let detected = detected.unwrap();
        assert_eq!(detected, n - 1);
        assert!(accepted.unwrap() - detected <= n + 1);
    }
}

// ── Following and lane changes ────────────────────────────────────────────────

#[cfg(test)]
mod following {
    use tf_core::Tick;
    use tf_policy::Action;

    use super::helpers::*;
    use crate::Decision;

    #[test]
    fn follower_is_capped_not_stopped() {
        let mut w = World::new(1);
        let lead = w.spawn(N, S, 50.0, 0, 0.0);
        let follow = w.spawn(N, S, 57.0, 0, 10.0);
        let r = w.resolve(&w.candidates(Action::KEEP), Tick(0));
        let v = r.verdict(follow).unwrap();
        assert_eq!(v.decision, Decision::Accept);
        assert!(v.needs_reintegration());
        // 7 m apart, 4.5 m vehicle, 2 m gap.
        assert!((v.limit.max_advance_m.unwrap() - 0.5).abs() < 1e-4);
        assert_eq!(v.limit.speed_cap, Some(0.0));
        assert!(!r.verdict(lead).unwrap().needs_reintegration());

        w.step(Tick(0), Action::KEEP);
        let gap = w.agents.offset_m[lead.index()] - 4.5 - w.agents.offset_m[follow.index()];
        assert!(gap >= 2.0 - 1e-4);
    }

    #[test]
    fn simultaneous_lane_changes_lower_id_wins() {
        let mut w = World::new(3);
        let a = w.spawn(N, S, 60.0, 0, 5.0);
        let b = w.spawn(N, S, 59.0, 2, 5.0);
        let mut cands = w.candidates(Action::KEEP);
        cands.insert(a, w.propose(a, tf_policy::Action { accel_mps2: 0.0, lane_delta: 1 }, tf_mobility::Limit::NONE));
        cands.insert(b, w.propose(b, tf_policy::Action { accel_mps2: 0.0, lane_delta: -1 }, tf_mobility::Limit::NONE));
        let r = w.resolve(&cands, Tick(0));
        assert!(!r.verdict(a).unwrap().limit.lane_lock);
        assert!(r.verdict(b).unwrap().limit.lane_lock);
    }

    #[test]
    fn lane_change_into_occupied_gap_is_locked() {
        let mut w = World::new(2);
        let a = w.spawn(N, S, 60.0, 0, 5.0);
        let _occupant = w.spawn(N, S, 57.0, 1, 5.0);
        let mut cands = w.candidates(Action::KEEP);
        cands.insert(a, w.propose(a, tf_policy::Action { accel_mps2: 0.0, lane_delta: 1 }, tf_mobility::Limit::NONE));
        let r = w.resolve(&cands, Tick(0));
        assert!(r.verdict(a).unwrap().limit.lane_lock);
    }
}

// ── Properties ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use proptest::prelude::*;
    use tf_core::Tick;
    use tf_policy::Action;

    use super::helpers::*;
    use crate::Reservation;

    fn world(specs: &[(usize, usize, f32, f32)]) -> World {
        let mut w = World::new(1);
        for &(from, turn, dist, speed) in specs {
            let to = (from + 1 + turn) % 4;
            w.spawn(from, to, dist, 0, speed);
        }
        w
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn conflicting_reservations_never_overlap(
            specs in prop::collection::vec((0usize..4, 0usize..3, 0.0f32..40.0, 0.0f32..10.0), 1..6),
            accel in 0.0f32..2.5,
        ) {
            // One vehicle per approach keeps the initial placement collision-free.
            let mut seen = [false; 4];
            let specs: Vec<_> = specs.into_iter().filter(|s| !std::mem::replace(&mut seen[s.0], true)).collect();
            let mut w = world(&specs);

            for t in 0..120 {
                let cands = w.candidates(Action::accel(accel));
                let first = w.resolve(&cands, Tick(t));
                let second = w.resolve(&cands, Tick(t));
                prop_assert_eq!(&first, &second);
                w.step(Tick(t), Action::accel(accel));
            }

            let j = w.net.junction(w.fw.center).unwrap();
            let all: Vec<Reservation> = w.resolver.book().history().iter()
                .chain(w.resolver.book().iter())
                .copied()
                .collect();
            for (i, a) in all.iter().enumerate() {
                for b in &all[i + 1..] {
                    if a.agent != b.agent && j.conflicts(a.movement, b.movement) {
                        prop_assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
                    }
                }
            }
        }
    }
}

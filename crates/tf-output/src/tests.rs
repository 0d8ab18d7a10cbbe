//! Integration tests for tf-output.

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use crate::csv::CsvWriter;
    use crate::row::{AgentMetricsRow, AgentSnapshotRow, TickSummaryRow};
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn snap_row(agent_id: u32, tick: u64) -> AgentSnapshotRow {
        AgentSnapshotRow {
            agent_id,
            tick,
            status: "active",
            segment: agent_id * 2,
            offset_m: 12.5,
            lane: 0,
            speed_mps: 8.0,
            accel_mps2: -0.5,
            reservation: (agent_id % 2 == 0).then_some(agent_id),
        }
    }

    fn headers(path: &std::path::Path) -> Vec<String> {
        let mut rdr = ::csv::Reader::from_path(path).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    #[test]
    fn csv_files_created() {
        let dir = tmp();
        let _w = CsvWriter::new(dir.path()).unwrap();
        assert!(dir.path().join("agent_snapshots.csv").exists());
        assert!(dir.path().join("tick_summaries.csv").exists());
        assert!(dir.path().join("agent_metrics.csv").exists());
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        assert_eq!(headers(&dir.path().join("agent_snapshots.csv")), crate::csv::SNAPSHOT_HEADER);
        assert_eq!(headers(&dir.path().join("tick_summaries.csv")), crate::csv::SUMMARY_HEADER);
        assert_eq!(headers(&dir.path().join("agent_metrics.csv")), crate::csv::METRICS_HEADER);
    }

    #[test]
    fn snapshot_rows_written() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_snapshots(&[snap_row(0, 5), snap_row(1, 5), snap_row(2, 5)]).unwrap();
        w.finish().unwrap();

        let mut rdr = ::csv::Reader::from_path(dir.path().join("agent_snapshots.csv")).unwrap();
        let records: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[1][0], "1");
        assert_eq!(&records[1][2], "active");
        assert_eq!(&records[1][4], "12.500");
        // Odd agents hold no reservation: empty field.
        assert_eq!(&records[1][8], "");
        assert_eq!(&records[2][8], "2");
    }

    #[test]
    fn summary_and_metrics_rows_written() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        for tick in 0..4 {
            let row = TickSummaryRow { tick, sim_time_ms: tick * 100, live: 2, ..Default::default() };
            w.write_tick_summary(&row).unwrap();
        }
        w.write_agent_metrics(&[AgentMetricsRow {
            agent_id:        7,
            spawn_tick:      3,
            completion_tick: None,
            distance_m:      41.0,
            wait_ticks:      6,
            average_wait:    3.0,
            yields:          2,
            stops:           1,
            timeouts:        0,
            collisions:      0,
            violations:      0,
            replans:         1,
            total_reward:    4.1,
        }])
        .unwrap();
        w.finish().unwrap();

        let mut rdr = ::csv::Reader::from_path(dir.path().join("tick_summaries.csv")).unwrap();
        let records: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 4);
        assert_eq!(&records[3][1], "300");

        let mut rdr = ::csv::Reader::from_path(dir.path().join("agent_metrics.csv")).unwrap();
        let records: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "7");
        assert_eq!(&records[0][2], "");
        assert_eq!(&records[0][12], "4.1000");
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }

    #[test]
    fn rows_written_after_finish_are_flushed_by_the_next_finish() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        w.write_agent_metrics(&[AgentMetricsRow {
            agent_id:        0,
            spawn_tick:      0,
            completion_tick: Some(40),
            distance_m:      200.0,
            wait_ticks:      0,
            average_wait:    0.0,
            yields:          0,
            stops:           0,
            timeouts:        0,
            collisions:      0,
            violations:      0,
            replans:         0,
            total_reward:    20.0,
        }])
        .unwrap();
        w.finish().unwrap();

        // The writer is still alive: the row must already be on disk.
        let mut rdr = ::csv::Reader::from_path(dir.path().join("agent_metrics.csv")).unwrap();
        assert_eq!(rdr.records().count(), 1);
        drop(w);
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use rusqlite::Connection;
    use tempfile::TempDir;

    use crate::row::{AgentSnapshotRow, TickSummaryRow};
    use crate::sqlite::SqliteWriter;
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn sqlite_tables_created() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        let conn = Connection::open(dir.path().join("output.db")).unwrap();
        assert_eq!(count(&conn, "agent_snapshots"), 0);
        assert_eq!(count(&conn, "tick_summaries"), 0);
        assert_eq!(count(&conn, "agent_metrics"), 0);
    }

    #[test]
    fn sqlite_rows_written() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        let rows: Vec<_> = (0..3)
            .map(|i| AgentSnapshotRow {
                agent_id:    i,
                tick:        10,
                status:      "waiting",
                segment:     1,
                offset_m:    0.0,
                lane:        0,
                speed_mps:   0.0,
                accel_mps2:  0.0,
                reservation: None,
            })
            .collect();
        w.write_snapshots(&rows).unwrap();
        w.write_tick_summary(&TickSummaryRow { tick: 10, waiting: 3, ..Default::default() }).unwrap();
        w.finish().unwrap();

        let conn = Connection::open(dir.path().join("output.db")).unwrap();
        assert_eq!(count(&conn, "agent_snapshots"), 3);
        let waiting: i64 =
            conn.query_row("SELECT waiting FROM tick_summaries WHERE tick = 10", [], |r| r.get(0)).unwrap();
        assert_eq!(waiting, 3);
        let held: i64 = conn
            .query_row("SELECT COUNT(*) FROM agent_snapshots WHERE reservation IS NOT NULL", [], |r| r.get(0))
            .unwrap();
        assert_eq!(held, 0);
    }
}

#[cfg(test)]
mod observer_tests {
    use tf_agent::{AgentInit, Kinematics, VehicleSpec};
    use tf_core::Tick;
    use tf_network::{four_way, DijkstraRouter};
    use tf_policy::NoopPolicy;
    use tf_schedule::SpawnRequest;
    use tf_sim::{EngineConfig, SimBuilder};

    use crate::{CsvWriter, SimOutputObserver};

    #[test]
    fn run_writes_all_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let (net, fw) = four_way(100.0, 1, 10.0).unwrap();

        let mut config = EngineConfig::default();
        config.sim.total_ticks = 50;
        config.sim.output_interval_ticks = 10;

        let init = AgentInit {
            start:   Kinematics { segment: fw.inbound[0], offset_m: 0.0, lane: 0, speed_mps: 10.0 },
            goal:    fw.outbound[2],
            vehicle: VehicleSpec::default(),
        };
        let sim_config = config.sim.clone();
        let mut sim = SimBuilder::new(config, net, NoopPolicy, DijkstraRouter)
            .spawns(vec![SpawnRequest::new(Tick(0), init)])
            .build()
            .unwrap();

        let writer = CsvWriter::new(dir.path()).unwrap();
        let mut obs = SimOutputObserver::new(writer, &sim_config);
        sim.run(&mut obs).unwrap();
        obs.write_metrics(&sim.metrics);
        assert!(obs.take_error().is_none());

        let mut rdr = ::csv::Reader::from_path(dir.path().join("tick_summaries.csv")).unwrap();
        let summaries: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(summaries.len(), 50);
        assert_eq!(&summaries[49][1], "4900");

        // One live agent, snapshotted every 10 ticks.
        let mut rdr = ::csv::Reader::from_path(dir.path().join("agent_snapshots.csv")).unwrap();
        let snaps: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(snaps.len(), 5);
        assert!(snaps.iter().all(|r| &r[0] == "0"));

        let mut rdr = ::csv::Reader::from_path(dir.path().join("agent_metrics.csv")).unwrap();
        let metrics: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(metrics.len(), 1);
        assert_eq!(&metrics[0][1], "0");
    }
}

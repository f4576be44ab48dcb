//! End-to-end propagation runs over simulated clusters.

use proptest::prelude::*;
use tileflash_sim::{Cluster, Error, SimEvent, Simulation, SimulationConfig, TileId};
use tileflash_viral::{Program, ViralConfig};

fn run(cluster: Cluster, config: SimulationConfig) -> (Simulation, tileflash_sim::Report) {
    let mut sim = Simulation::new(cluster, config).unwrap();
    let report = sim.run();
    (sim, report)
}

/// Tiles that started a go flood themselves, and tiles that were handed one.
fn go_sources(sim: &Simulation) -> (Vec<TileId>, Vec<TileId>) {
    let (originated, received): (Vec<_>, Vec<_>) = sim
        .events()
        .iter()
        .filter_map(|e| match e {
            SimEvent::GoObserved { tile, originated, .. } => Some((*tile, *originated)),
            _ => None,
        })
        .partition(|(_, originated)| *originated);
    (
        originated.into_iter().map(|(t, _)| t).collect(),
        received.into_iter().map(|(t, _)| t).collect(),
    )
}

fn completed_at(sim: &Simulation, tile: TileId) -> Option<u64> {
    sim.events().iter().find_map(|e| match e {
        SimEvent::Completed { tile: t, at_ms } if *t == tile => Some(*at_ms),
        _ => None,
    })
}

#[test]
fn three_tile_line_runs_new_program_everywhere() {
    let (sim, report) = run(Cluster::line(3).unwrap(), SimulationConfig::fast().with_pages(4));

    assert!(report.all_staged(), "{report:#?}");
    assert!(report.all_go_observed());
    for tile in &report.tiles[1..] {
        assert!(tile.holds_program);
        assert_eq!(tile.pages, 4);
        assert_eq!(tile.flash_writes, 4);
        assert_eq!(tile.max_writes_per_page, 1);
    }
    // The root writes nothing; it already holds the program.
    assert_eq!(report.tile(TileId(0)).flash_writes, 0);

    let originated: Vec<(TileId, bool)> = sim
        .events()
        .iter()
        .filter_map(|e| match e {
            SimEvent::GoObserved { tile, originated, .. } => Some((*tile, *originated)),
            _ => None,
        })
        .collect();
    assert!(originated.contains(&(TileId(0), true)));
    assert!(originated.contains(&(TileId(1), false)));
    assert!(originated.contains(&(TileId(2), false)));
}

#[test]
fn chain_forms_along_the_line() {
    let (sim, _) = run(Cluster::line(4).unwrap(), SimulationConfig::fast().with_pages(2));

    let sources: Vec<(TileId, TileId)> = sim
        .events()
        .iter()
        .filter_map(|e| match e {
            SimEvent::Committed { tile, source, .. } => Some((*tile, *source)),
            _ => None,
        })
        .collect();
    assert_eq!(
        sources,
        vec![(TileId(1), TileId(0)), (TileId(2), TileId(1)), (TileId(3), TileId(2))]
    );
}

#[test]
fn root_waits_for_the_deepest_download() {
    let (sim, report) = run(Cluster::line(5).unwrap(), SimulationConfig::default().with_pages(6));

    assert!(report.all_staged());
    let last_completion = (1..5)
        .filter_map(|i| completed_at(&sim, TileId(i)))
        .max()
        .unwrap();
    let root_done = report.tile(TileId(0)).finished_at_ms.unwrap();
    assert!(root_done > last_completion);
}

#[test]
fn quiescence_climbs_the_chain() {
    let config = SimulationConfig::fast().with_pages(2);
    let retry = u64::from(config.viral.retry_interval_ms);
    let mut sim = Simulation::new(Cluster::line(3).unwrap(), config).unwrap();

    // First moment each tile's active window lapses after having been open.
    let mut armed = [false; 3];
    let mut expired_at = [None; 3];
    while !sim.is_finished() && sim.now_ms() < 5_000 {
        sim.step();
        for i in 0..3 {
            let active = sim.node(TileId(i)).timers().active;
            if !active.is_expired() {
                armed[i] = true;
            } else if armed[i] && expired_at[i].is_none() {
                expired_at[i] = Some(sim.now_ms());
            }
        }
    }

    let [root, relay, leaf] = expired_at.map(|t| t.unwrap());
    assert!(relay <= leaf + 2 * retry, "relay {relay} leaf {leaf}");
    assert!(root <= relay + 2 * retry, "root {root} relay {relay}");
    assert!(sim.report().all_staged());
}

#[test]
fn relays_finish_after_their_source() {
    let config = SimulationConfig::fast().with_pages(3);
    let (_, report) = run(Cluster::line(6).unwrap(), config);

    let finished: Vec<u64> = report.tiles.iter().map(|t| t.finished_at_ms.unwrap()).collect();
    for pair in finished.windows(2) {
        assert!(pair[0] < pair[1], "{finished:?}");
    }
}

#[test]
fn spiral_cluster_converges() {
    let config = SimulationConfig::fast().with_pages(5);
    let (sim, report) = run(Cluster::spiral(7).unwrap(), config);

    assert!(report.all_staged(), "{report:#?}");
    assert!(report.all_go_observed());
    assert_eq!(go_sources(&sim).0, vec![TileId(0)]);
    assert!(report.tiles.iter().all(|t| t.max_writes_per_page <= 1));
}

#[test]
fn go_from_the_root_reaches_every_ring() {
    let config = SimulationConfig::fast().with_pages(8);
    let (sim, report) = run(Cluster::spiral(19).unwrap(), config);

    assert_eq!(report.depth, Some(2));
    assert!(report.all_staged(), "{report:#?}");
    let (originated, mut received) = go_sources(&sim);
    assert_eq!(originated, vec![TileId(0)]);
    received.sort_by_key(|t| t.0);
    assert_eq!(received, (1..19).map(TileId).collect::<Vec<_>>());
}

#[test]
fn deep_line_waits_for_the_root() {
    // Quiescence takes far longer than one startup budget to climb eight
    // hops at the default timings.
    let config = SimulationConfig::default().with_pages(2);
    let (sim, report) = run(Cluster::line(9).unwrap(), config);

    assert_eq!(report.depth, Some(8));
    assert!(report.all_staged(), "{report:#?}");
    let (originated, received) = go_sources(&sim);
    assert_eq!(originated, vec![TileId(0)]);
    assert_eq!(received.len(), 8);

    let root_done = report.tile(TileId(0)).finished_at_ms.unwrap();
    let leaf_done = report.tile(TileId(8)).finished_at_ms.unwrap();
    assert!(leaf_done > root_done);
}

#[test]
fn unreadable_links_leave_listeners_on_their_old_program() {
    let config = SimulationConfig::fast().with_pages(2).with_corrupt_rate(1.0);
    let (sim, report) = run(Cluster::line(3).unwrap(), config);

    assert_eq!(report.tile(TileId(0)).outcome, Some(Program::Staged));
    for tile in &report.tiles[1..] {
        assert_eq!(tile.outcome, Some(Program::Fallback));
        assert_eq!(tile.flash_writes, 0);
        assert!(!tile.go_observed);
    }
    assert!(sim
        .events()
        .iter()
        .all(|e| !matches!(e, SimEvent::Committed { .. } | SimEvent::PageAccepted { .. })));
}

#[test]
fn unreachable_tile_falls_back() {
    use tileflash_topology::HexCoord;

    let cluster = Cluster::from_coords([HexCoord::ORIGIN, HexCoord::new(1, 0), HexCoord::new(4, 0)]).unwrap();
    let (_, report) = run(cluster, SimulationConfig::fast().with_pages(2));

    assert_eq!(report.tile(TileId(1)).outcome, Some(Program::Staged));
    assert_eq!(report.tile(TileId(2)).outcome, Some(Program::Fallback));
    assert_eq!(report.tile(TileId(2)).pages, 0);
    assert_eq!(report.depth, None);
}

#[test]
fn seeding_from_the_middle() {
    let config = SimulationConfig::fast().with_pages(3).with_root(2);
    let (_, report) = run(Cluster::line(5).unwrap(), config);

    assert!(report.all_staged());
    assert_eq!(report.tile(TileId(0)).total_pages, 3);
    assert_eq!(report.tile(TileId(4)).total_pages, 3);
}

#[test]
fn config_loads_from_json_file() {
    let path = std::env::temp_dir().join(format!("tileflash-sim-{}.json", std::process::id()));
    let viral = ViralConfig::fast();
    let config = SimulationConfig::default().with_seed(11).with_pages(3).with_viral(viral);
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = SimulationConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);

    assert!(matches!(
        SimulationConfig::load("/nonexistent/tileflash.json"),
        Err(Error::Io(_))
    ));
}

#[test]
fn event_log_survives_json_lines() {
    let config = SimulationConfig::fast().with_pages(2).with_loss_rate(0.05).with_seed(3);
    let (sim, _) = run(Cluster::spiral(4).unwrap(), config);

    let lines: Vec<String> = sim.events().iter().map(|e| serde_json::to_string(e).unwrap()).collect();
    let parsed: Vec<SimEvent> = lines.iter().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(parsed, sim.events());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Whatever the link does, nobody runs a program it does not fully
    // hold, and no page is written twice.
    #[test]
    fn lossy_links_never_stage_a_partial_program(
        seed in any::<u64>(),
        loss in 0.0f64..0.25,
        corrupt in 0.0f64..0.1,
        tiles in 2usize..8,
        pages in 1u8..6,
    ) {
        let config = SimulationConfig::fast()
            .with_seed(seed)
            .with_loss_rate(loss)
            .with_corrupt_rate(corrupt)
            .with_pages(pages);
        let (_, report) = run(Cluster::spiral(tiles).unwrap(), config);

        prop_assert_eq!(report.unfinished_count(), 0);
        prop_assert_eq!(report.tile(TileId(0)).outcome, Some(Program::Staged));
        for tile in &report.tiles {
            prop_assert!(tile.max_writes_per_page <= 1);
            if tile.outcome == Some(Program::Staged) {
                prop_assert!(tile.holds_program);
                prop_assert_eq!(tile.pages, pages);
                prop_assert!(tile.go_observed);
            }
        }
    }
}

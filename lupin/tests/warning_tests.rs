//! Parameter adjustments are reported through the `log` facade; this
//! binary installs its own logger to see the warnings.

use lupin::knn::build_knn;
use lupin::sam_common::*;
use lupin::simulate::{simulate_clustered_expression, SimArgs};
use lupin::*;

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::Mutex;

static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct CaptureWarnings;

impl Log for CaptureWarnings {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut warnings) = WARNINGS.lock() {
                warnings.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureWarnings = CaptureWarnings;

fn install_logger() {
    // several tests share the binary; only the first call installs it
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Warn);
}

fn warnings_containing(pattern: &str) -> usize {
    WARNINGS
        .lock()
        .map(|w| w.iter().filter(|msg| msg.contains(pattern)).count())
        .unwrap_or(0)
}

fn clamp_warnings(n_cells: usize) -> usize {
    warnings_containing(&format!("exceeds n_cells - 1 = {}", n_cells - 1))
}

#[test]
fn oversized_knn_is_clamped_in_a_run() -> anyhow::Result<()> {
    install_logger();

    let n_cells = 12;
    let xx = simulate_clustered_expression(&SimArgs {
        cells: n_cells,
        genes: 40,
        signal_genes: 4,
        groups: 2,
        seed: 3,
    })
    .expression;

    let params = SamParams {
        knn: Some(50),
        n_genes: Some(20),
        npcs: 5,
        num_norm_avg: 5,
        max_iter: 3,
        ..Default::default()
    };

    let out = run_sam(&xx, &params)?;

    assert_eq!(out.params.knn, n_cells - 1);
    assert!(out
        .nearest_neighbor_graph
        .row_sums()
        .iter()
        .all(|&s| s == (n_cells - 1) as f32));
    assert!(clamp_warnings(n_cells) >= 1);
    Ok(())
}

#[test]
fn oversized_knn_is_clamped_in_the_graph_builder() -> anyhow::Result<()> {
    install_logger();

    let n_cells = 6;
    let dist = Mat::from_fn(n_cells, n_cells, |i, j| (i as f32 - j as f32).abs());
    let graph = build_knn(&dist, 9)?;

    assert_eq!(graph.knn, n_cells - 1);
    assert!(graph.row_sums().iter().all(|&s| s == 5.0));
    assert!(clamp_warnings(n_cells) >= 1);
    Ok(())
}

#[test]
fn single_component_correlation_is_reported() -> anyhow::Result<()> {
    install_logger();

    let params = SamParams {
        npcs: 1,
        num_norm_avg: 2,
        ..Default::default()
    };
    let resolved = params.resolve(3, 4)?;
    assert_eq!(resolved.npcs, 1);
    assert!(warnings_containing("npcs = 1: correlation distance") >= 1);

    let params = SamParams {
        npcs: 1,
        num_norm_avg: 2,
        distance: "euclidean".into(),
        ..Default::default()
    };
    params.resolve(3, 4)?;
    assert_eq!(warnings_containing("npcs = 1: euclidean"), 0);
    Ok(())
}

pub mod config;
pub mod decode;
pub mod error;
pub mod lp_format;
pub mod model;
pub mod report;
pub mod solver;
pub mod types;

pub use config::{Bottleneck, Options, SolverConfig};
pub use decode::Solution;
pub use error::{ConfigurationError, DecodeError, Error, ModelError};
pub use model::AssignmentModel;
pub use solver::{Engine, SolveResult, SolveStatus};
pub use types::{Bin, Item, Problem};

use tracing::{info, warn};

impl Problem {
    /// Solve with the options embedded in the problem document.
    pub fn solve(&self) -> Result<Solution, Error> {
        solve(self, &self.options)
    }
}

/// Build the model, run the engine, and decode its answer.
///
/// An infeasible model is reported as [`Error::Infeasible`]; an engine that
/// ran and failed as [`Error::SolverUnavailable`].
pub fn solve(problem: &Problem, options: &Options) -> Result<Solution, Error> {
    let model = model::build(problem, options)?;
    let result = solver::solve(model.model(), options.engine, &options.solver_config())?;
    interpret(&result, &model)
}

/// Turn an engine's termination status into a decoded solution or an error.
fn interpret(result: &SolveResult, model: &AssignmentModel) -> Result<Solution, Error> {
    match result.status() {
        SolveStatus::Optimal => {
            let solution = decode::decode(result, model)?;
            info!(
                objective = %model.direction(),
                bottleneck = solution.bottleneck,
                "solved"
            );
            Ok(solution)
        }
        SolveStatus::Infeasible => {
            warn!("no assignment satisfies the constraints");
            Err(Error::Infeasible)
        }
        SolveStatus::Error => Err(Error::SolverUnavailable {
            engine: result.engine(),
            reason: result
                .message()
                .unwrap_or("engine reported an error")
                .to_string(),
        }),
        status => Err(Error::NotSolved { status }),
    }
}


#[cfg(all(test, feature = "microlp"))]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs::{read_dir, read_to_string};
    use std::path::Path;

    const EPS: f64 = 1e-6;

    #[derive(Deserialize)]
    struct Expectation {
        expected_bottleneck: Option<f64>,
        #[serde(default)]
        expect_infeasible: bool,
    }

    fn options() -> Options {
        Options::new().with_engine(Engine::Microlp)
    }

    /// Every item in exactly one known bin, loads recomputed from scratch,
    /// and the bottleneck equal to the max (or min) of those loads.
    fn assert_consistent(problem: &Problem, solution: &Solution) {
        assert_eq!(solution.assignment.len(), problem.items.len());
        for item in &problem.items {
            let bin = solution.bin_of(&item.id).expect("item is assigned");
            assert!(problem.bins.iter().any(|b| b.id == bin));
        }

        let loads: Vec<f64> = problem
            .bins
            .iter()
            .map(|bin| {
                problem
                    .items
                    .iter()
                    .filter(|item| solution.bin_of(&item.id) == Some(bin.id.as_str()))
                    .map(|item| item.weight)
                    .sum()
            })
            .collect();
        for (bin, load) in problem.bins.iter().zip(&loads) {
            assert!((solution.loads[&bin.id] - load).abs() < EPS);
        }

        let expected = match problem.options.objective {
            Bottleneck::Minimax => loads.iter().copied().fold(f64::MIN, f64::max),
            Bottleneck::Maximin => loads.iter().copied().fold(f64::MAX, f64::min),
        };
        assert!((solution.bottleneck - expected).abs() < EPS);
    }

    // Helper function to run a test from a test file
    fn run_test_file(test_file: &Path) {
        println!("Running test for file: {:?}", test_file);

        let failure_message = format!("Failed to read test file: {}", test_file.display());
        let yaml_content = read_to_string(test_file).expect(&failure_message);

        let failure_message = format!("Failed to parse test file: {}", test_file.display());
        let mut problem = Problem::from_yaml(&yaml_content).expect(&failure_message);
        let expectation: Expectation =
            serde_yaml::from_str(&yaml_content).expect(&failure_message);
        problem.options.engine = Engine::Microlp;

        let outcome = problem.solve();
        if expectation.expect_infeasible {
            assert_eq!(outcome, Err(Error::Infeasible), "{}", test_file.display());
            return;
        }

        let failure_message = format!("Failed to solve test file: {}", test_file.display());
        let solution = outcome.expect(&failure_message);
        assert_consistent(&problem, &solution);

        if let Some(expected) = expectation.expected_bottleneck {
            assert!(
                (solution.bottleneck - expected).abs() < EPS,
                "{}: expected {}, received {}",
                test_file.display(),
                expected,
                solution.bottleneck
            );
        }
    }

    #[test]
    fn run_all_test_files() {
        // Read all files from the test_data directory
        let test_data_dir = Path::new("test_data");
        let mut entries: Vec<_> = read_dir(test_data_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.is_file() && path.extension().map(|ext| ext == "yaml").unwrap_or(false)
            })
            .collect();

        // Sort paths lexically by filename
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in entries {
            run_test_file(&path);
        }
    }

    #[test]
    fn sixteen_boxes_three_trucks() {
        let weights = [
            34.0, 6.0, 8.0, 17.0, 16.0, 5.0, 13.0, 21.0, 25.0, 31.0, 14.0, 13.0, 33.0, 9.0, 25.0,
            25.0,
        ];
        let problem = Problem::from_weights(&weights, 3);
        let solution = solve(&problem, &options()).unwrap();

        assert_consistent(&problem, &solution);
        assert!((solution.bottleneck - 99.0).abs() < EPS);
        assert!(solution.loads.values().all(|&load| load <= 99.0 + EPS));
        let total: f64 = solution.loads.values().sum();
        assert!((total - problem.total_weight()).abs() < EPS);
        assert!((total - 295.0).abs() < EPS);
    }

    #[test]
    fn single_bin_takes_everything() {
        let problem = Problem::from_weights(&[3.0, 4.5, 2.5, 10.0], 1);
        let solution = solve(&problem, &options()).unwrap();
        assert!((solution.bottleneck - 20.0).abs() < EPS);
        assert!(solution.assignment.values().all(|bin| bin == "bin1"));
    }

    #[test]
    fn dominant_item_sets_the_bottleneck() {
        let problem = Problem::from_weights(&[40.0, 3.0, 7.0, 5.0, 9.0], 3);
        let solution = solve(&problem, &options()).unwrap();
        assert_consistent(&problem, &solution);
        assert!(solution.bottleneck >= 40.0 - EPS);
        assert!((solution.bottleneck - 40.0).abs() < EPS);

        // Nothing shares a bin with the heavy item
        let heavy_bin = solution.bin_of("item1").unwrap();
        assert_eq!(solution.items_in(heavy_bin).count(), 1);
    }

    #[test]
    fn heavier_item_never_lowers_the_bottleneck() {
        let base = [8.0, 6.0, 5.0, 4.0, 3.0, 2.0];
        let original = solve(&Problem::from_weights(&base, 2), &options())
            .unwrap()
            .bottleneck;
        assert!((original - 14.0).abs() < EPS);

        for i in 0..base.len() {
            for bump in [1.0, 4.0] {
                let mut weights = base;
                weights[i] += bump;
                let bumped = solve(&Problem::from_weights(&weights, 2), &options())
                    .unwrap()
                    .bottleneck;
                assert!(bumped >= original - EPS, "item {i} +{bump}");
            }
        }
    }

    #[test]
    fn maximin_balances_the_lightest_bin() {
        let mut problem = Problem::from_weights(&[5.0, 5.0, 4.0, 6.0], 2);
        problem.options = options().with_objective(Bottleneck::Maximin);
        let solution = problem.solve().unwrap();
        assert_consistent(&problem, &solution);
        assert!((solution.bottleneck - 10.0).abs() < EPS);
    }

    #[test]
    fn untightened_model_reaches_the_same_optimum() {
        let problem = Problem::from_weights(&[7.0, 5.0, 4.0, 4.0, 3.0, 1.0], 2);
        let tight = solve(&problem, &options()).unwrap();
        let loose = solve(&problem, &options().with_tightened_bounds(false)).unwrap();
        assert!((tight.bottleneck - 12.0).abs() < EPS);
        assert!((loose.bottleneck - 12.0).abs() < EPS);
    }

    #[test]
    fn enforced_capacities_can_make_it_infeasible() {
        let problem = Problem::new(
            vec![Item::new("crate", 10.0), Item::new("bag", 2.0)],
            vec![Bin::with_capacity("van", 5.0), Bin::with_capacity("car", 4.0)],
        );

        // Informational capacities are ignored
        let solution = solve(&problem, &options()).unwrap();
        assert!((solution.bottleneck - 10.0).abs() < EPS);

        let err = solve(&problem, &options().with_enforced_capacities(true)).unwrap_err();
        assert_eq!(err, Error::Infeasible);
        assert!(!err.is_fatal());
    }

    #[test]
    fn invalid_input_is_fatal_configuration_error() {
        let problem = Problem::from_weights(&[1.0, -2.0], 2);
        let err = solve(&problem, &options()).unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID_WEIGHT");
        assert!(err.is_fatal());
    }
}

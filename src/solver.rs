//! Hands a [`Model`] to a `good_lp` engine and reads back a [`SolveResult`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use tracing::info;

use crate::config::SolverConfig;
use crate::error::{ConfigurationError, Error, ModelError};
use crate::model::{Model, VarId};

/// The MILP engine a model is handed to. Each one sits behind a cargo feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Pure Rust branch and bound.
    Microlp,
    /// HiGHS.
    Highs,
    /// COIN-OR CBC.
    #[value(alias = "coin_cbc")]
    Cbc,
    /// GLPK through the external `glpsol` binary.
    Glpk,
}

impl Engine {
    pub const ALL: [Engine; 4] = [Engine::Microlp, Engine::Highs, Engine::Cbc, Engine::Glpk];

    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Microlp => "microlp",
            Engine::Highs => "highs",
            Engine::Cbc => "cbc",
            Engine::Glpk => "glpk",
        }
    }

    /// Whether this build can drive the engine at all.
    pub fn is_compiled(self) -> bool {
        match self {
            Engine::Microlp => cfg!(feature = "microlp"),
            Engine::Highs => cfg!(feature = "highs"),
            Engine::Cbc => cfg!(feature = "cbc"),
            Engine::Glpk => cfg!(feature = "glpk"),
        }
    }

    pub fn compiled() -> Vec<Engine> {
        Engine::ALL.into_iter().filter(|e| e.is_compiled()).collect()
    }
}

impl Default for Engine {
    /// The first compiled engine, in the order of [`Engine::ALL`].
    fn default() -> Self {
        Engine::compiled()
            .first()
            .copied()
            .unwrap_or(Engine::Microlp)
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Engine {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "microlp" => Ok(Engine::Microlp),
            "highs" => Ok(Engine::Highs),
            "cbc" | "coin_cbc" => Ok(Engine::Cbc),
            "glpk" => Ok(Engine::Glpk),
            _ => Err(ConfigurationError::UnknownEngine(s.to_string())),
        }
    }
}

/// How the engine terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// The engine ran but failed.
    Error,
    /// The engine stopped on a limit before proving optimality.
    TimeLimitReached,
}

impl SolveStatus {
    pub fn is_optimal(self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Error => "error",
            SolveStatus::TimeLimitReached => "time_limit",
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What came back from one engine run.
///
/// Objective and variable values exist only for [`SolveStatus::Optimal`];
/// the constructors make any other combination unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    engine: Engine,
    status: SolveStatus,
    objective: Option<f64>,
    values: Vec<f64>,
    message: Option<String>,
    solve_time_seconds: f64,
}

impl SolveResult {
    /// An optimal result; `values` is indexed by [`VarId::index`].
    pub fn optimal(engine: Engine, objective: f64, values: Vec<f64>) -> Self {
        SolveResult {
            engine,
            status: SolveStatus::Optimal,
            objective: Some(objective),
            values,
            message: None,
            solve_time_seconds: 0.0,
        }
    }

    /// A run that did not end optimal. Whatever values the engine had are dropped.
    pub fn terminated(engine: Engine, status: SolveStatus, message: Option<String>) -> Self {
        SolveResult {
            engine,
            status,
            objective: None,
            values: Vec::new(),
            message,
            solve_time_seconds: 0.0,
        }
    }

    fn with_solve_time(mut self, seconds: f64) -> Self {
        self.solve_time_seconds = seconds;
        self
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    pub fn objective(&self) -> Option<f64> {
        self.objective
    }

    /// The realized value of `var`, or `None` when the result is not optimal.
    pub fn value(&self, var: VarId) -> Option<f64> {
        if !self.is_optimal() {
            return None;
        }
        self.values.get(var.index()).copied()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn solve_time_seconds(&self) -> f64 {
        self.solve_time_seconds
    }
}

/// Solve `model` with `engine`.
///
/// Fails with [`Error::SolverUnavailable`] when the engine is not compiled
/// into this build. Engine-side failures come back as a result with
/// [`SolveStatus::Error`].
pub fn solve(model: &Model, engine: Engine, config: &SolverConfig) -> Result<SolveResult, Error> {
    if model.num_variables() == 0 {
        return Err(ModelError::EmptyModel.into());
    }
    if !engine.is_compiled() {
        return Err(unavailable(engine));
    }

    info!(
        engine = %engine,
        variables = model.num_variables(),
        constraints = model.num_constraints(),
        "solving"
    );

    let started = Instant::now();
    let result = backend::dispatch(model, engine, config)?
        .with_solve_time(started.elapsed().as_secs_f64());

    info!(
        engine = %engine,
        status = %result.status(),
        objective = ?result.objective(),
        seconds = result.solve_time_seconds(),
        "solve finished"
    );
    Ok(result)
}

fn unavailable(engine: Engine) -> Error {
    Error::SolverUnavailable {
        engine,
        reason: format!(
            "not compiled into this build (enable the `{}` feature)",
            engine.as_str()
        ),
    }
}

/// Translation to `good_lp`, present when at least one engine feature is on.
#[cfg(any(feature = "microlp", feature = "highs", feature = "cbc", feature = "glpk"))]
mod backend {
    use good_lp::Solution as LpSolution;
    use good_lp::{
        Constraint, Expression, ProblemVariables, ResolutionError, SolutionStatus, SolverModel,
        Variable, variable, variables,
    };
    use tracing::{debug, warn};

    use super::{Engine, SolveResult, SolveStatus, unavailable};
    use crate::config::SolverConfig;
    use crate::error::Error;
    use crate::model::{LinearConstraint, Model, Relation, Sense, VarId, VarKind, VariableDef};

    pub(super) fn dispatch(
        model: &Model,
        engine: Engine,
        config: &SolverConfig,
    ) -> Result<SolveResult, Error> {
        let (problem_vars, handles) = init_variables(model);
        let objective = linear_expression(&model.objective().terms, &handles);
        let unsolved = match model.objective().sense {
            Sense::Minimize => problem_vars.minimise(objective),
            Sense::Maximize => problem_vars.maximise(objective),
        };

        let result = match engine {
            #[cfg(feature = "microlp")]
            Engine::Microlp => {
                if config.time_limit.is_some() {
                    warn!(engine = %engine, "engine has no time limit; ignoring it");
                }
                run(engine, unsolved.using(good_lp::solvers::microlp::microlp), model, &handles)
            }
            #[cfg(feature = "highs")]
            Engine::Highs => {
                let mut solver_model = unsolved
                    .using(good_lp::solvers::highs::highs)
                    .set_verbose(config.verbose);
                if let Some(seconds) = config.time_limit {
                    solver_model = solver_model.set_time_limit(seconds);
                }
                run(engine, solver_model, model, &handles)
            }
            #[cfg(feature = "cbc")]
            Engine::Cbc => {
                let mut solver_model = unsolved.using(good_lp::solvers::coin_cbc::coin_cbc);
                if !config.verbose {
                    solver_model.set_parameter("loglevel", "0");
                }
                if let Some(seconds) = config.time_limit {
                    solver_model.set_parameter("seconds", &seconds.to_string());
                }
                run(engine, solver_model, model, &handles)
            }
            #[cfg(feature = "glpk")]
            Engine::Glpk => {
                use good_lp::solvers::lp_solvers::{GlpkSolver, LpSolver};
                if config.time_limit.is_some() {
                    warn!(engine = %engine, "engine has no time limit; ignoring it");
                }
                run(
                    engine,
                    unsolved.using(LpSolver(GlpkSolver::new())),
                    model,
                    &handles,
                )
            }
            // Only reachable when some engine features are off
            #[allow(unreachable_patterns)]
            other => return Err(unavailable(other)),
        };
        Ok(result)
    }

    /// Create one `good_lp` variable per model variable, in [`VarId`] order.
    fn init_variables(model: &Model) -> (ProblemVariables, Vec<Variable>) {
        let mut problem_vars = variables!();
        let handles = model
            .variables()
            .iter()
            .map(|def| problem_vars.add(variable_definition(def)))
            .collect();
        (problem_vars, handles)
    }

    fn variable_definition(def: &VariableDef) -> good_lp::VariableDefinition {
        let definition = variable().name(def.name.clone());
        match def.kind {
            VarKind::Binary => definition.binary(),
            VarKind::Integer => with_bounds(definition.integer(), def),
            VarKind::Continuous => with_bounds(definition, def),
        }
    }

    fn with_bounds(
        mut definition: good_lp::VariableDefinition,
        def: &VariableDef,
    ) -> good_lp::VariableDefinition {
        if def.lower.is_finite() {
            definition = definition.min(def.lower);
        }
        if def.upper.is_finite() {
            definition = definition.max(def.upper);
        }
        definition
    }

    fn linear_expression(terms: &[(VarId, f64)], handles: &[Variable]) -> Expression {
        terms.iter().fold(Expression::from(0.0), |sum, &(var, coefficient)| {
            sum + handles[var.index()] * coefficient
        })
    }

    fn to_constraint(constraint: &LinearConstraint, handles: &[Variable]) -> Constraint {
        let lhs = linear_expression(&constraint.terms, handles);
        match constraint.relation {
            Relation::Eq => lhs.eq(constraint.rhs),
            Relation::Leq => lhs.leq(constraint.rhs),
            Relation::Geq => lhs.geq(constraint.rhs),
        }
    }

    /// Add every constraint, solve, and turn the engine's answer into a [`SolveResult`].
    fn run<M>(engine: Engine, solver_model: M, model: &Model, handles: &[Variable]) -> SolveResult
    where
        M: SolverModel<Error = ResolutionError>,
    {
        let solver_model = model
            .constraints()
            .iter()
            .fold(solver_model, |m, c| m.with(to_constraint(c, handles)));

        match solver_model.solve() {
            Ok(solution) => {
                let status = match solution.status() {
                    SolutionStatus::Optimal => SolveStatus::Optimal,
                    // Any early stop: the incumbent is not proven optimal
                    _ => SolveStatus::TimeLimitReached,
                };
                if !status.is_optimal() {
                    return SolveResult::terminated(engine, status, None);
                }
                let values: Vec<f64> = handles.iter().map(|&v| solution.value(v)).collect();
                let objective = model
                    .objective()
                    .terms
                    .iter()
                    .map(|&(var, coefficient)| values[var.index()] * coefficient)
                    .sum();
                debug!(objective, "engine returned an optimal solution");
                SolveResult::optimal(engine, objective, values)
            }
            Err(ResolutionError::Infeasible) => {
                SolveResult::terminated(engine, SolveStatus::Infeasible, None)
            }
            Err(ResolutionError::Unbounded) => {
                SolveResult::terminated(engine, SolveStatus::Unbounded, None)
            }
            Err(err) => {
                warn!(engine = %engine, error = %err, "engine failed");
                SolveResult::terminated(engine, SolveStatus::Error, Some(err.to_string()))
            }
        }
    }
}

#[cfg(not(any(feature = "microlp", feature = "highs", feature = "cbc", feature = "glpk")))]
mod backend {
    use super::{Engine, SolveResult, unavailable};
    use crate::config::SolverConfig;
    use crate::error::Error;
    use crate::model::Model;

    pub(super) fn dispatch(
        _model: &Model,
        engine: Engine,
        _config: &SolverConfig,
    ) -> Result<SolveResult, Error> {
        Err(unavailable(engine))
    }
}

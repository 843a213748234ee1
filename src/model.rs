//! Engine-neutral MILP description and the bottleneck assignment builder.

use tracing::debug;

use crate::config::{Bottleneck, Options};
use crate::error::{Error, ModelError};
use crate::types::{Bin, Item, Problem};

/// Handle of a variable inside a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer,
    Continuous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

impl VariableDef {
    pub fn binary(name: impl Into<String>) -> Self {
        VariableDef {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        }
    }

    pub fn continuous(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        VariableDef {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
        }
    }

    pub fn integer(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        VariableDef {
            name: name.into(),
            kind: VarKind::Integer,
            lower,
            upper,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Leq,
    Geq,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Leq => "<=",
            Relation::Geq => ">=",
        }
    }
}

/// `Σ coefficient * variable  <relation>  rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        relation: Relation,
        rhs: f64,
    ) -> Self {
        LinearConstraint {
            name: name.into(),
            terms,
            relation,
            rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: Sense,
    pub terms: Vec<(VarId, f64)>,
}

/// A mixed-integer linear program owned as plain data.
///
/// Constraints are appended one descriptor at a time; the model only checks
/// that every term points at one of its own variables and that numbers are
/// finite. Translating it for a concrete engine is the job of
/// [`crate::solver`].
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    variables: Vec<VariableDef>,
    constraints: Vec<LinearConstraint>,
    objective: Objective,
}

impl Model {
    /// An empty model with a zero objective in the given sense.
    pub fn new(sense: Sense) -> Self {
        Model {
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: Objective {
                sense,
                terms: Vec::new(),
            },
        }
    }

    pub fn add_variable(&mut self, variable: VariableDef) -> Result<VarId, ModelError> {
        if variable.lower.is_nan() || variable.upper.is_nan() || variable.lower > variable.upper {
            return Err(ModelError::InvalidBounds {
                name: variable.name,
                lower: variable.lower,
                upper: variable.upper,
            });
        }
        let id = VarId(self.variables.len());
        self.variables.push(variable);
        Ok(id)
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) -> Result<(), ModelError> {
        self.check_terms(&constraint.name, &constraint.terms)?;
        if !constraint.rhs.is_finite() {
            return Err(ModelError::InvalidCoefficient {
                name: constraint.name,
                value: constraint.rhs,
            });
        }
        self.constraints.push(constraint);
        Ok(())
    }

    pub fn set_objective(&mut self, objective: Objective) -> Result<(), ModelError> {
        self.check_terms("objective", &objective.terms)?;
        self.objective = objective;
        Ok(())
    }

    fn check_terms(&self, name: &str, terms: &[(VarId, f64)]) -> Result<(), ModelError> {
        for &(var, coefficient) in terms {
            if var.0 >= self.variables.len() {
                return Err(ModelError::InvalidVariableId(var));
            }
            if !coefficient.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    name: name.to_string(),
                    value: coefficient,
                });
            }
        }
        Ok(())
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> Option<&VariableDef> {
        self.variables.get(id.0)
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

/// The bottleneck model for one [`Problem`], with the variable lookup needed to decode it.
#[derive(Debug, Clone)]
pub struct AssignmentModel {
    model: Model,
    items: Vec<Item>,
    bins: Vec<Bin>,
    // Row-major: item i, bin n → assign[i * bins.len() + n]
    assign: Vec<VarId>,
    bottleneck: VarId,
    direction: Bottleneck,
}

impl AssignmentModel {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// The binary indicator for placing item `item` in bin `bin` (both by position).
    pub fn assign_var(&self, item: usize, bin: usize) -> VarId {
        self.assign[item * self.bins.len() + bin]
    }

    pub fn bottleneck_var(&self) -> VarId {
        self.bottleneck
    }

    pub fn direction(&self) -> Bottleneck {
        self.direction
    }
}

/// Build the MILP for `problem`.
///
/// One binary per (item, bin) pair, one continuous `W >= 0`, objective on `W`,
/// one assignment row per item and one load row per bin.
pub fn build(problem: &Problem, options: &Options) -> Result<AssignmentModel, Error> {
    problem.validate()?;
    options.validate()?;

    let items = &problem.items;
    let bins = &problem.bins;
    let direction = options.objective;

    let sense = match direction {
        Bottleneck::Minimax => Sense::Minimize,
        Bottleneck::Maximin => Sense::Maximize,
    };
    let mut model = Model::new(sense);

    let assign = init_variables(&mut model, items, bins)?;

    let (lower, upper) = if options.tighten_bounds {
        bottleneck_bounds(items, bins.len(), direction)
    } else {
        (0.0, f64::INFINITY)
    };
    let bottleneck = model.add_variable(VariableDef::continuous("W", lower, upper))?;
    model.set_objective(Objective {
        sense,
        terms: vec![(bottleneck, 1.0)],
    })?;

    let columns = bins.len();
    constrain_each_item_to_one_bin(&mut model, items, &assign, columns)?;
    constrain_bin_loads(&mut model, items, bins, &assign, bottleneck, direction)?;
    if options.enforce_capacities {
        constrain_bin_capacities(&mut model, items, bins, &assign)?;
    }

    debug!(
        items = items.len(),
        bins = bins.len(),
        variables = model.num_variables(),
        constraints = model.num_constraints(),
        objective = %direction,
        "built bottleneck model"
    );

    Ok(AssignmentModel {
        model,
        items: items.clone(),
        bins: bins.clone(),
        assign,
        bottleneck,
        direction,
    })
}

fn init_variables(model: &mut Model, items: &[Item], bins: &[Bin]) -> Result<Vec<VarId>, Error> {
    let mut assign = Vec::with_capacity(items.len() * bins.len());
    for item in items {
        for bin in bins {
            let name = format!("x[{},{}]", item.id, bin.id);
            assign.push(model.add_variable(VariableDef::binary(name))?);
        }
    }
    Ok(assign)
}

/// Bounds on `W` that every optimal solution satisfies.
///
/// The heaviest bin carries at least the average load and at least the
/// heaviest item; the lightest carries at most the average. With integral
/// weights every load is integral, so the average can be rounded.
fn bottleneck_bounds(items: &[Item], bins: usize, direction: Bottleneck) -> (f64, f64) {
    let total: f64 = items.iter().map(|item| item.weight).sum();
    let average = total / bins as f64;
    let integral = items.iter().all(|item| item.weight.fract() == 0.0);

    match direction {
        Bottleneck::Minimax => {
            let heaviest = items.iter().map(|item| item.weight).fold(0.0, f64::max);
            let average = if integral { average.ceil() } else { average };
            (heaviest.max(average), f64::INFINITY)
        }
        Bottleneck::Maximin => {
            let average = if integral { average.floor() } else { average };
            (0.0, average)
        }
    }
}

fn constrain_each_item_to_one_bin(
    model: &mut Model,
    items: &[Item],
    assign: &[VarId],
    columns: usize,
) -> Result<(), Error> {
    for (i, item) in items.iter().enumerate() {
        let terms = assign[i * columns..(i + 1) * columns]
            .iter()
            .map(|&x| (x, 1.0))
            .collect();
        model.add_constraint(LinearConstraint::new(
            format!("assign[{}]", item.id),
            terms,
            Relation::Eq,
            1.0,
        ))?;
    }
    Ok(())
}

fn bin_load_terms(items: &[Item], assign: &[VarId], columns: usize, n: usize) -> Vec<(VarId, f64)> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (assign[i * columns + n], item.weight))
        .collect()
}

fn constrain_bin_loads(
    model: &mut Model,
    items: &[Item],
    bins: &[Bin],
    assign: &[VarId],
    bottleneck: VarId,
    direction: Bottleneck,
) -> Result<(), Error> {
    let relation = match direction {
        Bottleneck::Minimax => Relation::Leq,
        Bottleneck::Maximin => Relation::Geq,
    };
    for (n, bin) in bins.iter().enumerate() {
        // load_n - W <= 0  (>= 0 for maximin)
        let mut terms = bin_load_terms(items, assign, bins.len(), n);
        terms.push((bottleneck, -1.0));
        model.add_constraint(LinearConstraint::new(
            format!("load[{}]", bin.id),
            terms,
            relation,
            0.0,
        ))?;
    }
    Ok(())
}

fn constrain_bin_capacities(
    model: &mut Model,
    items: &[Item],
    bins: &[Bin],
    assign: &[VarId],
) -> Result<(), Error> {
    for (n, bin) in bins.iter().enumerate() {
        if let Some(capacity) = bin.capacity {
            model.add_constraint(LinearConstraint::new(
                format!("capacity[{}]", bin.id),
                bin_load_terms(items, assign, bins.len(), n),
                Relation::Leq,
                capacity,
            ))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;

    fn boxes() -> Problem {
        Problem::from_weights(&[4.0, 7.0, 2.0], 2)
    }

    #[test]
    fn test_model_rejects_unknown_variable() {
        let mut model = Model::new(Sense::Minimize);
        let x = model.add_variable(VariableDef::binary("x")).unwrap();
        let err = model
            .add_constraint(LinearConstraint::new(
                "c",
                vec![(x, 1.0), (VarId(5), 1.0)],
                Relation::Leq,
                1.0,
            ))
            .unwrap_err();
        assert_eq!(err, ModelError::InvalidVariableId(VarId(5)));
    }

    #[test]
    fn test_model_rejects_bad_numbers() {
        let mut model = Model::new(Sense::Minimize);
        let err = model
            .add_variable(VariableDef::continuous("y", 3.0, 1.0))
            .unwrap_err();
        assert_eq!(err.code(), "VARIABLE_INVALID_BOUNDS");

        let x = model.add_variable(VariableDef::integer("x", 0.0, 9.0)).unwrap();
        let err = model
            .add_constraint(LinearConstraint::new(
                "c",
                vec![(x, f64::NAN)],
                Relation::Eq,
                1.0,
            ))
            .unwrap_err();
        assert_eq!(err.code(), "COEFFICIENT_INVALID");

        let err = model
            .add_constraint(LinearConstraint::new(
                "d",
                vec![(x, 1.0)],
                Relation::Eq,
                f64::INFINITY,
            ))
            .unwrap_err();
        assert_eq!(err.code(), "COEFFICIENT_INVALID");
    }

    #[test]
    fn test_build_shape() {
        let problem = boxes();
        let built = build(&problem, &Options::new().with_tightened_bounds(false)).unwrap();
        let model = built.model();

        // 3 items x 2 bins + W
        assert_eq!(model.num_variables(), 7);
        // 3 assignment rows + 2 load rows
        assert_eq!(model.num_constraints(), 5);
        assert_eq!(model.objective().sense, Sense::Minimize);
        assert_eq!(model.objective().terms, vec![(built.bottleneck_var(), 1.0)]);

        for i in 0..3 {
            for n in 0..2 {
                let def = model.variable(built.assign_var(i, n)).unwrap();
                assert_eq!(def.kind, VarKind::Binary);
            }
        }

        let w = model.variable(built.bottleneck_var()).unwrap();
        assert_eq!(w.kind, VarKind::Continuous);
        assert_eq!(w.lower, 0.0);
        assert_eq!(w.upper, f64::INFINITY);
    }

    #[test]
    fn test_build_assignment_and_load_rows() {
        let problem = boxes();
        let built = build(&problem, &Options::new()).unwrap();
        let constraints = built.model().constraints();

        let assign = &constraints[1];
        assert_eq!(assign.name, "assign[item2]");
        assert_eq!(assign.relation, Relation::Eq);
        assert_eq!(assign.rhs, 1.0);
        assert_eq!(
            assign.terms,
            vec![(built.assign_var(1, 0), 1.0), (built.assign_var(1, 1), 1.0)]
        );

        let load = &constraints[4];
        assert_eq!(load.name, "load[bin2]");
        assert_eq!(load.relation, Relation::Leq);
        assert_eq!(load.rhs, 0.0);
        assert_eq!(
            load.terms,
            vec![
                (built.assign_var(0, 1), 4.0),
                (built.assign_var(1, 1), 7.0),
                (built.assign_var(2, 1), 2.0),
                (built.bottleneck_var(), -1.0),
            ]
        );
    }

    #[test]
    fn test_build_maximin_flips_sense_and_rows() {
        let problem = boxes();
        let options = Options::new().with_objective(Bottleneck::Maximin);
        let built = build(&problem, &options).unwrap();
        let model = built.model();

        assert_eq!(model.objective().sense, Sense::Maximize);
        assert_eq!(built.direction(), Bottleneck::Maximin);
        assert!(
            model.constraints()[3..]
                .iter()
                .all(|c| c.relation == Relation::Geq)
        );

        // total 13 over 2 bins, integral weights → W <= 6
        let w = model.variable(built.bottleneck_var()).unwrap();
        assert_eq!((w.lower, w.upper), (0.0, 6.0));
    }

    #[test]
    fn test_tightened_lower_bound() {
        // total 13 over 2 bins → ceil(6.5) = 7, heaviest item 7
        let built = build(&boxes(), &Options::new()).unwrap();
        let w = built.model().variable(built.bottleneck_var()).unwrap();
        assert_eq!(w.lower, 7.0);

        // One dominant item sets the bound
        let problem = Problem::from_weights(&[50.0, 1.0, 2.0], 3);
        let built = build(&problem, &Options::new()).unwrap();
        let w = built.model().variable(built.bottleneck_var()).unwrap();
        assert_eq!(w.lower, 50.0);

        // Fractional weights keep the exact average
        let problem = Problem::from_weights(&[0.5, 0.25], 2);
        let built = build(&problem, &Options::new()).unwrap();
        let w = built.model().variable(built.bottleneck_var()).unwrap();
        assert_eq!(w.lower, 0.5);
    }

    #[test]
    fn test_capacities_only_when_enforced() {
        let problem = Problem::new(
            vec![Item::new("a", 3.0), Item::new("b", 5.0)],
            vec![Bin::with_capacity("x", 6.0), Bin::new("y")],
        );

        let built = build(&problem, &Options::new()).unwrap();
        assert_eq!(built.model().num_constraints(), 4);

        let built = build(&problem, &Options::new().with_enforced_capacities(true)).unwrap();
        let constraints = built.model().constraints();
        // Bin "y" has no capacity, so only one extra row
        assert_eq!(constraints.len(), 5);
        let capacity = &constraints[4];
        assert_eq!(capacity.name, "capacity[x]");
        assert_eq!(capacity.relation, Relation::Leq);
        assert_eq!(capacity.rhs, 6.0);
        assert_eq!(capacity.terms.len(), 2);
    }

    #[test]
    fn test_build_rejects_invalid_problem() {
        let problem = Problem::from_weights(&[1.0, -1.0], 2);
        let err = build(&problem, &Options::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::InvalidWeight { .. })
        ));
        assert!(err.is_fatal());

        let problem = Problem::from_weights(&[1.0], 0);
        let err = build(&problem, &Options::new()).unwrap_err();
        assert_eq!(err, Error::Configuration(ConfigurationError::NoBins));
    }
}

//! CPLEX LP text export, readable by `glpsol --lp`, HiGHS and CBC.

use std::collections::BTreeSet;
use std::fmt::{self, Write};

use crate::model::{Model, Sense, VarId, VarKind};

/// CPLEX LP caps line length; long rows are wrapped.
const MAX_TERMS_PER_LINE: usize = 8;

/// Displays a [`Model`] in CPLEX LP format.
pub struct LpFormat<'a>(&'a Model);

impl fmt::Display for LpFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_lp(self.0, f)
    }
}

impl Model {
    pub fn lp_format(&self) -> LpFormat<'_> {
        LpFormat(self)
    }

    /// The model in CPLEX LP format.
    pub fn to_lp_string(&self) -> String {
        self.lp_format().to_string()
    }
}

pub fn write_lp<W: Write>(model: &Model, out: &mut W) -> fmt::Result {
    let names = lp_names(model);

    writeln!(out, "\\ bottleneck assignment model")?;
    match model.objective().sense {
        Sense::Minimize => writeln!(out, "Minimize")?,
        Sense::Maximize => writeln!(out, "Maximize")?,
    }
    write!(out, " obj:")?;
    write_terms(out, &model.objective().terms, &names)?;
    writeln!(out)?;

    writeln!(out, "Subject To")?;
    for (row, constraint) in model.constraints().iter().enumerate() {
        write!(out, " c{}:", row + 1)?;
        write_terms(out, &constraint.terms, &names)?;
        writeln!(
            out,
            " {} {}",
            constraint.relation.symbol(),
            number(constraint.rhs)
        )?;
    }

    writeln!(out, "Bounds")?;
    for (def, name) in model.variables().iter().zip(&names) {
        if def.kind == VarKind::Binary {
            continue;
        }
        match (def.lower.is_finite(), def.upper.is_finite()) {
            (true, true) => writeln!(
                out,
                " {} <= {} <= {}",
                number(def.lower),
                name,
                number(def.upper)
            )?,
            (true, false) if def.lower != 0.0 => {
                writeln!(out, " {} >= {}", name, number(def.lower))?
            }
            (true, false) => {}
            (false, true) => writeln!(out, " -inf <= {} <= {}", name, number(def.upper))?,
            (false, false) => writeln!(out, " {} free", name)?,
        }
    }

    write_section(out, "General", model, &names, VarKind::Integer)?;
    write_section(out, "Binary", model, &names, VarKind::Binary)?;
    writeln!(out, "End")
}

fn write_section<W: Write>(
    out: &mut W,
    heading: &str,
    model: &Model,
    names: &[String],
    kind: VarKind,
) -> fmt::Result {
    let mut members = model
        .variables()
        .iter()
        .zip(names)
        .filter(|(def, _)| def.kind == kind)
        .map(|(_, name)| name)
        .peekable();
    if members.peek().is_none() {
        return Ok(());
    }
    writeln!(out, "{heading}")?;
    for name in members {
        writeln!(out, " {name}")?;
    }
    Ok(())
}

fn write_terms<W: Write>(out: &mut W, terms: &[(VarId, f64)], names: &[String]) -> fmt::Result {
    if terms.is_empty() {
        return write!(out, " 0 {}", names.first().map(String::as_str).unwrap_or("x"));
    }
    for (k, &(var, coefficient)) in terms.iter().enumerate() {
        if k > 0 && k % MAX_TERMS_PER_LINE == 0 {
            write!(out, "\n   ")?;
        }
        let sign = if coefficient < 0.0 { "-" } else { "+" };
        let magnitude = coefficient.abs();
        let name = &names[var.index()];
        match (k, magnitude == 1.0) {
            (0, true) if sign == "+" => write!(out, " {name}")?,
            (0, false) if sign == "+" => write!(out, " {} {name}", number(magnitude))?,
            (_, true) => write!(out, " {sign} {name}")?,
            (_, false) => write!(out, " {sign} {} {name}", number(magnitude))?,
        }
    }
    Ok(())
}

fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// LP-safe names for every variable. If sanitizing makes two names collide,
/// every variable falls back to a positional `v<index>` name.
fn lp_names(model: &Model) -> Vec<String> {
    let names: Vec<String> = model
        .variables()
        .iter()
        .map(|def| sanitize(&def.name))
        .collect();
    let unique: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    if unique.len() == names.len() {
        names
    } else {
        (0..names.len()).map(|i| format!("v{i}")).collect()
    }
}

fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    while out.ends_with('_') {
        out.pop();
    }
    // Names may not start with a digit or a period
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        out.insert(0, 'v');
    }
    out
}

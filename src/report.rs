//! Human-readable and machine-readable reports of a decoded [`Solution`].

use clap::ValueEnum;
use serde::Serialize;
use std::fmt::{self, Write};
use std::str::FromStr;

use crate::decode::Solution;
use crate::error::{ConfigurationError, Error};
use crate::types::Problem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Yaml,
    Json,
}

impl FromStr for Format {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "yaml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(ConfigurationError::InvalidArgument(format!(
                "unknown format '{s}' (expected text, yaml or json)"
            ))),
        }
    }
}

#[derive(Serialize)]
struct Document<'a> {
    solution: &'a Solution,
}

pub fn render(problem: &Problem, solution: &Solution, format: Format) -> Result<String, Error> {
    let rendered = match format {
        Format::Text => text(problem, solution).map_err(|err| err.to_string()),
        Format::Yaml => {
            serde_yaml::to_string(&Document { solution }).map_err(|err| err.to_string())
        }
        Format::Json => {
            serde_json::to_string_pretty(&Document { solution }).map_err(|err| err.to_string())
        }
    };
    rendered.map_err(|reason| Error::Output {
        target: "report".to_string(),
        reason,
    })
}

/// One block per bin in input order, then the bottleneck line.
fn text(problem: &Problem, solution: &Solution) -> Result<String, fmt::Error> {
    let mut out = String::new();

    for bin in &problem.bins {
        let load = solution.loads.get(&bin.id).copied().unwrap_or(0.0);
        match bin.capacity {
            Some(capacity) => writeln!(out, "{}: load {} / capacity {}", bin.id, load, capacity)?,
            None => writeln!(out, "{}: load {}", bin.id, load)?,
        }
        // Input order rather than identifier order
        for item in problem
            .items
            .iter()
            .filter(|item| solution.bin_of(&item.id) == Some(bin.id.as_str()))
        {
            writeln!(out, "  {} ({})", item.id, item.weight)?;
        }
    }

    writeln!(
        out,
        "{}: {}",
        problem.options.objective, solution.bottleneck
    )?;
    Ok(out)
}

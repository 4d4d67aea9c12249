//! Parameter files: `name = value` per line.
//!
//! Input files carry the initial guess for the tunable parameters and the
//! auxiliary constants. The fitted-parameter file written at the end of a run
//! uses the same line format, with tunable names upper-cased and `dt`,
//! `cvert` and `bt` appended.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::domain::{AuxParameters, ParameterSchema, ParameterSet, TunableParameters};
use crate::error::AppError;

/// Parse a parameter file body against `schema`.
///
/// Blank lines and lines starting with `#` are skipped. Names are trimmed and
/// matched case-insensitively.
pub fn parse_parameters(text: &str, schema: &ParameterSchema) -> Result<ParameterSet, AppError> {
    let mut tuned: BTreeMap<String, f64> = BTreeMap::new();
    let mut aux: BTreeMap<String, f64> = BTreeMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((name, value)) = line.split_once('=') else {
            return Err(AppError::config(format!(
                "Line {line_no}: expected `name = value`, got `{line}`."
            )));
        };
        let name = name.trim().to_ascii_lowercase();
        let value: f64 = value.trim().parse().map_err(|_| {
            AppError::config(format!("Line {line_no}: `{}` is not a number.", value.trim()))
        })?;

        if schema.tuned.contains(&name) {
            tuned.insert(name, value);
        } else if schema.aux_keys.contains(&name) {
            aux.insert(name, value);
        } else {
            return Err(AppError::config(format!("Read invalid item `{name}` on line {line_no}.")));
        }
    }

    let missing: BTreeSet<&str> = schema
        .aux_keys
        .iter()
        .filter(|k| !aux.contains_key(k.as_str()))
        .map(|k| k.as_str())
        .collect();
    if !missing.is_empty() {
        let list: Vec<&str> = missing.into_iter().collect();
        return Err(AppError::config(format!(
            "Missing required keys: {}.",
            list.join(", ")
        )));
    }

    if schema.tuned.len() != TunableParameters::LEN {
        return Err(AppError::config(format!(
            "Parameter schema names {} tunable parameters; the model has {}.",
            schema.tuned.len(),
            TunableParameters::LEN
        )));
    }
    let mut values = [0.0; TunableParameters::LEN];
    for (slot, name) in values.iter_mut().zip(schema.tuned.iter()) {
        match tuned.get(name) {
            Some(v) if *v != 0.0 => *slot = *v,
            Some(_) => {
                return Err(AppError::config(format!(
                    "Parameter `{name}` must be non-zero (it is used as a divisor)."
                )));
            }
            None => return Err(AppError::config(format!("Missing tunable parameter `{name}`."))),
        }
    }

    let field = |key: &str| {
        aux.get(key).copied().ok_or_else(|| {
            AppError::config(format!("Parameter schema does not provide the `{key}` constant."))
        })
    };
    Ok(ParameterSet {
        guess: TunableParameters::from_array(values),
        aux: AuxParameters {
            dt: 0.0,
            cvert: 0.0,
            c3: field("c3")?,
            r: field("r")?,
            dt_min: field("dt_min")?,
            dt_max: field("dt_max")?,
            optimization_left_cutoff: field("optimization_left_cutoff")?,
            optimization_right_cutoff: field("optimization_right_cutoff")?,
            graph_left_cutoff: field("graph_left_cutoff")?,
            graph_right_cutoff: field("graph_right_cutoff")?,
        },
    })
}

/// Read and parse a parameter file.
pub fn read_parameter_file(path: &Path, schema: &ParameterSchema) -> Result<ParameterSet, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("Failed to read parameter file '{}': {e}", path.display())))?;
    parse_parameters(&text, schema)
}

/// `name = value` lines for display: tunable parameters first, then the
/// auxiliary keys in sorted order.
pub fn describe_parameters(set: &ParameterSet, schema: &ParameterSchema) -> Vec<String> {
    let mut lines: Vec<String> = schema
        .tuned
        .iter()
        .zip(set.guess.to_array())
        .map(|(name, v)| format!("{name} = {v}"))
        .collect();
    lines.extend(sorted_aux(&set.aux, schema).map(|(k, v)| format!("{k} = {v}")));
    lines
}

fn sorted_aux<'a>(aux: &'a AuxParameters, schema: &'a ParameterSchema) -> impl Iterator<Item = (&'a str, f64)> + 'a {
    let keys: BTreeSet<&str> = schema.aux_keys.iter().map(|k| k.as_str()).collect();
    keys.into_iter().filter_map(move |k| aux.get(k).map(|v| (k, v)))
}

/// Render the fitted-parameter file body.
pub fn format_fitted_parameters(
    params: &TunableParameters,
    aux: &AuxParameters,
    bt: f64,
    schema: &ParameterSchema,
) -> String {
    let mut out = String::new();
    for (name, v) in schema.tuned.iter().zip(params.to_array()) {
        out.push_str(&format!("{} = {v}\n", name.to_ascii_uppercase()));
    }
    for (k, v) in sorted_aux(aux, schema) {
        out.push_str(&format!("{k} = {v}\n"));
    }
    out.push_str(&format!("dt = {}\n", aux.dt));
    out.push_str(&format!("cvert = {}\n", aux.cvert));
    out.push_str(&format!("bt = {bt}\n"));
    out
}

/// Write the fitted-parameter file, overwriting any existing file.
pub fn write_fitted_parameters(
    path: &Path,
    params: &TunableParameters,
    aux: &AuxParameters,
    bt: f64,
    schema: &ParameterSchema,
) -> Result<(), AppError> {
    let mut file = fs::File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create '{}': {e}", path.display())))?;
    file.write_all(format_fitted_parameters(params, aux, bt, schema).as_bytes())
        .map_err(|e| AppError::config(format!("Failed to write '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_CONFIG;

    const GOOD: &str = "\
# initial guess
K1 = 0.5
n0 = 10
N1= 20
n2 =50

dt_min = 0
dt_max = 40
c3 = 1
r = 1
graph_left_cutoff = 0
graph_right_cutoff = 100
optimization_left_cutoff = 5
optimization_right_cutoff = 100
";

    #[test]
    fn parses_mixed_case_names_and_comments() {
        let set = parse_parameters(GOOD, &ParameterSchema::default()).unwrap();
        assert_eq!(set.guess, TunableParameters::new(0.5, 10.0, 20.0, 50.0));
        assert_eq!(set.aux.dt_max, 40.0);
        assert_eq!(set.aux.optimization_left_cutoff, 5.0);
        assert_eq!(set.aux.dt, 0.0);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let text = format!("{GOOD}bogus = 1\n");
        let err = parse_parameters(&text, &ParameterSchema::default()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
        assert!(err.message().contains("bogus"));
    }

    #[test]
    fn missing_keys_are_listed_sorted() {
        let text: String = GOOD
            .lines()
            .filter(|l| !l.starts_with("r ") && !l.starts_with("c3"))
            .map(|l| format!("{l}\n"))
            .collect();
        let err = parse_parameters(&text, &ParameterSchema::default()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
        assert!(err.message().contains("c3, r"), "{}", err.message());
    }

    #[test]
    fn zero_tunable_is_rejected() {
        let text = GOOD.replace("K1 = 0.5", "K1 = 0");
        let err = parse_parameters(&text, &ParameterSchema::default()).unwrap_err();
        assert!(err.message().contains("k1"));
    }

    #[test]
    fn bad_number_is_a_config_error() {
        let text = GOOD.replace("c3 = 1", "c3 = one");
        let err = parse_parameters(&text, &ParameterSchema::default()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }

    #[test]
    fn fitted_file_layout() {
        let schema = ParameterSchema::default();
        let set = parse_parameters(GOOD, &schema).unwrap();
        let aux = set.aux.with_candidate(12.0, -0.5);
        let body = format_fitted_parameters(&set.guess, &aux, 1.25, &schema);
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "K1 = 0.5");
        assert_eq!(lines[3], "N2 = 50");
        assert_eq!(lines[4], "c3 = 1");
        assert_eq!(lines[11], "r = 1");
        assert_eq!(&lines[12..], ["dt = 12", "cvert = -0.5", "bt = 1.25"]);
    }

    #[test]
    fn describe_lists_tuned_then_sorted_aux() {
        let schema = ParameterSchema::default();
        let set = parse_parameters(GOOD, &schema).unwrap();
        let lines = describe_parameters(&set, &schema);
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "k1 = 0.5");
        assert_eq!(lines[4], "c3 = 1");
    }

    fn renamed_schema() -> ParameterSchema {
        let mut schema = ParameterSchema::default();
        schema.tuned = ["stiffness", "n0", "n1", "n2"].map(String::from).to_vec();
        schema
    }

    #[test]
    fn tunable_names_come_from_the_schema() {
        let schema = renamed_schema();
        let text = GOOD.replace("K1 = 0.5", "stiffness = 0.5");
        let set = parse_parameters(&text, &schema).unwrap();
        assert_eq!(set.guess.k1, 0.5);

        // The default name is no longer recognized.
        let err = parse_parameters(GOOD, &schema).unwrap_err();
        assert!(err.message().contains("k1"), "{}", err.message());

        assert_eq!(describe_parameters(&set, &schema)[0], "stiffness = 0.5");
        let body = format_fitted_parameters(&set.guess, &set.aux, 0.0, &schema);
        assert!(body.starts_with("STIFFNESS = 0.5\n"));
    }

    #[test]
    fn schema_without_a_model_constant_is_a_config_error() {
        let mut schema = ParameterSchema::default();
        schema.aux_keys.retain(|k| k != "r");
        let text: String = GOOD
            .lines()
            .filter(|l| !l.starts_with("r "))
            .map(|l| format!("{l}\n"))
            .collect();

        let err = parse_parameters(&text, &schema).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
        assert!(err.message().contains("`r`"), "{}", err.message());
    }

    #[test]
    fn schema_with_wrong_tunable_count_is_rejected() {
        let mut schema = ParameterSchema::default();
        schema.tuned.pop();
        let err = parse_parameters(GOOD, &schema).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }
}

//! Interactive confirmation of the parsed parameters.
//!
//! Kept separate from clap parsing: the fit core never prompts. The prompt is
//! generic over its input and output streams so it can be driven from tests.

use std::io::{self, BufRead, Write};

use crate::domain::{ParameterSchema, ParameterSet};
use crate::error::AppError;
use crate::io::describe_parameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

/// Interpret one line of input. Anything other than `y` / `n` is `None`.
pub fn parse_answer(line: &str) -> Option<Answer> {
    match line.trim() {
        "y" => Some(Answer::Yes),
        "n" => Some(Answer::No),
        _ => None,
    }
}

/// Show the parameters and ask `This is OK? [y/n]` until answered.
pub fn confirm_parameters(set: &ParameterSet, schema: &ParameterSchema) -> Result<(), AppError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    confirm_with(set, schema, &mut stdin.lock(), &mut stdout.lock())
}

pub fn confirm_with<R: BufRead, W: Write>(
    set: &ParameterSet,
    schema: &ParameterSchema,
    input: &mut R,
    output: &mut W,
) -> Result<(), AppError> {
    let write_err = |e: io::Error| AppError::config(format!("Failed to write prompt: {e}"));

    for line in describe_parameters(set, schema) {
        writeln!(output, "{line}").map_err(write_err)?;
    }

    loop {
        write!(output, "This is OK? [y/n] ").map_err(write_err)?;
        output.flush().map_err(write_err)?;

        let mut line = String::new();
        let bytes = input
            .read_line(&mut line)
            .map_err(|e| AppError::config(format!("Failed to read input: {e}")))?;
        if bytes == 0 {
            return Err(AppError::config(
                "No input received. Pass --yes to skip confirmation.",
            ));
        }

        match parse_answer(&line) {
            Some(Answer::Yes) => return Ok(()),
            Some(Answer::No) => return Err(AppError::config("Canceled.")),
            None => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuxParameters, TunableParameters};
    use crate::error::EXIT_CONFIG;

    fn set() -> ParameterSet {
        ParameterSet {
            guess: TunableParameters::new(0.5, 10.0, 20.0, 50.0),
            aux: AuxParameters {
                dt: 0.0,
                cvert: 0.0,
                c3: 1.0,
                r: 1.0,
                dt_min: 0.0,
                dt_max: 40.0,
                optimization_left_cutoff: 0.0,
                optimization_right_cutoff: 100.0,
                graph_left_cutoff: 0.0,
                graph_right_cutoff: 100.0,
            },
        }
    }

    #[test]
    fn answers_are_exact_letters() {
        assert_eq!(parse_answer("y\n"), Some(Answer::Yes));
        assert_eq!(parse_answer(" n "), Some(Answer::No));
        assert_eq!(parse_answer("yes"), None);
        assert_eq!(parse_answer(""), None);
    }

    #[test]
    fn reprompts_until_y() {
        let mut input = "maybe\n\ny\n".as_bytes();
        let mut out = Vec::new();
        confirm_with(&set(), &ParameterSchema::default(), &mut input, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("k1 = 0.5\n"));
        assert_eq!(text.matches("This is OK? [y/n]").count(), 3);
    }

    #[test]
    fn n_cancels() {
        let mut input = "n\n".as_bytes();
        let err = confirm_with(&set(), &ParameterSchema::default(), &mut input, &mut Vec::<u8>::new()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
        assert_eq!(err.message(), "Canceled.");
    }

    #[test]
    fn eof_is_an_error() {
        let mut input = "".as_bytes();
        assert!(confirm_with(&set(), &ParameterSchema::default(), &mut input, &mut Vec::<u8>::new()).is_err());
    }
}

// abc-core/src/domain/error.rs

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::position::Position;

/// One structural violation found by `validate()`, anchored to its YAML node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub pos: Position,
    pub msg: String,
}

impl Violation {
    pub fn new(pos: Position, msg: impl Into<String>) -> Self {
        Self {
            pos,
            msg: msg.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pos.prefix(), self.msg)
    }
}

/// Aggregate of every violation in a document; newline-joined in messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn push(&mut self, pos: &Position, msg: impl Into<String>) {
        self.0.push(Violation::new(pos.clone(), msg));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// A single input rule that evaluated to false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub input: String,
    pub rule: String,
    pub message: Option<String>,
    pub pos: Position,
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}input \"{}\" failed rule: {}",
            self.pos.prefix(),
            self.input,
            self.rule
        )?;
        if let Some(msg) = &self.message {
            write!(f, " ({})", msg)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("validation failed:\n{violations}")]
    #[diagnostic(code(abc::domain::validation))]
    Validation { violations: Violations },

    #[error("unknown input(s): {}", .0.join(", "))]
    #[diagnostic(
        code(abc::domain::unknown_inputs),
        help("Remove the input(s), or declare them under `inputs` in spec.yaml.")
    )]
    UnknownInputs(Vec<String>),

    #[error("missing input(s): {}", .0.join(", "))]
    #[diagnostic(
        code(abc::domain::missing_inputs),
        help("Pass --input name=value, or re-run with --prompt on a terminal.")
    )]
    MissingRequiredInputs(Vec<String>),

    #[error("input validation failed:\n{}", .0.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("\n"))]
    #[diagnostic(code(abc::domain::rule_violation))]
    RuleViolations(Vec<RuleFailure>),

    #[error("these builtin override var names are unknown and therefore invalid: {}", .0.join(", "))]
    #[diagnostic(code(abc::domain::unknown_builtins))]
    UnknownBuiltinOverrides(Vec<String>),

    #[error("the template referenced a nonexistent variable name \"{name}\"")]
    #[diagnostic(
        code(abc::domain::unknown_var),
        help("If this is a builtin (an underscore-prefixed name), set it under `builtin_vars` in test.yaml.")
    )]
    UnknownVar { name: String },

    #[error("internal error: {0}")]
    #[diagnostic(code(abc::domain::internal))]
    Internal(String),
}

impl DomainError {
    pub fn validation(violations: Violations) -> Self {
        DomainError::Validation { violations }
    }
}

//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;

use crate::ast::QualifiedName;

/// Fatal compilation error. The first error aborts the whole run; no stage
/// attempts recovery or batching.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("cyclic package dependency: {}", fmt_cycle(.0))]
    CyclicDependency(Vec<QualifiedName>),

    #[error("'{0}' is already declared in this scope")]
    DuplicateDeclaration(String),

    #[error("unresolved symbol '{0}'")]
    UnresolvedSymbol(String),

    #[error("package '{package}' does not export '{name}'")]
    UnknownExport { package: String, name: String },

    #[error("multi-segment member path '{0}' is not supported")]
    UnsupportedMemberPath(String),

    #[error("unknown operator '{left} {op} {right}'")]
    UnknownOperator {
        left: String,
        op: String,
        right: String,
    },

    #[error("type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    #[error("call expects {expected} argument(s), found {found}")]
    ArgumentMismatch { expected: usize, found: usize },

    #[error("condition must be 'bool', found '{0}'")]
    NonBooleanCondition(String),

    #[error("return type mismatch: expected '{expected}', found '{found}'")]
    ReturnTypeMismatch { expected: String, found: String },

    #[error("type '{class}' has no member '{member}'")]
    NoSuchMember { class: String, member: String },

    #[error("static member '{member}' must be accessed through the type name")]
    StaticMemberViaInstance { member: String },

    #[error("instance member '{member}' cannot be accessed through the type name")]
    InstanceMemberViaType { member: String },

    #[error("cannot unify types '{left}' and '{right}'")]
    TypeUnification { left: String, right: String },

    #[error("unsupported cast from '{from}' to '{to}'")]
    UnsupportedCast { from: String, to: String },

    #[error("cannot coerce '{0}' to a boolean")]
    UnsupportedCoercion(String),

    #[error("semantic error: {0}")]
    Semantic(String),

    #[error("IR lowering error: {0}")]
    Lowering(String),
}

impl CompileError {
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic(message.into())
    }

    pub fn lowering(message: impl Into<String>) -> Self {
        Self::Lowering(message.into())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

fn fmt_cycle(cycle: &[QualifiedName]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Diagnostic reporter for pretty error output.
///
/// The semantic core itself never prints; the driver hands errors to this
/// reporter for terminal rendering.
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, error: &CompileError) {
        let diagnostic: Diagnostic<usize> = Diagnostic::error().with_message(error.to_string());
        let _ = term::emit(
            &mut self.writer.lock(),
            &self.config,
            &self.files,
            &diagnostic,
        );
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

//! Unified diagnostic reporting (§7): a single `Diagnostic` value wraps
//! whichever error the pipeline raised and renders it with `ariadne`,
//! grounded in `snow-typeck/src/diagnostics.rs::render_diagnostic`'s
//! error-code / labeled-span / fix-suggestion shape, adapted from
//! `rowan::TextRange` byte offsets to this repo's line/column `Location`.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use noo_ast::Type;
use noo_common::{Location, Position};
use noo_eval::RuntimeError;
use noo_parser::ParseError;
use noo_typeck::{InferError, TraitError, TypeError};

/// What stage of the pipeline raised the error (§7's taxonomy, minus
/// `LexicalError`, which §7 marks out of scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Parse,
    Type,
    Trait,
    Runtime,
}

/// A rendered failure: kind, message, location, and the formatted report
/// text produced by `ariadne` (§7: "structured fields (kind, message,
/// location, optional context snippet, optional suggestion)").
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: &'static str,
    pub message: String,
    pub location: Location,
    pub suggestion: Option<String>,
    pub rendered: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rendered)
    }
}

impl Diagnostic {
    pub fn from_parse_error(err: &ParseError, source: &str) -> Self {
        let range = location_to_range(source, err.location);
        let code = "P0001";
        let config = Config::default().with_color(false);
        let mut builder = Report::build(ReportKind::Error, range.clone())
            .with_code(code)
            .with_message(&err.message)
            .with_config(config)
            .with_label(
                Label::new(range)
                    .with_message(err.message.clone())
                    .with_color(Color::Red),
            );
        if let Some((related_message, related_location)) = &err.related {
            let related_range = location_to_range(source, *related_location);
            builder.add_label(
                Label::new(related_range)
                    .with_message(related_message.clone())
                    .with_color(Color::Blue),
            );
        }
        Self {
            kind: DiagnosticKind::Parse,
            code,
            message: err.message.clone(),
            location: err.location,
            suggestion: None,
            rendered: render(builder.finish(), source),
        }
    }

    pub fn from_infer_error(err: &InferError, source: &str) -> Self {
        match err {
            InferError::Type(e) => Self::from_type_error(e, source),
            InferError::Trait(e) => Self::from_trait_error(e, source),
        }
    }

    pub fn from_type_error(err: &TypeError, source: &str) -> Self {
        let code = type_error_code(err);
        let location = type_error_location(err);
        let range = location_to_range(source, location);
        let message = err.to_string();
        let suggestion = type_error_suggestion(err);
        let config = Config::default().with_color(false);
        let mut builder = Report::build(ReportKind::Error, range.clone())
            .with_code(code)
            .with_message(&message)
            .with_config(config)
            .with_label(
                Label::new(range)
                    .with_message(message.clone())
                    .with_color(Color::Red),
            );
        if let Some(fix) = &suggestion {
            builder.set_help(fix.clone());
        }
        Self {
            kind: DiagnosticKind::Type,
            code,
            message,
            location,
            suggestion,
            rendered: render(builder.finish(), source),
        }
    }

    pub fn from_trait_error(err: &TraitError, source: &str) -> Self {
        let code = trait_error_code(err);
        let location = trait_error_location(err);
        let range = location_to_range(source, location);
        let message = err.to_string();
        let suggestion = trait_error_suggestion(err);
        let config = Config::default().with_color(false);
        let mut builder = Report::build(ReportKind::Error, range.clone())
            .with_code(code)
            .with_message(&message)
            .with_config(config)
            .with_label(
                Label::new(range)
                    .with_message(message.clone())
                    .with_color(Color::Red),
            );
        if let Some(fix) = &suggestion {
            builder.set_help(fix.clone());
        }
        Self {
            kind: DiagnosticKind::Trait,
            code,
            message,
            location,
            suggestion,
            rendered: render(builder.finish(), source),
        }
    }

    pub fn from_runtime_error(err: &RuntimeError, source: &str) -> Self {
        let code = runtime_error_code(err);
        let location = runtime_error_location(err);
        let range = location_to_range(source, location);
        let message = err.to_string();
        let config = Config::default().with_color(false);
        let builder = Report::build(ReportKind::Error, range.clone())
            .with_code(code)
            .with_message(&message)
            .with_config(config)
            .with_label(
                Label::new(range)
                    .with_message(message.clone())
                    .with_color(Color::Red),
            );
        Self {
            kind: DiagnosticKind::Runtime,
            code,
            message,
            location,
            suggestion: None,
            rendered: render(builder.finish(), source),
        }
    }
}

fn render(report: ariadne::Report<'_, Range<usize>>, source: &str) -> String {
    let mut buf = Vec::new();
    let cache = Source::from(source);
    report
        .write(cache, &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

// ── Error codes ──────────────────────────────────────────────────────

fn type_error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::OccursCheck { .. } => "E0002",
        TypeError::UndefinedVariable { .. } => "E0003",
        TypeError::NotAFunction { .. } => "E0004",
        TypeError::ArityMismatch { .. } => "E0005",
        TypeError::MissingField { .. } => "E0006",
        TypeError::StructuralMismatch { .. } => "E0007",
        TypeError::NotARecord { .. } => "E0008",
        TypeError::LegacyIsConstraint { .. } => "E0009",
        TypeError::ConditionNotBool { .. } => "E0010",
        TypeError::EffectNotDeclared { .. } => "E0011",
        TypeError::MixedNamedAndPositional { .. } => "E0012",
        TypeError::NonExhaustiveMatch { .. } => "E0013",
    }
}

fn trait_error_code(err: &TraitError) -> &'static str {
    match err {
        TraitError::NoImplementation { .. } => "E0101",
        TraitError::Ambiguous { .. } => "E0102",
        TraitError::DuplicateImplementation { .. } => "E0103",
        TraitError::ArityMismatch { .. } => "E0104",
        TraitError::UndefinedTraitFunction { .. } => "E0105",
        TraitError::UndefinedTrait { .. } => "E0106",
    }
}

fn runtime_error_code(err: &RuntimeError) -> &'static str {
    match err {
        RuntimeError::UndefinedVariable { .. } => "R0001",
        RuntimeError::NotMutable { .. } => "R0002",
        RuntimeError::NotAFunction { .. } => "R0003",
        RuntimeError::ArityMismatch { .. } => "R0004",
        RuntimeError::MissingField { .. } => "R0005",
        RuntimeError::NonExhaustiveMatch { .. } => "R0006",
        RuntimeError::NoImplementation { .. } => "R0007",
        RuntimeError::Ambiguous { .. } => "R0008",
        RuntimeError::StdlibFailure { .. } => "R0099",
    }
}

// ── Locations ────────────────────────────────────────────────────────

fn type_error_location(err: &TypeError) -> Location {
    match err {
        TypeError::Mismatch { location, .. }
        | TypeError::OccursCheck { location, .. }
        | TypeError::UndefinedVariable { location, .. }
        | TypeError::NotAFunction { location, .. }
        | TypeError::ArityMismatch { location, .. }
        | TypeError::MissingField { location, .. }
        | TypeError::StructuralMismatch { location, .. }
        | TypeError::NotARecord { location, .. }
        | TypeError::LegacyIsConstraint { location, .. }
        | TypeError::ConditionNotBool { location, .. }
        | TypeError::EffectNotDeclared { location, .. }
        | TypeError::MixedNamedAndPositional { location }
        | TypeError::NonExhaustiveMatch { location } => *location,
    }
}

fn trait_error_location(err: &TraitError) -> Location {
    match err {
        TraitError::NoImplementation { location, .. }
        | TraitError::Ambiguous { location, .. }
        | TraitError::DuplicateImplementation { location, .. }
        | TraitError::ArityMismatch { location, .. }
        | TraitError::UndefinedTraitFunction { location, .. }
        | TraitError::UndefinedTrait { location, .. } => *location,
    }
}

fn runtime_error_location(err: &RuntimeError) -> Location {
    match err {
        RuntimeError::UndefinedVariable { location, .. }
        | RuntimeError::NotMutable { location, .. }
        | RuntimeError::NotAFunction { location, .. }
        | RuntimeError::ArityMismatch { location, .. }
        | RuntimeError::MissingField { location, .. }
        | RuntimeError::NonExhaustiveMatch { location, .. }
        | RuntimeError::NoImplementation { location, .. }
        | RuntimeError::Ambiguous { location, .. } => *location,
        RuntimeError::StdlibFailure { .. } => Location::synthetic(),
    }
}

// ── Fix suggestions ──────────────────────────────────────────────────

/// Grounded in `snow-typeck/src/diagnostics.rs::fix_suggestion`, reworked
/// from string-slicing `Display` output (this repo's `Type` renders
/// `Option Float`, not `Option<Float>`) to a structural match on
/// `noo_ast::Type`.
fn type_error_suggestion(err: &TypeError) -> Option<String> {
    match err {
        TypeError::Mismatch { expected, found, .. } => mismatch_suggestion(expected, found),
        TypeError::ConditionNotBool { .. } => Some("expected a boolean expression".to_string()),
        TypeError::MixedNamedAndPositional { .. } => {
            Some("use either all `@name value` fields or all positional values, not both".to_string())
        }
        TypeError::NonExhaustiveMatch { .. } => {
            Some("add the missing patterns or a wildcard `_` arm".to_string())
        }
        _ => None,
    }
}

fn mismatch_suggestion(expected: &Type, found: &Type) -> Option<String> {
    match expected {
        Type::Variant(name, args) if name == "Option" && args.len() == 1 && &args[0] == found => {
            Some("wrap in Some(...)".to_string())
        }
        Type::Variant(name, args) if name == "Result" && args.len() == 2 && &args[0] == found => {
            Some("wrap in Ok(...)".to_string())
        }
        Type::Primitive(p) if p.name() == "String" && found.type_name().as_deref() != Some("String") => {
            Some("use show/toString to convert to String".to_string())
        }
        _ => None,
    }
}

fn trait_error_suggestion(err: &TraitError) -> Option<String> {
    match err {
        TraitError::NoImplementation { trait_name, type_name, .. } => {
            Some(format!("add `implement {trait_name} {type_name} (...)`"))
        }
        TraitError::Ambiguous { traits, .. } => {
            Some(format!("rename one implementation or pick a trait explicitly (candidates: {})", traits.join(", ")))
        }
        _ => None,
    }
}

// ── Span conversion ──────────────────────────────────────────────────

/// `Location` is line/column, not a byte offset (§3.1), so converting to
/// the byte range `ariadne::Source` needs means scanning the source once
/// for line-start offsets — the equivalent, for this repo's location
/// representation, of the teacher's `text_range_to_range` on a
/// `rowan::TextRange` that already carried byte offsets.
fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0usize];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

fn position_to_offset(source: &str, starts: &[usize], pos: Position) -> usize {
    let line_idx = (pos.line as usize).saturating_sub(1).min(starts.len() - 1);
    let line_start = starts[line_idx];
    let line_end = starts.get(line_idx + 1).copied().unwrap_or(source.len());
    let offset = line_start + (pos.col as usize).saturating_sub(1);
    offset.min(line_end).min(source.len())
}

fn location_to_range(source: &str, location: Location) -> Range<usize> {
    let starts = line_starts(source);
    let start = position_to_offset(source, &starts, location.start);
    let end = position_to_offset(source, &starts, location.end).max(start);
    if start == end {
        start..(end + 1).min(source.len()).max(start)
    } else {
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_to_range_handles_second_line() {
        let source = "abc\ndef";
        let loc = Location::new(Position::new(2, 1), Position::new(2, 4));
        assert_eq!(location_to_range(source, loc), 4..7);
    }

    #[test]
    fn zero_width_location_clamps_to_a_non_empty_range_within_bounds() {
        let source = "x";
        let loc = Location::at(Position::new(1, 2));
        let range = location_to_range(source, loc);
        assert!(range.start <= source.len() && range.end <= source.len());
    }

    #[test]
    fn parse_error_renders_a_report() {
        let source = "1 2 3 (";
        let err = noo_parser::parse_source(source).unwrap_err();
        let diag = Diagnostic::from_parse_error(&err, source);
        assert_eq!(diag.kind, DiagnosticKind::Parse);
        assert!(!diag.rendered.is_empty());
    }
}

//! Error types for reading the configuration document

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("YAML error at {}: {message}", format_location(.span))]
    Syntax { span: Option<Span>, message: String },
}

fn format_location(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!("{:?}", span),
        None => "unknown location".to_string(),
    }
}

impl ParseError {
    /// Build a syntax error from a serde_yaml failure, keeping its byte offset
    pub fn from_yaml(err: serde_yaml::Error, source: &str) -> Self {
        let span = err.location().map(|loc| {
            let start = loc.index().min(source.len());
            start..(start + 1).min(source.len()).max(start)
        });
        ParseError::Syntax {
            span,
            message: err.to_string(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let ParseError::Syntax { span, message } = self;
        let Some(span) = span else {
            return format!("{}: {}", filename, message);
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message("invalid configuration document")
            .with_label(
                Label::new((filename, span.clone()))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => format!("{}: {}", filename, message),
        }
    }
}

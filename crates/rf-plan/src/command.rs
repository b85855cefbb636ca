//! Structured command pipeline representation.
//!
//! Plans are built as ordered [`Invocation`]s with and-then semantics and
//! rendered to a single shell string only at the execution boundary.  The
//! runner treats the rendered pipeline as one unit whose exit code is the
//! last command's exit code.

use std::fmt::Write as _;
use std::path::PathBuf;

/// One external command in a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Niceness prepended to this invocation (`nice -n <n>`); only ever set
    /// on the primary encode step.
    pub nice: Option<i32>,
    /// Directory to enter before running, for tools that emit relative
    /// output paths.
    pub workdir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            nice: None,
            workdir: None,
        }
    }

    pub fn arg(mut self, s: impl Into<String>) -> Self {
        self.args.push(s.into());
        self
    }

    pub fn args(mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn nice(mut self, value: i32) -> Self {
        if value != 0 {
            self.nice = Some(value);
        }
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Render this invocation as a shell fragment with quoted arguments.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let Some(ref dir) = self.workdir {
            let _ = write!(out, "cd {} && ", shell_quote(&dir.to_string_lossy()));
        }
        if let Some(n) = self.nice {
            let _ = write!(out, "nice -n {n} ");
        }

        out.push_str(&shell_quote(&self.program));
        for arg in &self.args {
            out.push(' ');
            out.push_str(&shell_quote(arg));
        }
        out
    }
}

/// An ordered pipeline of invocations joined with and-then semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandPlan {
    pub steps: Vec<Invocation>,
}

impl CommandPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Invocation) {
        self.steps.push(step);
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Render the whole pipeline as one `&&`-joined shell command line.
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .map(Invocation::render)
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

/// Quote a string for POSIX `sh`.
///
/// Safe characters pass through untouched; anything else is wrapped in
/// single quotes with embedded quotes escaped as `'\''`.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | ',' | '%' | '+' | '@')
        })
    {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

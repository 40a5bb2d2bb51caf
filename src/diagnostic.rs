use owo_colors::OwoColorize;
use std::fmt;

/// A source span representing a range of bytes in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A label pointing to a specific span in the source
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// A complete diagnostic message
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.notes.push(format!("help: {}", help.into()));
        self
    }
}

/// Computes 1-based line and column from a byte offset
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn line_content(source: &str, line_num: usize) -> Option<&str> {
    source.split('\n').nth(line_num - 1).map(|l| l.trim_end_matches('\r'))
}

/// Diagnostic renderer for Rust-like error output
pub struct DiagnosticRenderer<'a> {
    source: &'a str,
    file_name: &'a str,
    use_color: bool,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(source: &'a str, file_name: &'a str, use_color: bool) -> Self {
        Self {
            source,
            file_name,
            use_color,
        }
    }

    /// Render a diagnostic to a string
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();

        // Header line: error[E0001]: message
        self.render_header(&mut output, diagnostic);

        if let Some(label) = diagnostic.labels.first() {
            let (line, col) = line_col(self.source, label.span.start);
            let width = line.to_string().len();

            // Location line: --> file:line:col
            output.push_str(&format!(
                "{}{} {}:{}:{}\n",
                " ".repeat(width),
                self.blue("-->"),
                self.file_name,
                line,
                col
            ));
            output.push_str(&format!("{} {}\n", " ".repeat(width), self.blue("|")));

            for label in &diagnostic.labels {
                self.render_label(&mut output, label, width);
            }

            output.push_str(&format!("{} {}\n", " ".repeat(width), self.blue("|")));
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("{} {} {}\n", " ".repeat(1), self.blue("="), note));
        }

        output
    }

    fn render_header(&self, output: &mut String, diagnostic: &Diagnostic) {
        let severity = match diagnostic.severity {
            Severity::Error => self.red_bold("error"),
            Severity::Warning => self.yellow_bold("warning"),
        };

        match &diagnostic.code {
            Some(code) => output.push_str(&format!(
                "{}[{}]: {}\n",
                severity,
                code,
                self.bold(&diagnostic.message)
            )),
            None => output.push_str(&format!("{}: {}\n", severity, self.bold(&diagnostic.message))),
        }
    }

    fn render_label(&self, output: &mut String, label: &Label, width: usize) {
        let (line_num, start_col) = line_col(self.source, label.span.start);
        let Some(content) = line_content(self.source, line_num) else {
            return;
        };

        // Source line: "3 | x = 5"
        output.push_str(&format!(
            "{:>width$} {} {}\n",
            self.blue(&line_num.to_string()),
            self.blue("|"),
            content,
            width = width
        ));

        let (end_line, end_col) = line_col(self.source, label.span.end.max(label.span.start + 1) - 1);
        let underline_len = if end_line == line_num {
            end_col + 1 - start_col
        } else {
            content.chars().count() + 1 - start_col
        };

        let mut underline = " ".repeat(start_col - 1);
        underline.push_str(&"^".repeat(underline_len.max(1)));
        if !label.message.is_empty() {
            underline.push(' ');
            underline.push_str(&label.message);
        }

        output.push_str(&format!("{} {} {}\n", " ".repeat(width), self.blue("|"), self.red(&underline)));
    }

    // Color helpers
    fn red(&self, s: &str) -> String {
        if self.use_color {
            s.red().to_string()
        } else {
            s.to_string()
        }
    }

    fn red_bold(&self, s: &str) -> String {
        if self.use_color {
            s.red().bold().to_string()
        } else {
            s.to_string()
        }
    }

    fn yellow_bold(&self, s: &str) -> String {
        if self.use_color {
            s.yellow().bold().to_string()
        } else {
            s.to_string()
        }
    }

    fn blue(&self, s: &str) -> String {
        if self.use_color {
            s.blue().to_string()
        } else {
            s.to_string()
        }
    }

    fn bold(&self, s: &str) -> String {
        if self.use_color {
            s.bold().to_string()
        } else {
            s.to_string()
        }
    }
}

/// Render multiple diagnostics
pub fn render_diagnostics(source: &str, file_name: &str, diagnostics: &[Diagnostic], use_color: bool) -> String {
    let renderer = DiagnosticRenderer::new(source, file_name, use_color);
    let mut output = String::new();

    for diagnostic in diagnostics {
        output.push_str(&renderer.render(diagnostic));
        output.push('\n');
    }

    let error_count = diagnostics.iter().filter(|d| d.severity == Severity::Error).count();
    if error_count > 0 {
        output.push_str(&format!(
            "error: aborting due to {} error{}\n",
            error_count,
            if error_count == 1 { "" } else { "s" }
        ));
    }

    output
}

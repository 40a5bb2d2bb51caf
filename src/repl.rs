use crate::interpreter::Interpreter;
use crate::keywords::{Keyword, KeywordTable};
use owo_colors::{AnsiColors, OwoColorize};
use std::io::{self, BufRead, Write};

pub const PROMPT: &str = ">>> ";

fn keyword_color(keyword: Keyword) -> AnsiColors {
    match keyword {
        Keyword::If => AnsiColors::Red,
        Keyword::Else | Keyword::End => AnsiColors::Green,
        Keyword::While | Keyword::Then => AnsiColors::Yellow,
        Keyword::Fn => AnsiColors::Blue,
        Keyword::Return => AnsiColors::Magenta,
        Keyword::Import => AnsiColors::Cyan,
    }
}

/// Echo form of a REPL line: each space-separated word that exactly matches a
/// keyword spelling is colored, everything else is white.
pub fn colorize_line(line: &str, keywords: &KeywordTable, use_color: bool) -> String {
    if !use_color {
        return line.to_string();
    }

    line.split(' ')
        .map(|word| {
            let color = keywords
                .lookup(word)
                .map(keyword_color)
                .unwrap_or(AnsiColors::White);
            word.color(color).to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Line-at-a-time session over one persistent interpreter.
pub struct Repl {
    interpreter: Interpreter,
    use_color: bool,
}

impl Repl {
    pub fn new(interpreter: Interpreter, use_color: bool) -> Self {
        Self {
            interpreter,
            use_color,
        }
    }

    /// Reads lines until `exit` or end of input. Errors are reported and the
    /// session continues.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> io::Result<()> {
        writeln!(out, "K2Sphere REPL with keyword colors")?;
        writeln!(out, "type exit to quit")?;

        let mut line = String::new();
        loop {
            write!(out, "{}", PROMPT)?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break;
            }

            let entry = line.trim_end_matches(['\n', '\r']);
            if entry.trim() == "exit" {
                break;
            }

            writeln!(out, "{}", colorize_line(entry, self.interpreter.keywords(), self.use_color))?;

            if let Err(e) = self.interpreter.run_source(entry) {
                tracing::debug!(error = ?e, "repl line failed");
                let message = format!("Error: {}", e);
                if self.use_color {
                    writeln!(out, "{}", message.red())?;
                } else {
                    writeln!(out, "{}", message)?;
                }
            }
        }

        Ok(())
    }
}

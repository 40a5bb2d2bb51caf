#![allow(dead_code)]

use indexmap::IndexMap;
use k2sphere::{Interpreter, KeywordTable, Value};
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

/// In-memory `print` sink that can be read back after the run.
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output should be UTF-8")
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn interpreter() -> (Interpreter, Capture) {
    let capture = Capture::default();
    let interpreter = Interpreter::new().with_output(Box::new(capture.clone()));
    (interpreter, capture)
}

pub fn interpreter_with(keywords: KeywordTable, lib_dir: &Path) -> (Interpreter, Capture) {
    let capture = Capture::default();
    let interpreter = Interpreter::with_keywords(keywords)
        .with_lib_dir(lib_dir)
        .with_output(Box::new(capture.clone()));
    (interpreter, capture)
}

pub fn run(source: &str) -> Value {
    interpreter()
        .0
        .run_source(source)
        .expect("program should succeed")
}

pub fn run_err(source: &str) -> k2sphere::Error {
    match interpreter().0.run_source(source) {
        Ok(value) => panic!("program should fail, got {:?}", value),
        Err(e) => e,
    }
}

/// Everything the program printed.
pub fn run_output(source: &str) -> String {
    let (mut interpreter, capture) = interpreter();
    interpreter
        .run_source(source)
        .expect("program should succeed");
    capture.contents()
}

pub fn keywords_from(pairs: &[(&str, &str)]) -> KeywordTable {
    let map: IndexMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    KeywordTable::from_map(&map).expect("keyword table should be valid")
}

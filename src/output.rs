use std::io::{self, Write};

use serde::Serialize;

use crate::error::{ErrorKind, MetaError};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

#[derive(Debug, Serialize)]
struct Failure<'a> {
    success: bool,
    kind: ErrorKind,
    error: &'a str,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }

    pub fn print_failure(error: &MetaError) -> io::Result<()> {
        let message = error.to_string();
        Self::print(&Failure {
            success: false,
            kind: error.kind(),
            error: &message,
        })
    }
}

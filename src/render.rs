//! Render stage: hand a generated argument vector to the graphing engine.
//!
//! The engine keeps process-wide state and is not safe to call concurrently,
//! so every call goes through `SerializedEngine`, which holds a lock for the
//! whole render.

use crate::error::GraphError;
use std::process::Command;
use std::sync::Mutex;
use tracing::debug;

pub trait RenderEngine {
    /// Render `args` (argv[0] included) and return the image bytes.
    fn render(&mut self, args: &[String]) -> Result<Vec<u8>, String>;
}

/// Serialises access to a non-reentrant engine.
pub struct SerializedEngine<E> {
    engine: Mutex<E>,
}

impl<E: RenderEngine> SerializedEngine<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    pub fn render(&self, args: &[String]) -> Result<Vec<u8>, GraphError> {
        let mut engine = self
            .engine
            .lock()
            .map_err(|_| GraphError::Render("engine lock poisoned".to_string()))?;
        engine.render(args).map_err(GraphError::Render)
    }
}

/// Runs `rrdtool graph` as a child process with the image written to stdout.
#[derive(Debug, Clone)]
pub struct RrdtoolCommand {
    program: String,
}

impl RrdtoolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RrdtoolCommand {
    fn default() -> Self {
        Self::new("rrdtool")
    }
}

impl RenderEngine for RrdtoolCommand {
    fn render(&mut self, args: &[String]) -> Result<Vec<u8>, String> {
        let rest = args.get(1..).unwrap_or_default();
        debug!("running {} graph with {} argument(s)", self.program, rest.len());

        let output = Command::new(&self.program)
            .arg("graph")
            .args(rest)
            .output()
            .map_err(|e| format!("{}: {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{} exited with {}: {}", self.program, output.status, stderr.trim()));
        }
        Ok(output.stdout)
    }
}

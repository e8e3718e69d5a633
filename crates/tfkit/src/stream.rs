//! Combined stdout/stderr forwarding for long-running terraform commands.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::Child;
use std::sync::Mutex;
use std::thread;

/// Number of trailing output lines kept for error reports.
pub const TAIL_LINES: usize = 20;

struct Shared<'a> {
    sink: &'a mut (dyn Write + Send),
    tail: VecDeque<String>,
    write_error: Option<io::Error>,
}

impl Shared<'_> {
    fn push(&mut self, line: &str) {
        // Keep draining the pipe after a sink failure so the child never blocks.
        if self.write_error.is_none() {
            if let Err(e) = writeln!(self.sink, "{line}") {
                self.write_error = Some(e);
            }
        }
        if self.tail.len() == TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }
}

/// Forward the child's stdout and stderr line by line into `sink`.
///
/// Blocks until both pipes are closed. Returns the last [`TAIL_LINES`]
/// lines of combined output.
pub fn pump(child: &mut Child, sink: &mut (dyn Write + Send)) -> io::Result<String> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let state = Mutex::new(Shared {
        sink,
        tail: VecDeque::with_capacity(TAIL_LINES),
        write_error: None,
    });
    let shared = &state;

    thread::scope(|scope| -> io::Result<()> {
        let out = stdout.map(|pipe| scope.spawn(move || copy_lines(pipe, shared)));
        let err = stderr.map(|pipe| scope.spawn(move || copy_lines(pipe, shared)));

        for handle in [out, err].into_iter().flatten() {
            handle
                .join()
                .map_err(|_| io::Error::other("terraform output reader panicked"))??;
        }
        Ok(())
    })?;

    let mut state = state
        .into_inner()
        .map_err(|_| io::Error::other("terraform output sink lock poisoned"))?;
    state.sink.flush()?;
    if let Some(e) = state.write_error {
        return Err(e);
    }
    Ok(Vec::from(state.tail).join("\n"))
}

fn copy_lines(pipe: impl Read, shared: &Mutex<Shared<'_>>) -> io::Result<()> {
    let reader = BufReader::new(pipe);
    for line in reader.split(b'\n') {
        let line = line?;
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches('\r');
        shared
            .lock()
            .map_err(|_| io::Error::other("terraform output sink lock poisoned"))?
            .push(text);
    }
    Ok(())
}

//! Chrome trace output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

static TRACE: Mutex<Option<Trace>> = Mutex::new(None);
/// Checked before taking the lock so untraced runs pay nothing.
static ENABLED: AtomicBool = AtomicBool::new(false);

struct Event {
    name: &'static str,
    tid: usize,
    start: Instant,
    end: Instant,
}

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        write!(
            self.w,
            "{{ \"pid\": 0, \"tid\": {}, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {} }}",
            event.tid,
            event.name,
            event.start.duration_since(self.start).as_micros(),
            event.end.duration_since(event.start).as_micros(),
        )
    }

    fn write(&mut self, event: &Event) -> std::io::Result<()> {
        self.write_event(event)?;
        writeln!(self.w, ",")
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.write_event(&Event {
            name: "main",
            tid: 0,
            start: self.start,
            end: Instant::now(),
        })?;
        writeln!(self.w, "]")?;
        self.w.flush()
    }
}

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    *TRACE.lock().unwrap() = Some(trace);
    ENABLED.store(true, Ordering::Release);
    Ok(())
}

/// Run `f`, recording how long it took as a trace event if tracing is on.
/// Events from rayon workers are attributed to their own thread rows.
#[inline]
pub fn scope<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    if !ENABLED.load(Ordering::Acquire) {
        return f();
    }
    let start = Instant::now();
    let result = f();
    let event = Event {
        name,
        tid: rayon::current_thread_index().map_or(0, |index| index + 1),
        start,
        end: Instant::now(),
    };
    if let Some(trace) = TRACE.lock().unwrap().as_mut() {
        if let Err(err) = trace.write(&event) {
            tracing::debug!("trace: {}", err);
        }
    }
    result
}

pub fn close() -> std::io::Result<()> {
    ENABLED.store(false, Ordering::Release);
    match TRACE.lock().unwrap().take() {
        Some(mut trace) => trace.close(),
        None => Ok(()),
    }
}

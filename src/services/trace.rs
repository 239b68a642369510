//! Waveform trace sampling.
//!
//! Reads the VCD dump left behind by a failing simulation and condenses the
//! final time window into a small table the generation backend can read.
//! Parsing happens in two passes the way `vcd-ng` wants it: `Parser` for the
//! header (scope/var tree), then a rewind and a `FastFlow` token stream for
//! the value changes.
//!
//! Every failure here degrades feedback quality instead of aborting the
//! loop, so the error type carries its own placeholder rendering.

use std::collections::HashMap;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use vcd_ng::{FFValueChange, FastFlow, FastFlowToken, ScopeItem};

/// Simulated time units per clock tick assumed when windowing.
pub const TIME_UNITS_PER_TICK: u64 = 10;

/// Stride between sampled time points, in simulated time units.
const SAMPLE_STRIDE: u64 = 5;

// ---------------------------------------------------------------------------
// TraceError
// ---------------------------------------------------------------------------

/// Why a trace could not be sampled.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("waveform dump not found: {0}")]
    Missing(String),

    #[error("waveform parse failed: {0}")]
    Parse(String),
}

impl TraceError {
    /// The degraded-feedback string sent to the backend in place of a table.
    pub fn placeholder(&self) -> String {
        match self {
            TraceError::Missing(_) => {
                "[Waveform dump not found. Ensure WAVES=1 is set.]".to_string()
            }
            TraceError::Parse(reason) => format!("[Failed to parse waveform: {reason}]"),
        }
    }
}

// ---------------------------------------------------------------------------
// WaveTable
// ---------------------------------------------------------------------------

/// A sampled excerpt of the final window of a waveform recording.
#[derive(Debug, Clone)]
pub struct WaveTable {
    /// Display names, hierarchical scope prefixes stripped.
    pub signals: Vec<String>,
    /// One row per sampled time point: (time, value per signal).
    pub rows: Vec<(u64, Vec<String>)>,
}

impl WaveTable {
    /// Render as the fixed tabular feedback format: a header row of time and
    /// signal names, a separator row, and one data row per sample point.
    pub fn render(&self) -> String {
        let mut out = String::from("\n### Waveform State Prior to Failure (Last few ticks):\n");
        out.push_str("| Time | ");
        out.push_str(&self.signals.join(" | "));
        out.push_str(" |\n|");
        for _ in 0..=self.signals.len() {
            out.push_str("---|");
        }
        out.push('\n');
        for (time, values) in &self.rows {
            out.push_str(&format!("| {} | {} |\n", time, values.join(" | ")));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// WaveSampler
// ---------------------------------------------------------------------------

/// Samples the trailing window of a VCD recording.
#[derive(Debug, Clone)]
pub struct WaveSampler {
    /// Trailing clock ticks to include.
    ticks: u64,
}

impl WaveSampler {
    pub fn new(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Read `path` and sample every declared signal across the final window.
    ///
    /// The window is `ticks * TIME_UNITS_PER_TICK` units ending at the last
    /// recorded timestamp, clamped to start no earlier than time zero. Each
    /// signal's value at a sample point is its last change at or before that
    /// point.
    pub fn sample(&self, path: &Path) -> Result<WaveTable, TraceError> {
        if !path.exists() {
            return Err(TraceError::Missing(path.display().to_string()));
        }

        let file = std::fs::File::open(path)
            .map_err(|e| TraceError::Parse(format!("cannot open {}: {e}", path.display())))?;
        let mut bufrd = BufReader::with_capacity(65536, file);
        let mut parser = vcd_ng::Parser::new(&mut bufrd);
        let header = parser
            .parse_header()
            .map_err(|e| TraceError::Parse(e.to_string()))?;
        drop(parser);

        let mut signals = Vec::new();
        collect_signals(&header.items, &mut signals);
        if signals.is_empty() {
            return Err(TraceError::Parse("no signals declared".to_string()));
        }

        // Rewind and stream the value changes.
        let mut file = bufrd.into_inner();
        file.seek(SeekFrom::Start(0))
            .map_err(|e| TraceError::Parse(e.to_string()))?;
        let mut flow = FastFlow::new(file, 65536);

        let mut changes: HashMap<u64, Vec<(u64, String)>> = HashMap::new();
        let mut now: u64 = 0;
        let mut end: u64 = 0;

        loop {
            let token = flow
                .next_token()
                .map_err(|e| TraceError::Parse(e.to_string()))?;
            match token {
                Some(FastFlowToken::Timestamp(t)) => {
                    now = t;
                    end = end.max(t);
                }
                Some(FastFlowToken::Value(FFValueChange { id, bits })) => {
                    let value: String = bits.iter().map(|&b| b as char).collect();
                    changes.entry(id.0).or_default().push((now, value));
                }
                None => break,
            }
        }

        let start = end.saturating_sub(self.ticks * TIME_UNITS_PER_TICK);

        tracing::debug!(
            trace = %path.display(),
            signals = signals.len(),
            start_time = start,
            end_time = end,
            "Sampling waveform window"
        );

        let mut rows = Vec::new();
        let mut t = start;
        while t <= end {
            let values = signals
                .iter()
                .map(|(_, code)| value_at(changes.get(code), t))
                .collect();
            rows.push((t, values));
            t += SAMPLE_STRIDE;
        }

        Ok(WaveTable {
            signals: signals.into_iter().map(|(name, _)| name).collect(),
            rows,
        })
    }
}

/// Walk the scope tree collecting (leaf display name, id code) per variable,
/// in declaration order.
fn collect_signals(items: &[ScopeItem], out: &mut Vec<(String, u64)>) {
    for item in items {
        if let ScopeItem::Var(var) = item {
            out.push((var.reference.to_string(), var.code.0));
        } else if let ScopeItem::Scope(scope) = item {
            collect_signals(&scope.children, out);
        }
    }
}

/// Last-change-wins lookup: the value of a signal at-or-before time `t`.
fn value_at(changes: Option<&Vec<(u64, String)>>, t: u64) -> String {
    let Some(changes) = changes else {
        return "x".to_string();
    };
    let idx = changes.partition_point(|(time, _)| *time <= t);
    if idx == 0 {
        "x".to_string()
    } else {
        changes[idx - 1].1.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

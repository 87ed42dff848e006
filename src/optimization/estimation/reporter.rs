//! estimation::reporter — progress artifacts of an estimation run.
//!
//! Purpose
//! -------
//! Persist human-readable progress after every criterion evaluation and a
//! closing report when the run ends, behind a [`Reporter`] seam so the
//! numerical core can run without touching the filesystem.
//!
//! Key behaviors
//! -------------
//! - [`Reporter::write_interim`] is called once per evaluation, right after
//!   the tracker recorded it. It refreshes the current-parameter artifact,
//!   writes the start artifact and resets the step log on the first
//!   evaluation, refreshes the best-parameter artifact and appends to the
//!   step log on an improvement, and always rewrites the summary.
//! - [`Reporter::write_final`] closes the step log and marks the summary as
//!   terminated.
//! - [`DiskReporter`] writes the five artifacts into a directory;
//!   [`MemoryReporter`] keeps identical text in memory.
//!
//! Conventions
//! -----------
//! - Parameter artifacts hold one value per line, width 15 with 8 decimals.
//! - Step-log blocks are `label value` lines with the label left-aligned in
//!   10 columns; the summary uses 15-column right-aligned tables.
//! - All text is produced by the pure `format_*` helpers shared by both
//!   reporters.
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use ndarray::Array2;

use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::{
        tracker::{EvaluationEvent, RunState, StepRecord},
        types::{Cost, Theta},
    },
};

/// Current parameters, overwritten every evaluation.
pub const PARAS_CURRE_FILE: &str = "paras_curre.est.log";
/// Start parameters, written once per run.
pub const PARAS_START_FILE: &str = "paras_start.est.log";
/// Best parameters, overwritten on every improvement.
pub const PARAS_STEPS_FILE: &str = "paras_steps.est.log";
/// Append-only step log.
pub const OPTIMIZATION_LOG_FILE: &str = "optimization.est.log";
/// Summary, rewritten every evaluation.
pub const OPTIMIZATION_INFO_FILE: &str = "optimization.est.info";

/// Shock covariance matrices decoded from the three snapshots.
///
/// Until a first step exists, `step` is decoded from the start snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotCovariances {
    pub start: Array2<f64>,
    pub step: Array2<f64>,
    pub current: Array2<f64>,
}

/// Everything a reporter sees after one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub state: &'a RunState,
    pub event: &'a EvaluationEvent,
    pub covariances: &'a SnapshotCovariances,
}

/// Closing information of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub success: bool,
    pub message: String,
    pub criterion: Cost,
    pub timestamp: DateTime<Local>,
}

pub trait Reporter {
    fn write_interim(&mut self, progress: &Progress<'_>) -> OptResult<()>;
    fn write_final(&mut self, report: &FinalReport) -> OptResult<()>;
}

// ---- Formatting ----

/// `Thu Mar  7 14:02:11 2024`
pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%a %b %e %H:%M:%S %Y").to_string()
}

/// One value per line, `%15.8f`.
pub fn format_param_vector(x: &Theta) -> String {
    x.iter().map(|v| format!("{v:15.8}\n")).collect()
}

/// Step-log block for one improvement.
pub fn format_step_block(step: &StepRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:<25}\n", "Step", step.index));
    out.push_str(&format!("{:<10} {:<25}\n", "Criterion", step.value));
    out.push_str(&format!("{:<10} {:<25}\n", "Time", format_timestamp(&step.timestamp)));
    out.push_str("\n\n");
    out
}

/// Closing block of the step log.
pub fn format_final_block(report: &FinalReport) -> String {
    let mut out = String::from("Final Report\n\n");
    out.push_str(&format!("{:<10} {:<25}\n", "Success", report.success));
    out.push_str(&format!("{:<10} {:<25}\n", "Message", report.message));
    out.push_str(&format!("{:<10} {:<25}\n", "Criterion", report.criterion));
    out.push_str(&format!("{:<10} {:<25}\n", "Time", format_timestamp(&report.timestamp)));
    out
}

/// Marker appended to the summary when the run ends.
pub const TERMINATED_MARKER: &str = "\n TERMINATED";

/// Full summary: criterion table, parameter table, covariances, counters.
pub fn format_summary(state: &RunState, covariances: &SnapshotCovariances) -> String {
    let mut out = String::from("\n Criterion Function\n\n");
    out.push_str(&format!(
        "{:>15}    {:>15}    {:>15}    {:>15}\n\n",
        "", "Start", "Step", "Current"
    ));
    out.push_str(&format!(
        "{:>15}    {:15.4}    {:15.4}    {:15.4}\n\n",
        "", state.value_start, state.value_steps, state.value_curre
    ));

    out.push_str("\n Optimization Parameters\n\n");
    out.push_str(&format!(
        "{:>15}    {:>15}    {:>15}    {:>15}\n\n",
        "Identifier", "Start", "Step", "Current"
    ));
    if let (Some(start), Some(curre)) = (&state.paras_start, &state.paras_curre) {
        for (i, (s, c)) in start.iter().zip(curre.iter()).enumerate() {
            let b = match &state.paras_steps {
                Some(step) => format!("{:15.4}", step[i]),
                None => format!("{:>15}", ""),
            };
            out.push_str(&format!("{i:>15}    {s:15.4}    {b}    {c:15.4}\n"));
        }
    }

    out.push_str("\n\n Covariance Matrix \n\n");
    for (label, cov) in [
        ("Start", &covariances.start),
        ("Step", &covariances.step),
        ("Current", &covariances.current),
    ] {
        out.push_str(&format!("{label:>15}   \n\n"));
        for row in cov.rows() {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:15.4}")).collect();
            out.push_str(&cells.join("    "));
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str(&format!("\n{:<25}{:>15}\n", " Number of Steps", state.num_steps));
    out.push_str(&format!("\n{:<25}{:>15}\n", " Number of Evaluations", state.num_evals));
    out
}

// ---- Disk ----

/// Writes the progress artifacts into `root`.
///
/// Paths are fixed by convention (see the `*_FILE` constants). Only one run
/// may target a directory at a time.
#[derive(Debug, Clone)]
pub struct DiskReporter {
    root: PathBuf,
}

impl DiskReporter {
    /// Reporter writing into `root`, created if missing.
    pub fn new(root: impl Into<PathBuf>) -> OptResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_error(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn overwrite(&self, name: &str, contents: &str) -> OptResult<()> {
        let path = self.path(name);
        fs::write(&path, contents).map_err(|e| io_error(&path, e))
    }

    fn append(&self, name: &str, contents: &str) -> OptResult<()> {
        let path = self.path(name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        file.write_all(contents.as_bytes()).map_err(|e| io_error(&path, e))
    }

    fn remove_if_exists(&self, name: &str) -> OptResult<()> {
        let path = self.path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

impl Reporter for DiskReporter {
    fn write_interim(&mut self, progress: &Progress<'_>) -> OptResult<()> {
        let state = progress.state;
        if let Some(curre) = &state.paras_curre {
            self.overwrite(PARAS_CURRE_FILE, &format_param_vector(curre))?;
        }

        if progress.event.is_first {
            if let Some(start) = &state.paras_start {
                self.overwrite(PARAS_START_FILE, &format_param_vector(start))?;
            }
            self.remove_if_exists(OPTIMIZATION_LOG_FILE)?;
        }

        if let Some(step) = &progress.event.step {
            if let Some(best) = &state.paras_steps {
                self.overwrite(PARAS_STEPS_FILE, &format_param_vector(best))?;
            }
            self.append(OPTIMIZATION_LOG_FILE, &format_step_block(step))?;
        }

        self.overwrite(OPTIMIZATION_INFO_FILE, &format_summary(state, progress.covariances))
    }

    fn write_final(&mut self, report: &FinalReport) -> OptResult<()> {
        self.append(OPTIMIZATION_LOG_FILE, &format_final_block(report))?;
        self.append(OPTIMIZATION_INFO_FILE, TERMINATED_MARKER)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> OptError {
    OptError::Io { path: path.display().to_string(), text: err.to_string() }
}

// ---- Memory ----

/// Keeps the artifact text in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryReporter {
    pub paras_curre: String,
    pub paras_start: String,
    pub paras_steps: String,
    pub step_log: String,
    pub summary: String,
    pub interim_calls: u64,
    pub finished: bool,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for MemoryReporter {
    fn write_interim(&mut self, progress: &Progress<'_>) -> OptResult<()> {
        let state = progress.state;
        self.interim_calls += 1;
        if let Some(curre) = &state.paras_curre {
            self.paras_curre = format_param_vector(curre);
        }
        if progress.event.is_first {
            if let Some(start) = &state.paras_start {
                self.paras_start = format_param_vector(start);
            }
            self.step_log.clear();
        }
        if let Some(step) = &progress.event.step {
            if let Some(best) = &state.paras_steps {
                self.paras_steps = format_param_vector(best);
            }
            self.step_log.push_str(&format_step_block(step));
        }
        self.summary = format_summary(state, progress.covariances);
        Ok(())
    }

    fn write_final(&mut self, report: &FinalReport) -> OptResult<()> {
        self.step_log.push_str(&format_final_block(report));
        self.summary.push_str(TERMINATED_MARKER);
        self.finished = true;
        Ok(())
    }
}

/// Shares one reporter between the wrapper and the caller.
impl<R: Reporter + ?Sized> Reporter for std::rc::Rc<std::cell::RefCell<R>> {
    fn write_interim(&mut self, progress: &Progress<'_>) -> OptResult<()> {
        self.borrow_mut().write_interim(progress)
    }

    fn write_final(&mut self, report: &FinalReport) -> OptResult<()> {
        self.borrow_mut().write_final(report)
    }
}

// Capture workflow: drive a detection pipeline over a plan of samples and
// persist the results as one measurement table.

use std::collections::VecDeque;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use inspecta_io::{check_item_name, write_table, DetectionResult, MeasurementRow};
use thiserror::Error;

use crate::error::CompareError;

/// Timestamp format stamped on captured rows.
pub const CAPTURE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleId {
    pub group: String,
    pub sample: String,
}

impl SampleId {
    pub fn new(group: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            sample: sample.into(),
        }
    }
}

impl std::fmt::Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.group, self.sample)
    }
}

/// Ordered list of samples to capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturePlan {
    samples: Vec<SampleId>,
}

impl CapturePlan {
    pub fn new(samples: Vec<SampleId>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PipelineError(pub String);

/// A detection run on one sample at a time.
///
/// `start` triggers detection; `wait_for_result` blocks until the pipeline
/// signals completion. `capture` never starts a second sample before the
/// first one's result has been received.
pub trait DetectionPipeline {
    fn start(&mut self, sample: &SampleId) -> Result<(), PipelineError>;
    fn wait_for_result(&mut self) -> Result<DetectionResult, PipelineError>;
}

/// Shared cancellation flag, checked between samples.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    pub rows: usize,
    pub ok: usize,
    pub ng: usize,
}

/// Run every sample in `plan` through `pipeline` and write the table to `path`.
///
/// The table is written once, after the last sample. A cancelled or failed
/// capture leaves `path` untouched.
pub fn capture(
    pipeline: &mut dyn DetectionPipeline,
    plan: &CapturePlan,
    path: &Path,
    cancel: &CancelToken,
) -> Result<CaptureSummary, CompareError> {
    let mut rows: Vec<MeasurementRow> = Vec::with_capacity(plan.len());

    for (done, sample) in plan.samples().iter().enumerate() {
        if cancel.is_cancelled() {
            log::warn!("capture cancelled after {done} of {} samples", plan.len());
            return Err(CompareError::CaptureCancelled {
                completed: done,
                planned: plan.len(),
            });
        }

        let detection_failed = |e: PipelineError| CompareError::Detection {
            sample: sample.to_string(),
            message: e.to_string(),
        };
        pipeline.start(sample).map_err(detection_failed)?;
        let mut result = pipeline.wait_for_result().map_err(detection_failed)?;

        if result.group != sample.group || result.sample != sample.sample {
            log::warn!(
                "pipeline reported {}#{} for planned sample {sample}; keeping planned identity",
                result.group,
                result.sample
            );
            result.group = sample.group.clone();
            result.sample = sample.sample.clone();
        }

        for item in &result.items {
            check_item_name(&item.name).map_err(|e| CompareError::Detection {
                sample: sample.to_string(),
                message: e.to_string(),
            })?;
        }

        let stamp = chrono::Local::now().format(CAPTURE_TIME_FORMAT).to_string();
        log::debug!("captured {sample} ({})", if result.ok { "OK" } else { "NG" });
        rows.push(MeasurementRow::from_detection(result, stamp));
    }

    write_table(&rows, path)?;

    let ok = rows.iter().filter(|r| r.ok).count();
    let summary = CaptureSummary {
        rows: rows.len(),
        ok,
        ng: rows.len() - ok,
    };
    log::info!(
        "capture complete: {} rows ({} OK, {} NG) -> {}",
        summary.rows,
        summary.ok,
        summary.ng,
        path.display()
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Pipeline that hands back pre-computed results in order.
#[derive(Debug, Default)]
pub struct ReplayPipeline {
    pending: VecDeque<DetectionResult>,
    in_flight: Option<DetectionResult>,
}

impl ReplayPipeline {
    pub fn new(results: Vec<DetectionResult>) -> Self {
        Self {
            pending: results.into(),
            in_flight: None,
        }
    }

    /// Parse one `DetectionResult` JSON object per line. Blank lines are
    /// ignored. The plan follows the order of the lines.
    pub fn from_json_lines(reader: impl BufRead) -> Result<(Self, CapturePlan), CompareError> {
        let mut results = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line.map_err(|e| CompareError::DetectionInput {
                line: line_no,
                message: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let result: DetectionResult =
                serde_json::from_str(&line).map_err(|e| CompareError::DetectionInput {
                    line: line_no,
                    message: e.to_string(),
                })?;
            results.push(result);
        }

        let plan = CapturePlan::new(
            results
                .iter()
                .map(|r| SampleId::new(r.group.as_str(), r.sample.as_str()))
                .collect(),
        );
        Ok((Self::new(results), plan))
    }
}

impl DetectionPipeline for ReplayPipeline {
    fn start(&mut self, sample: &SampleId) -> Result<(), PipelineError> {
        if self.in_flight.is_some() {
            return Err(PipelineError("a detection is already in flight".into()));
        }
        let next = self
            .pending
            .pop_front()
            .ok_or_else(|| PipelineError(format!("no recorded result left for {sample}")))?;
        self.in_flight = Some(next);
        Ok(())
    }

    fn wait_for_result(&mut self) -> Result<DetectionResult, PipelineError> {
        self.in_flight
            .take()
            .ok_or_else(|| PipelineError("no detection was started".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspecta_io::{read_table, Measurement};
    use tempfile::tempdir;

    fn detection(group: &str, sample: &str, ok: bool, temp: &str) -> DetectionResult {
        DetectionResult {
            group: group.into(),
            sample: sample.into(),
            ok,
            defect_type: if ok { String::new() } else { "Dent".into() },
            items: vec![Measurement {
                name: "temp".into(),
                value: temp.into(),
            }],
        }
    }

    /// Records call order and can fail or cancel at a given sample.
    struct FakePipeline {
        calls: Vec<String>,
        in_flight: Option<SampleId>,
        fail_at: Option<usize>,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl FakePipeline {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                in_flight: None,
                fail_at: None,
                cancel_after: None,
            }
        }
    }

    impl DetectionPipeline for FakePipeline {
        fn start(&mut self, sample: &SampleId) -> Result<(), PipelineError> {
            assert!(self.in_flight.is_none(), "second sample started while one in flight");
            self.calls.push(format!("start {sample}"));
            self.in_flight = Some(sample.clone());
            Ok(())
        }

        fn wait_for_result(&mut self) -> Result<DetectionResult, PipelineError> {
            let sample = self.in_flight.take().unwrap();
            self.calls.push(format!("wait {sample}"));
            let n = self.calls.len() / 2;
            if self.fail_at == Some(n) {
                return Err(PipelineError("camera timeout".into()));
            }
            if let Some((after, token)) = &self.cancel_after {
                if n == *after {
                    token.cancel();
                }
            }
            Ok(detection(&sample.group, &sample.sample, n % 2 == 1, &format!("{n}.5")))
        }
    }

    fn plan(n: usize) -> CapturePlan {
        CapturePlan::new((1..=n).map(|i| SampleId::new("G1", i.to_string())).collect())
    }

    #[test]
    fn captures_sequentially_and_writes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.csv");
        let mut pipeline = FakePipeline::new();

        let summary = capture(&mut pipeline, &plan(3), &path, &CancelToken::new()).unwrap();
        assert_eq!(summary, CaptureSummary { rows: 3, ok: 2, ng: 1 });
        assert_eq!(
            pipeline.calls,
            vec!["start G1#1", "wait G1#1", "start G1#2", "wait G1#2", "start G1#3", "wait G1#3"]
        );

        let outcome = read_table(&path).unwrap();
        assert_eq!(outcome.table.len(), 3);
        let first = &outcome.table.rows()[0];
        assert_eq!(first.value("temp"), "1.5");
        assert!(chrono::NaiveDateTime::parse_from_str(&first.timestamp, CAPTURE_TIME_FORMAT).is_ok());
    }

    #[test]
    fn failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.csv");
        let mut pipeline = FakePipeline::new();
        pipeline.fail_at = Some(2);

        let err = capture(&mut pipeline, &plan(3), &path, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CompareError::Detection { ref sample, .. } if sample == "G1#2"));
        assert!(!path.exists());
    }

    #[test]
    fn cancel_between_samples_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.csv");
        let token = CancelToken::new();
        let mut pipeline = FakePipeline::new();
        pipeline.cancel_after = Some((2, token.clone()));

        let err = capture(&mut pipeline, &plan(5), &path, &token).unwrap_err();
        assert!(matches!(
            err,
            CompareError::CaptureCancelled { completed: 2, planned: 5 }
        ));
        assert_eq!(pipeline.calls.len(), 4);
        assert!(!path.exists());
    }

    #[test]
    fn planned_identity_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut pipeline = ReplayPipeline::new(vec![detection("other", "9", true, "1")]);
        let plan = CapturePlan::new(vec![SampleId::new("G1", "1")]);

        capture(&mut pipeline, &plan, &path, &CancelToken::new()).unwrap();
        let outcome = read_table(&path).unwrap();
        assert_eq!(outcome.table.rows()[0].display_key(), "G1#1");
    }

    #[test]
    fn reserved_item_name_stops_capture() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut result = detection("G1", "2", true, "1");
        result.items.push(Measurement { name: "Timestamp".into(), value: "42".into() });
        let mut pipeline = ReplayPipeline::new(vec![detection("G1", "1", true, "1"), result]);
        let plan = CapturePlan::new(vec![SampleId::new("G1", "1"), SampleId::new("G1", "2")]);

        let err = capture(&mut pipeline, &plan, &path, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CompareError::Detection { ref sample, ref message }
            if sample == "G1#2" && message.contains("Timestamp")));
        assert!(!path.exists());
    }

    #[test]
    fn replay_from_json_lines() {
        let input = concat!(
            r#"{"group":"G1","sample":"1","ok":true,"items":[{"name":"temp","value":"10.0"}]}"#,
            "\n\n",
            r#"{"group":"G1","sample":"2","ok":false,"defect_type":"Scratch"}"#,
            "\n"
        );
        let (mut pipeline, plan) = ReplayPipeline::from_json_lines(input.as_bytes()).unwrap();
        assert_eq!(plan.samples(), &[SampleId::new("G1", "1"), SampleId::new("G1", "2")]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let summary = capture(&mut pipeline, &plan, &path, &CancelToken::new()).unwrap();
        assert_eq!(summary, CaptureSummary { rows: 2, ok: 1, ng: 1 });
        let table = read_table(&path).unwrap().table;
        assert_eq!(table.rows()[1].defect_type, "Scratch");
    }

    #[test]
    fn replay_reports_bad_line() {
        let input = "{\"group\":\"G1\",\"sample\":\"1\",\"ok\":true}\nnot json\n";
        let err = ReplayPipeline::from_json_lines(input.as_bytes()).unwrap_err();
        assert!(matches!(err, CompareError::DetectionInput { line: 2, .. }));
    }

    #[test]
    fn replay_rejects_overlapping_start() {
        let mut pipeline = ReplayPipeline::new(vec![detection("G1", "1", true, "1"), detection("G1", "2", true, "1")]);
        pipeline.start(&SampleId::new("G1", "1")).unwrap();
        assert!(pipeline.start(&SampleId::new("G1", "2")).is_err());
    }
}

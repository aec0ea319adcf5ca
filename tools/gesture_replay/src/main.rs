//! Replays recorded touch traces through the gesture recognizers.
//!
//! A trace holds one record per line, `<ms> <add|move|end|cancel> <id> <x> <y>`;
//! consecutive records sharing a timestamp form one frame. Blank lines and
//! `#` comments are skipped. The replay prints one line per emission: state
//! labels (`began`, `ended`, ...), `changed <delta>` for scale frames, and
//! `touch_began <id>` style lines when driving the meta gesture. Within a
//! frame, touch lines precede state lines.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use touchspan::{
    dots_per_centimeter, CancelPolicy, GestureState, MessageTarget, MetaGesture, ScaleConfig,
    ScaleGesture, ScaleNotice, ScreenPosition, TouchFrame, TouchNotice, TouchPoint,
};

#[derive(Debug, Parser)]
#[command(name = "gesture_replay")]
#[command(about = "Replay recorded touch traces through the gesture recognizers")]
struct Cli {
    /// Trace file to replay.
    trace: PathBuf,

    /// Gesture to drive.
    #[arg(long, value_enum, default_value_t = GestureKind::Scale)]
    gesture: GestureKind,

    /// File with the expected output lines; the replay fails on mismatch.
    #[arg(long)]
    expect: Option<PathBuf>,

    /// TOML profile overriding the scale gesture defaults.
    #[arg(long)]
    profile: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GestureKind {
    Scale,
    Meta,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = match cli.profile.as_deref() {
        Some(path) => load_profile(path)?,
        None => ScaleConfig::default(),
    };

    let text = fs::read_to_string(&cli.trace)
        .with_context(|| format!("read trace {}", cli.trace.display()))?;
    let frames = parse_trace(&text)?;

    let lines = match cli.gesture {
        GestureKind::Scale => replay_scale(&frames, config),
        GestureKind::Meta => replay_meta(&frames),
    };
    for line in &lines {
        println!("{line}");
    }

    if let Some(expect) = cli.expect.as_deref() {
        let expected = fs::read_to_string(expect)
            .with_context(|| format!("read expectations {}", expect.display()))?;
        verify(&lines, &expected)?;
    }

    Ok(())
}

/// One frame worth of touch activity, at a single trace timestamp.
#[derive(Clone, Debug, Default)]
struct Frame {
    added: Vec<TouchPoint>,
    moved: Vec<TouchPoint>,
    ended: Vec<TouchPoint>,
    cancelled: Vec<TouchPoint>,
}

impl Frame {
    fn as_touch_frame(&self) -> TouchFrame<'_> {
        TouchFrame {
            added: &self.added,
            moved: &self.moved,
            ended: &self.ended,
            cancelled: &self.cancelled,
        }
    }
}

fn parse_trace(text: &str) -> Result<Vec<Frame>> {
    let mut frames: Vec<Frame> = Vec::new();
    let mut current_ms: Option<u64> = None;
    // Previous positions are synthesized from the last record per touch.
    let mut last_seen: HashMap<u64, ScreenPosition> = HashMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            bail!("line {line_no}: expected `<ms> <add|move|end|cancel> <id> <x> <y>`");
        }
        let ms: u64 = parse_field(fields[0], line_no, "ms")?;
        let id: u64 = parse_field(fields[2], line_no, "id")?;
        let x: f32 = parse_field(fields[3], line_no, "x")?;
        let y: f32 = parse_field(fields[4], line_no, "y")?;
        let position = ScreenPosition::new(x, y);

        if current_ms != Some(ms) {
            frames.push(Frame::default());
            current_ms = Some(ms);
        }
        let slot = frames.len() - 1;
        let frame = &mut frames[slot];

        match fields[1] {
            "add" => {
                last_seen.insert(id, position);
                frame.added.push(TouchPoint::new(id, position));
            }
            "move" => {
                let previous = *last_seen
                    .get(&id)
                    .ok_or_else(|| anyhow!("line {line_no}: move for unknown touch {id}"))?;
                last_seen.insert(id, position);
                frame.moved.push(TouchPoint::new(id, previous).moved_to(position));
            }
            "end" => {
                let previous = last_seen
                    .remove(&id)
                    .ok_or_else(|| anyhow!("line {line_no}: end for unknown touch {id}"))?;
                frame.ended.push(TouchPoint::new(id, previous).moved_to(position));
            }
            "cancel" => {
                let previous = last_seen
                    .remove(&id)
                    .ok_or_else(|| anyhow!("line {line_no}: cancel for unknown touch {id}"))?;
                frame
                    .cancelled
                    .push(TouchPoint::new(id, previous).moved_to(position));
            }
            other => bail!("line {line_no}: unknown record kind `{other}`"),
        }
    }

    Ok(frames)
}

fn parse_field<T: std::str::FromStr>(raw: &str, line_no: usize, field: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|err| anyhow!("line {line_no}: invalid {field} `{raw}`: {err}"))
}

fn replay_scale(frames: &[Frame], config: ScaleConfig) -> Vec<String> {
    let mut gesture = ScaleGesture::with_config(config);
    let mut lines = Vec::new();

    for frame in frames {
        let output = gesture.update(&frame.as_touch_frame());
        for notice in output.iter() {
            match notice {
                // The paired delta line carries the changed transition.
                ScaleNotice::StateChanged(GestureState::Changed) => {}
                ScaleNotice::StateChanged(state) => lines.push(state_label(state).to_string()),
                ScaleNotice::ScaleChanged { delta } => lines.push(format!("changed {delta:.3}")),
            }
        }
    }

    lines
}

struct TouchLog(Rc<RefCell<Vec<String>>>);

impl MessageTarget<TouchNotice> for TouchLog {
    fn receive(&mut self, message: &'static str, payload: &TouchNotice) {
        self.0
            .borrow_mut()
            .push(format!("{message} {}", payload.touch.id));
    }
}

fn replay_meta(frames: &[Frame]) -> Vec<String> {
    let mut gesture = MetaGesture::new();
    let lines: Rc<RefCell<Vec<String>>> = Rc::default();
    gesture
        .notices_mut()
        .set_message_target(TouchLog(Rc::clone(&lines)));

    for frame in frames {
        let output = gesture.update(&frame.as_touch_frame());
        for state in output.iter() {
            lines.borrow_mut().push(state_label(state).to_string());
        }
    }

    let collected = lines.borrow().clone();
    collected
}

fn state_label(state: GestureState) -> &'static str {
    match state {
        GestureState::Possible => "possible",
        GestureState::Began => "began",
        GestureState::Changed => "changed",
        GestureState::Recognized => "recognized",
        GestureState::Ended => "ended",
        GestureState::Cancelled => "cancelled",
        GestureState::Failed => "failed",
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplayProfile {
    min_points_distance: Option<f32>,
    min_points_distance_cm: Option<f32>,
    dots_per_inch: Option<f32>,
    max_points_per_cluster: Option<usize>,
    cancel_policy: Option<CancelMode>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CancelMode {
    End,
    Cancel,
}

fn load_profile(path: &Path) -> Result<ScaleConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read profile {}", path.display()))?;
    let profile: ReplayProfile =
        toml::from_str(&text).with_context(|| format!("parse profile {}", path.display()))?;

    let mut config = ScaleConfig::default();
    if let Some(pixels) = profile.min_points_distance {
        config.min_points_distance = pixels;
    }
    if let Some(centimeters) = profile.min_points_distance_cm {
        let dpi = profile
            .dots_per_inch
            .ok_or_else(|| anyhow!("profile sets min_points_distance_cm without dots_per_inch"))?;
        config.min_points_distance = centimeters * dots_per_centimeter(dpi);
    }
    if let Some(max) = profile.max_points_per_cluster {
        config.max_points_per_cluster = max;
    }
    if let Some(mode) = profile.cancel_policy {
        config.cancel_policy = match mode {
            CancelMode::End => CancelPolicy::EndGesture,
            CancelMode::Cancel => CancelPolicy::CancelGesture,
        };
    }

    Ok(config)
}

fn verify(actual: &[String], expected_text: &str) -> Result<()> {
    let expected: Vec<&str> = expected_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    if actual.iter().map(String::as_str).ne(expected.iter().copied()) {
        bail!(
            "replay mismatch\nexpected: {}\nactual:   {}",
            expected.join(", "),
            actual.join(", ")
        );
    }

    Ok(())
}

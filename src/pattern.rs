use serde::{Deserialize, Serialize};

/// Machine instruction attached to each point of a design
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StitchCommand {
    /// Needle penetrates fabric
    Stitch,
    /// Jump without stitching
    Move,
    /// Switch to the next thread
    ColorChange,
    /// End of pattern
    End,
    /// Cut the thread; position is unchanged
    Trim,
    /// Toggle the sequin feeder on or off
    SequinMode,
    /// Drop a sequin at this point
    SequinEject,
    /// Anything a newer parser may emit that the previewer does not know
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stitch {
    pub x: f64,
    pub y: f64,
    pub command: StitchCommand,
}

impl Stitch {
    pub fn new(x: f64, y: f64, command: StitchCommand) -> Self {
        Self { x, y, command }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternMetadata {
    pub label: Option<String>,
    pub stitch_count: Option<u32>,
    pub color_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternStatistics {
    pub real_stitch_count: u32,
    pub jump_count: u32,
    pub color_change_count: u32,
    pub estimated_time_minutes: f64,
}

/// Axis-aligned box around every stitch coordinate, in design units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate box holding a single point.
    pub fn at(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A loaded embroidery design.
///
/// Built once by a parser and shared read-only afterwards; reloading a file
/// produces a fresh value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub stitches: Vec<Stitch>,
    pub bounds: Option<Bounds>,
    pub color_changes: u32,
    pub metadata: PatternMetadata,
    pub statistics: Option<PatternStatistics>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_stitches(stitches: impl IntoIterator<Item = Stitch>) -> Self {
        let mut pattern = Self::new();
        for stitch in stitches {
            pattern.add_stitch(stitch.x, stitch.y, stitch.command);
        }
        pattern.calculate_bounds();
        pattern
    }

    pub fn add_stitch(&mut self, x: f64, y: f64, command: StitchCommand) {
        self.stitches.push(Stitch::new(x, y, command));
        if command == StitchCommand::ColorChange {
            self.color_changes += 1;
        }
    }

    /// Recompute bounds from the stitch list. An empty pattern has none.
    pub fn calculate_bounds(&mut self) {
        let mut stitches = self.stitches.iter();
        self.bounds = stitches.next().map(|first| {
            let mut bounds = Bounds::at(first.x, first.y);
            for stitch in stitches {
                bounds.include(stitch.x, stitch.y);
            }
            bounds
        });
    }

    pub fn is_empty(&self) -> bool {
        self.stitches.is_empty()
    }
}

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{Table, row};

use crate::csv_writer::CsvSink;
use crate::error::ExportError;
use crate::mappings::{self, DecodedMessage, ObstacleSample, PoseSample};
use crate::region::Region;
use crate::rosbags_io::{self, BagScanner, LogRecord};
use crate::router::{CapacityPolicy, DEFAULT_CAPACITY, EntityRouter, SinkSlot};

/// How obstacle rows are spread over files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ObstacleLayout {
    /// One file per obstacle id, `{base}-obstacle{slot}.csv`
    #[default]
    PerEntity,
    /// All obstacles inside the region in `{base}-obstacles.csv`
    Merged,
}

/// Options for exporting a bag to CSV
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Path to the input .bag file
    pub input: PathBuf,
    /// Existing directory that receives the CSV files
    pub out_dir: PathBuf,
    /// Region obstacles must fall in to be exported
    pub region: Region,
    /// Apply the region to pose samples too
    pub filter_pose: bool,
    /// Maximum number of distinct obstacle ids (per-entity layout)
    pub capacity: usize,
    /// Behavior once more ids than `capacity` show up
    pub on_capacity: CapacityPolicy,
    pub obstacle_layout: ObstacleLayout,
    /// Show progress spinner
    pub show_progress: bool,
}

impl ExportOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            out_dir: PathBuf::from("out"),
            region: Region::Unrestricted,
            filter_pose: false,
            capacity: DEFAULT_CAPACITY,
            on_capacity: CapacityPolicy::Drop,
            obstacle_layout: ObstacleLayout::PerEntity,
            show_progress: false,
        }
    }

    /// File name of the input, used as the prefix of every output file.
    pub fn base_name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string())
    }

    pub fn output_path(&self, suffix: &str) -> PathBuf {
        self.out_dir.join(format!("{}-{}.csv", self.base_name(), suffix))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Initializing,
    Scanning,
    Finalizing,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityReport {
    pub slot: usize,
    pub id: i32,
    pub rows: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub records_scanned: u64,
    pub pose_records: u64,
    pub obstacle_lists: u64,
    pub obstacle_samples: u64,
    pub unrecognized_records: u64,
    pub decode_failures: u64,
    pub poses_filtered_out: u64,
    pub obstacles_filtered_out: u64,
    pub capacity_exceeded: u64,
    pub pose_rows: u64,
    pub obstacle_rows: u64,
    pub entities: Vec<EntityReport>,
}

impl ExportSummary {
    pub fn print_table(&self) {
        let mut counts = Table::new();
        counts.set_titles(row!["Counter", "Value"]);
        counts.add_row(row!["records scanned", self.records_scanned]);
        counts.add_row(row!["pose records", self.pose_records]);
        counts.add_row(row!["obstacle lists", self.obstacle_lists]);
        counts.add_row(row!["obstacle samples", self.obstacle_samples]);
        counts.add_row(row!["unrecognized records", self.unrecognized_records]);
        counts.add_row(row!["decode failures", self.decode_failures]);
        counts.add_row(row!["poses filtered out", self.poses_filtered_out]);
        counts.add_row(row!["obstacles filtered out", self.obstacles_filtered_out]);
        counts.add_row(row!["capacity exceeded", self.capacity_exceeded]);
        counts.add_row(row!["pose rows", self.pose_rows]);
        counts.add_row(row!["obstacle rows", self.obstacle_rows]);
        counts.printstd();

        if !self.entities.is_empty() {
            let mut entities = Table::new();
            entities.set_titles(row!["Slot", "Obstacle id", "Rows", "File"]);
            for e in &self.entities {
                entities.add_row(row![e.slot, e.id, e.rows, e.path.display()]);
            }
            entities.printstd();
        }
    }
}

/// One export run. Owns every output file until [`ExportPipeline::run`] returns.
pub struct ExportPipeline {
    options: ExportOptions,
    state: ExportState,
    router: EntityRouter,
    pose_sink: Option<CsvSink>,
    merged_sink: Option<CsvSink>,
    /// Indexed by `SinkSlot`.
    entity_sinks: Vec<CsvSink>,
    overflowed_ids: HashSet<i32>,
    dumped_first_list: bool,
    summary: ExportSummary,
}

impl ExportPipeline {
    /// Validate the options and open the long-lived sinks.
    pub fn new(options: ExportOptions) -> Result<Self, ExportError> {
        if options.capacity == 0 {
            return Err(ExportError::Configuration("capacity must be >= 1".to_string()));
        }
        if !options.out_dir.is_dir() {
            return Err(ExportError::io(
                &options.out_dir,
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "output directory does not exist; \
                     make sure the target folder exists and is writable",
                ),
            ));
        }

        let pose_path = options.output_path("pose");
        let pose_sink = CsvSink::for_row::<PoseSample>(&pose_path)?;
        tracing::info!("writing poses to {}", pose_path.display());

        let merged_sink = match options.obstacle_layout {
            ObstacleLayout::Merged => {
                let path = options.output_path("obstacles");
                let sink = CsvSink::for_row::<ObstacleSample>(&path)?;
                tracing::info!("writing obstacles to {}", path.display());
                Some(sink)
            }
            ObstacleLayout::PerEntity => None,
        };

        tracing::info!(
            region = %options.region.describe(),
            filter_pose = options.filter_pose,
            "export configured"
        );

        Ok(Self {
            router: EntityRouter::new(options.capacity),
            options,
            state: ExportState::Initializing,
            pose_sink: Some(pose_sink),
            merged_sink,
            entity_sinks: Vec::new(),
            overflowed_ids: HashSet::new(),
            dumped_first_list: false,
            summary: ExportSummary::default(),
        })
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn summary(&self) -> &ExportSummary {
        &self.summary
    }

    fn transition(&mut self, next: ExportState) {
        tracing::debug!(from = ?self.state, to = ?next, "export state");
        self.state = next;
    }

    /// Scan every record once, then close all sinks.
    ///
    /// On a fatal error the sinks opened so far are still flushed before the
    /// error is returned and the pipeline ends in [`ExportState::Failed`].
    pub fn run<I>(&mut self, records: I) -> Result<ExportSummary, ExportError>
    where
        I: IntoIterator<Item = Result<LogRecord, ExportError>>,
    {
        if self.state != ExportState::Initializing {
            return Err(ExportError::InvalidState(format!(
                "export pipeline can only run once (state {:?})",
                self.state
            )));
        }

        self.transition(ExportState::Scanning);
        let scanned = self.scan(records);

        self.transition(ExportState::Finalizing);
        let finalized = self.finalize();

        match (scanned, finalized) {
            (Ok(()), Ok(())) => {
                self.transition(ExportState::Done);
                Ok(self.summary.clone())
            }
            (Err(e), finalized) => {
                if let Err(close_err) = finalized {
                    tracing::warn!("while closing outputs after failure: {close_err}");
                }
                self.transition(ExportState::Failed);
                Err(e)
            }
            (Ok(()), Err(e)) => {
                self.transition(ExportState::Failed);
                Err(e)
            }
        }
    }

    fn scan<I>(&mut self, records: I) -> Result<(), ExportError>
    where
        I: IntoIterator<Item = Result<LogRecord, ExportError>>,
    {
        // progress bar (unknown length)
        let pb = if self.options.show_progress {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} msgs") {
                pb.set_style(style);
            }
            Some(pb)
        } else {
            None
        };

        let result = records.into_iter().try_for_each(|record| {
            let record = record?;
            self.summary.records_scanned += 1;
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            self.handle_record(&record)
        });

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        result
    }

    fn handle_record(&mut self, record: &LogRecord) -> Result<(), ExportError> {
        match mappings::decode(record) {
            Ok(DecodedMessage::Pose(pose)) => {
                self.summary.pose_records += 1;
                self.write_pose(&pose)
            }
            Ok(DecodedMessage::ObstacleList(obstacles)) => {
                self.summary.obstacle_lists += 1;
                if !self.dumped_first_list {
                    self.dumped_first_list = true;
                    tracing::debug!(t = record.timestamp, ?obstacles, "first obstacle list");
                }
                obstacles.iter().try_for_each(|o| self.write_obstacle(o))
            }
            Ok(DecodedMessage::Unrecognized) => {
                self.summary.unrecognized_records += 1;
                Ok(())
            }
            Err(failure) => {
                self.summary.decode_failures += 1;
                tracing::warn!(t = record.timestamp, "{failure}");
                Ok(())
            }
        }
    }

    fn write_pose(&mut self, pose: &PoseSample) -> Result<(), ExportError> {
        let region = &self.options.region;
        if self.options.filter_pose && !region.contains(pose.position.x, pose.position.y) {
            self.summary.poses_filtered_out += 1;
            return Ok(());
        }
        if let Some(sink) = self.pose_sink.as_mut() {
            sink.write_record(pose)?;
            self.summary.pose_rows += 1;
        }
        Ok(())
    }

    fn write_obstacle(&mut self, obstacle: &ObstacleSample) -> Result<(), ExportError> {
        self.summary.obstacle_samples += 1;
        if !self.options.region.contains(obstacle.position.x, obstacle.position.y) {
            self.summary.obstacles_filtered_out += 1;
            return Ok(());
        }

        if let Some(sink) = self.merged_sink.as_mut() {
            sink.write_record(obstacle)?;
            self.summary.obstacle_rows += 1;
            return Ok(());
        }

        let route = match self.router.route(obstacle.id) {
            Ok(route) => route,
            Err(overflow) => {
                self.summary.capacity_exceeded += 1;
                if self.options.on_capacity == CapacityPolicy::Abort {
                    return Err(ExportError::CapacityExceeded {
                        id: overflow.id,
                        capacity: overflow.capacity,
                    });
                }
                if self.overflowed_ids.insert(overflow.id) {
                    tracing::warn!(
                        "obstacle id {} does not fit in {} output files; dropping its samples",
                        overflow.id,
                        overflow.capacity
                    );
                }
                return Ok(());
            }
        };

        if route.is_new {
            let path = self.options.output_path(&format!("obstacle{}", route.slot.0));
            let sink = CsvSink::for_row::<ObstacleSample>(&path)?;
            tracing::debug!(
                id = obstacle.id,
                slot = route.slot.0,
                "new obstacle routed to {}",
                path.display()
            );
            self.entity_sinks.push(sink);
        }
        let SinkSlot(index) = route.slot;
        let sink = self
            .entity_sinks
            .get_mut(index)
            .ok_or_else(|| ExportError::InvalidState(format!("no output open for slot {index}")))?;
        sink.write_record(obstacle)?;
        self.summary.obstacle_rows += 1;
        Ok(())
    }

    /// Close every sink exactly once; keeps going past the first error.
    fn finalize(&mut self) -> Result<(), ExportError> {
        let mut first_err = None;
        let mut close = |sink: CsvSink| -> Option<(PathBuf, u64)> {
            let path = sink.path().to_path_buf();
            match sink.finish() {
                Ok(rows) => Some((path, rows)),
                Err(e) => {
                    tracing::error!("{e}");
                    first_err.get_or_insert(e);
                    None
                }
            }
        };

        if let Some(sink) = self.pose_sink.take() {
            close(sink);
        }
        if let Some(sink) = self.merged_sink.take() {
            close(sink);
        }
        let ids = self.router.ids().to_vec();
        for (slot, (sink, id)) in self.entity_sinks.drain(..).zip(ids).enumerate() {
            if let Some((path, rows)) = close(sink) {
                self.summary.entities.push(EntityReport { slot, id, rows, path });
            }
        }

        tracing::info!(
            records = self.summary.records_scanned,
            decode_failures = self.summary.decode_failures,
            filtered_out = self.summary.obstacles_filtered_out,
            capacity_exceeded = self.summary.capacity_exceeded,
            entities = self.summary.entities.len(),
            "export finished"
        );

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Export the pose and obstacle channels of a bag file to CSV
///
/// # Arguments
///
/// * `options` - Export options
///
/// # Example
///
/// ```rust,no_run
/// use bag2csv::{export_bag, ExportOptions};
///
/// let options = ExportOptions::new("input.bag");
/// let summary = export_bag(&options)?;
/// println!("{} records", summary.records_scanned);
/// # Ok::<(), bag2csv::ExportError>(())
/// ```
pub fn export_bag(options: &ExportOptions) -> Result<ExportSummary, ExportError> {
    tracing::info!("reading {}", options.input.display());
    let bag = rosbags_io::open_bag(&options.input)?;
    let mut pipeline = ExportPipeline::new(options.clone())?;
    pipeline.run(BagScanner::new(&bag))
}

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::color::{ColorBy, ColorMap, Coloring, DepthGradient};
use crate::config::Settings;
use crate::data::export::export_csv;
use crate::data::filter::{FilterState, carry_filter_state, filter_accepted, selected_indices};
use crate::data::loader::{DataSource, load};
use crate::data::model::{Category, Dataset, TrackedVariable, Variable};
use crate::data::pipeline::{PipelineOutput, process};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// How each scatter panel lays out its axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotMode {
    /// x = closure time, y = value.
    #[default]
    TimeSeries,
    /// x = value, y = depth (downwards).
    Profile,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Dataset as loaded, kept so QC settings can be re-applied.
    pub raw: Option<Dataset>,

    /// Normalized dataset, report and QC filter outcome.
    pub output: Option<PipelineOutput>,

    /// Tracked flags the QC filter consults.
    pub tracked: BTreeSet<TrackedVariable>,

    /// Per-category selections.
    pub filters: FilterState,

    /// Accepted records passing the category filters (indices into the
    /// normalized dataset).
    pub visible_indices: Vec<usize>,

    /// Rejected records passing the category filters.
    pub rejected_indices: Vec<usize>,

    pub show_rejected: bool,

    /// Which variables get a scatter panel.
    pub panels: BTreeSet<Variable>,

    pub plot_mode: PlotMode,

    pub color_by: ColorBy,
    pub coloring: Option<Coloring>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Text of the "Open URL" box and whether it is shown.
    pub url_input: String,
    pub url_dialog_open: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            raw: None,
            output: None,
            tracked: TrackedVariable::ALL.into_iter().collect(),
            filters: FilterState::default(),
            visible_indices: Vec::new(),
            rejected_indices: Vec::new(),
            show_rejected: false,
            panels: [
                Variable::Oxygen,
                Variable::Salinity,
                Variable::Nitrate,
                Variable::Silicate,
            ]
            .into_iter()
            .collect(),
            plot_mode: PlotMode::default(),
            color_by: ColorBy::default(),
            coloring: None,
            status_message: None,
            url_input: String::new(),
            url_dialog_open: false,
        }
    }
}

impl AppState {
    pub fn tracked_list(&self) -> Vec<TrackedVariable> {
        self.tracked.iter().copied().collect()
    }

    /// Load a source with the current settings and run the QC stages.
    pub fn open(&mut self, source: DataSource) {
        match load(&source, &self.settings.load_options()) {
            Ok(dataset) => {
                self.settings.last_source = Some(source.to_string());
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {source}: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset, initialise filters and colour.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.raw = Some(dataset);
        self.filters.clear();
        self.status_message = None;
        self.reprocess();
    }

    /// Re-run normalization and filtering from the raw dataset, keeping the
    /// category selections.
    pub fn reprocess(&mut self) {
        let Some(raw) = &self.raw else {
            return;
        };
        let output = process(raw.clone(), &self.settings.qc, &self.tracked_list());
        self.filters = carry_filter_state(&self.filters, &output.normalized);
        self.output = Some(output);
        self.rebuild_coloring();
        self.refilter();
    }

    /// Re-run only the QC filter after the tracked set changed.
    pub fn retrack(&mut self) {
        let tracked = self.tracked_list();
        if let Some(output) = &mut self.output {
            output.qc = filter_accepted(&output.normalized, &tracked);
        }
        self.refilter();
    }

    pub fn toggle_tracked(&mut self, tracked: TrackedVariable) {
        if !self.tracked.remove(&tracked) {
            self.tracked.insert(tracked);
        }
        self.retrack();
    }

    /// Rebuild the colouring from `color_by`.
    pub fn rebuild_coloring(&mut self) {
        self.coloring = self.output.as_ref().map(|output| match self.color_by {
            ColorBy::Depth => Coloring::Depth(DepthGradient::new(output.normalized.depth_range())),
            ColorBy::Category(category) => Coloring::Category(ColorMap::new(
                category,
                &output.normalized.unique_values(category),
            )),
        });
    }

    pub fn set_color_by(&mut self, color_by: ColorBy) {
        self.color_by = color_by;
        self.rebuild_coloring();
    }

    /// Recompute visible / rejected indices after a filter change.
    pub fn refilter(&mut self) {
        let Some(output) = &self.output else {
            self.visible_indices.clear();
            self.rejected_indices.clear();
            return;
        };
        let dataset = &output.normalized;
        let accepted: BTreeSet<usize> = output.qc.indices.iter().copied().collect();
        let rejected: Vec<usize> = (0..dataset.len())
            .filter(|i| !accepted.contains(i))
            .collect();

        self.visible_indices = selected_indices(dataset, &output.qc.indices, &self.filters);
        self.rejected_indices = selected_indices(dataset, &rejected, &self.filters);
    }

    /// Toggle a single value in a category's selection.
    pub fn toggle_filter_value(&mut self, category: Category, value: &Option<String>) {
        let selected = self.filters.entry(category).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Select all values in a category.
    pub fn select_all(&mut self, category: Category) {
        if let Some(output) = &self.output {
            self.filters
                .insert(category, output.normalized.unique_values(category));
            self.refilter();
        }
    }

    /// Deselect all values in a category.
    pub fn select_none(&mut self, category: Category) {
        self.filters.insert(category, BTreeSet::new());
        self.refilter();
    }

    /// Replace the settings and re-apply the QC configuration.
    pub fn apply_settings(&mut self, settings: Settings) {
        let policy_changed = settings.timestamps != self.settings.timestamps;
        self.settings = settings;
        self.reprocess();
        if policy_changed && self.raw.is_some() {
            self.status_message =
                Some("Timestamp policy changed: reopen the dataset to apply it".to_string());
        }
    }

    /// Write the QC-accepted records to `path`.
    pub fn export_accepted(&self, path: &Path) -> Result<()> {
        let output = self.output.as_ref().context("no dataset loaded")?;
        export_csv(&output.qc.accepted, path)
    }
}

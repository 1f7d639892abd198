//! Detect → strip → rebuild lifecycle per source entity, and the batch
//! driver that runs it over the current selection.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::{
    cache::{ProfileCache, SHARED_PROFILE_NAME, circle_profile},
    codec::decode,
    error::CablerigResult,
    graph::{Assembly, GraphBuilder, ProfileBinding},
    host::{EntityRef, HostAdapter, ITEM_LIST_PANEL, SelectMode},
};

/// Whether a build shares the common profile or creates a private one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProfileMode {
    #[default]
    Shared,
    Independent,
}

/// Lifecycle position of a controller. Terminal states stay put until the
/// controller is run again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Detecting,
    Stripping,
    Building,
    Done,
    Skipped,
    Failed,
}

/// Per-entity result reported to the caller. One entity's failure never
/// aborts its siblings.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub enum BuildOutcome {
    Built { container: String },
    Skipped { reason: String },
    Failed { error: String },
}

/// Orchestrates one source entity's generated assembly across repeated runs.
///
/// Running twice with an unchanged name converges to a structurally identical
/// assembly; running after a rename fully replaces the old structure.
pub struct AssemblyController {
    source: EntityRef,
    state: BuildState,
    assembly: Option<Assembly>,
}

impl AssemblyController {
    pub fn new(source: EntityRef) -> Self {
        Self {
            source,
            state: BuildState::Idle,
            assembly: None,
        }
    }

    pub fn source(&self) -> EntityRef {
        self.source
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    pub fn assembly(&self) -> Option<&Assembly> {
        self.assembly.as_ref()
    }

    #[tracing::instrument(skip(self, host, cache), fields(source = self.source.0))]
    pub fn run(
        &mut self,
        host: &mut dyn HostAdapter,
        cache: &mut ProfileCache,
        mode: ProfileMode,
    ) -> BuildOutcome {
        self.state = BuildState::Detecting;
        match host.has_curve_geometry(self.source) {
            Ok(true) => {}
            Ok(false) => {
                self.state = BuildState::Skipped;
                let name = host.entity_name(self.source).unwrap_or_default();
                return BuildOutcome::Skipped {
                    reason: format!("no curve geometry in '{name}'"),
                };
            }
            Err(err) => {
                self.state = BuildState::Failed;
                return BuildOutcome::Failed {
                    error: err.to_string(),
                };
            }
        }

        self.state = BuildState::Stripping;
        if let Err(err) = self.strip(host) {
            self.state = BuildState::Failed;
            return BuildOutcome::Failed {
                error: err.to_string(),
            };
        }

        self.state = BuildState::Building;
        match self.build(host, cache, mode) {
            Ok(assembly) => {
                let container = host
                    .entity_name(assembly.container)
                    .unwrap_or_else(|_| "?".to_string());
                self.assembly = Some(assembly);
                self.state = BuildState::Done;
                BuildOutcome::Built { container }
            }
            Err(err) => {
                self.state = BuildState::Failed;
                BuildOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Remove the assembly held from a previous run, if any. Shared profiles
    /// are never removed; a private profile goes with its assembly.
    pub fn strip(&mut self, host: &mut dyn HostAdapter) -> CablerigResult<()> {
        if let Some(assembly) = self.assembly.take() {
            debug!(container = assembly.container.0, "stripping previous assembly");
            host.remove_entities(&assembly.owned_entities())?;
        }
        Ok(())
    }

    fn build(
        &mut self,
        host: &mut dyn HostAdapter,
        cache: &mut ProfileCache,
        mode: ProfileMode,
    ) -> CablerigResult<Assembly> {
        let name = host.entity_name(self.source)?;
        let params = decode(&name);

        // A container left behind by an earlier session is stale: this run
        // owns the `<basename>_cable` name now.
        if let Some(stale) = host.lookup_named_entity(&params.container_name()) {
            debug!(name = %params.container_name(), "removing stale container");
            host.remove_entities(&[stale])?;
        }

        let (profile, binding) = match mode {
            ProfileMode::Shared => {
                let profile =
                    cache.get_or_create(host, SHARED_PROFILE_NAME, circle_profile)?;
                let binding = ProfileBinding::Shared {
                    name: profile.name.clone(),
                };
                (profile, binding)
            }
            ProfileMode::Independent => {
                let profile = ProfileCache::create_independent(
                    host,
                    &params.profile_basename(),
                    circle_profile,
                )?;
                let binding = ProfileBinding::Independent(profile.clone());
                (profile, binding)
            }
        };

        let result = GraphBuilder::build(host, self.source, &params, &profile, binding);
        if result.is_err() {
            // The graph cleaned up after itself; a just-created private
            // profile must not leak either.
            if mode == ProfileMode::Independent {
                let _ = host.remove_entities(&[profile.entity]);
            }
        }
        result
    }
}

/// One batch run's worth of controllers plus the shared profile cache.
///
/// Re-running a session on the same entities strips and rebuilds instead of
/// accumulating duplicates.
#[derive(Default)]
pub struct RigSession {
    cache: ProfileCache,
    controllers: BTreeMap<EntityRef, AssemblyController>,
}

/// Per-entity outcomes of one batch, in processing order.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct BatchEntry {
    pub entity: String,
    pub outcome: BuildOutcome,
}

impl BatchReport {
    pub fn built_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, BuildOutcome::Built { .. }))
            .count()
    }
}

impl RigSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one entity to completion, reusing the controller from a prior
    /// run of this session if there is one.
    pub fn process(
        &mut self,
        host: &mut dyn HostAdapter,
        source: EntityRef,
        mode: ProfileMode,
    ) -> BuildOutcome {
        self.controllers
            .entry(source)
            .or_insert_with(|| AssemblyController::new(source))
            .run(host, &mut self.cache, mode)
    }

    /// Run the batch over the host's current selection: hide the item-list
    /// panel for the duration, process every entity (failures never abort
    /// siblings), then select the built containers.
    pub fn process_selection(
        &mut self,
        host: &mut dyn HostAdapter,
        mode: ProfileMode,
    ) -> CablerigResult<BatchReport> {
        let selected = host.selected_entities();

        let panel_was_visible = host.editor_panel_visible(ITEM_LIST_PANEL);
        host.set_editor_panel_visible(ITEM_LIST_PANEL, false);
        host.deselect()?;

        let mut report = BatchReport::default();
        let mut built: Vec<EntityRef> = Vec::new();
        for source in selected {
            let entity = host.entity_name(source).unwrap_or_else(|_| "?".to_string());
            let outcome = self.process(host, source, mode);
            match &outcome {
                BuildOutcome::Built { container } => {
                    if let Some(assembly) =
                        self.controllers.get(&source).and_then(|c| c.assembly())
                    {
                        info!(
                            entity = %entity,
                            container = %container,
                            profile = %assembly.profile.profile_name(),
                            "built cable assembly"
                        );
                        built.push(assembly.container);
                    }
                }
                BuildOutcome::Skipped { reason } => info!(entity = %entity, %reason, "skipped"),
                BuildOutcome::Failed { error } => warn!(entity = %entity, %error, "failed"),
            }
            report.entries.push(BatchEntry { entity, outcome });
        }

        if !built.is_empty() {
            host.select(&built, SelectMode::Replace)?;
        }
        host.set_editor_panel_visible(ITEM_LIST_PANEL, panel_was_visible);
        Ok(report)
    }
}

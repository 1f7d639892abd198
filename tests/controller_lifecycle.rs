use cablerig::{
    BuildOutcome, CablerigError, CablerigResult, ChannelRef, ChannelType, ChannelValue, EntityRef,
    HostAdapter, LinkMode, MemoryHost, NodeRef, OpKind, PortRef, ProfileMode, RigSession,
    SelectMode,
};

#[test]
fn skipped_entity_causes_zero_host_mutations() {
    let mut host = MemoryHost::new();
    let block = host.add_mesh("block");
    let before = serde_json::to_string(host.scene()).unwrap();

    let mut session = RigSession::new();
    let outcome = session.process(&mut host, block, ProfileMode::Shared);

    assert!(matches!(outcome, BuildOutcome::Skipped { .. }));
    assert_eq!(serde_json::to_string(host.scene()).unwrap(), before);
}

#[test]
fn rebuild_removes_exactly_the_prior_node_set() {
    let mut host = MemoryHost::new();
    let wire = host.add_curve("Wire[12:s16]");
    let mut session = RigSession::new();

    session.process(&mut host, wire, ProfileMode::Shared);
    let entities = host.entity_count();
    let nodes = host.node_count();
    let links = host.structural_links().len();
    let channel_links = host.channel_links().len();

    for _ in 0..3 {
        session.process(&mut host, wire, ProfileMode::Shared);
        assert_eq!(host.entity_count(), entities);
        assert_eq!(host.node_count(), nodes);
        assert_eq!(host.structural_links().len(), links);
        assert_eq!(host.channel_links().len(), channel_links);
    }
}

#[test]
fn rename_updates_diameter_and_leaves_no_duplicates() {
    let mut host = MemoryHost::new();
    let wire = host.add_curve("A[5]");
    let mut session = RigSession::new();
    session.process(&mut host, wire, ProfileMode::Shared);

    let cable = host.lookup_named_entity("A_cable").unwrap();
    let diameter = ChannelRef::entity(cable, "diameter");
    assert_eq!(
        host.control_channel(&diameter).unwrap().value,
        ChannelValue::Float(0.005)
    );

    let mut scene = host.scene().clone();
    scene.entities.get_mut(&wire.0).unwrap().name = "A[10]".to_string();
    let mut host = MemoryHost::from_scene(scene);

    session.process(&mut host, wire, ProfileMode::Shared);
    assert_eq!(host.entities_named_prefix("A_cable").len(), 1);

    let cable = host.lookup_named_entity("A_cable").unwrap();
    let diameter = ChannelRef::entity(cable, "diameter");
    assert_eq!(
        host.control_channel(&diameter).unwrap().value,
        ChannelValue::Float(0.010)
    );
}

/// Delegating host that rejects operation creation after a budget runs out,
/// standing in for a host that starts refusing commands mid-build.
struct FailingHost {
    inner: MemoryHost,
    ops_left: u32,
}

impl FailingHost {
    fn new(inner: MemoryHost, ops_left: u32) -> Self {
        Self { inner, ops_left }
    }
}

impl HostAdapter for FailingHost {
    fn has_curve_geometry(&self, entity: EntityRef) -> CablerigResult<bool> {
        self.inner.has_curve_geometry(entity)
    }

    fn entity_name(&self, entity: EntityRef) -> CablerigResult<String> {
        self.inner.entity_name(entity)
    }

    fn selected_entities(&self) -> Vec<EntityRef> {
        self.inner.selected_entities()
    }

    fn create_container(&mut self, name: &str) -> CablerigResult<EntityRef> {
        self.inner.create_container(name)
    }

    fn create_operation(&mut self, kind: OpKind, parent: EntityRef) -> CablerigResult<NodeRef> {
        if self.ops_left == 0 {
            return Err(CablerigError::host("operation rejected"));
        }
        self.ops_left -= 1;
        self.inner.create_operation(kind, parent)
    }

    fn find_operation(&self, parent: EntityRef, kind: OpKind) -> Option<NodeRef> {
        self.inner.find_operation(parent, kind)
    }

    fn link_structural(
        &mut self,
        from: PortRef,
        to: NodeRef,
        to_port: &str,
        replace_existing: bool,
    ) -> CablerigResult<()> {
        self.inner.link_structural(from, to, to_port, replace_existing)
    }

    fn create_control_channel(
        &mut self,
        on: EntityRef,
        name: &str,
        ty: ChannelType,
        default: ChannelValue,
    ) -> CablerigResult<ChannelRef> {
        self.inner.create_control_channel(on, name, ty, default)
    }

    fn link_channel(
        &mut self,
        from: ChannelRef,
        to: ChannelRef,
        mode: LinkMode,
    ) -> CablerigResult<()> {
        self.inner.link_channel(from, to, mode)
    }

    fn set_channel_value(
        &mut self,
        channel: ChannelRef,
        value: ChannelValue,
    ) -> CablerigResult<()> {
        self.inner.set_channel_value(channel, value)
    }

    fn lookup_named_entity(&self, name: &str) -> Option<EntityRef> {
        self.inner.lookup_named_entity(name)
    }

    fn remove_entities(&mut self, refs: &[EntityRef]) -> CablerigResult<()> {
        self.inner.remove_entities(refs)
    }

    fn select(&mut self, refs: &[EntityRef], mode: SelectMode) -> CablerigResult<()> {
        self.inner.select(refs, mode)
    }

    fn deselect(&mut self) -> CablerigResult<()> {
        self.inner.deselect()
    }

    fn editor_panel_visible(&self, id: &str) -> bool {
        self.inner.editor_panel_visible(id)
    }

    fn set_editor_panel_visible(&mut self, id: &str, visible: bool) {
        self.inner.set_editor_panel_visible(id, visible)
    }
}

#[test]
fn host_failure_leaves_no_partial_assembly_and_batch_continues() {
    let mut inner = MemoryHost::new();
    let a = inner.add_curve("A[5]");
    let b = inner.add_curve("B[8]");
    inner.select(&[a, b], SelectMode::Replace).unwrap();

    // Budget covers the shared profile's primitive plus one sweep; the
    // first cable's material-tag creation then fails.
    let mut host = FailingHost::new(inner, 2);
    let mut session = RigSession::new();
    let report = session
        .process_selection(&mut host, ProfileMode::Shared)
        .unwrap();

    assert!(matches!(
        report.entries[0].outcome,
        BuildOutcome::Failed { .. }
    ));
    // Sibling still processed (and also fails here, with the budget spent).
    assert_eq!(report.entries.len(), 2);

    // No partial container survived either failure.
    assert!(host.lookup_named_entity("A_cable").is_none());
    assert!(host.lookup_named_entity("B_cable").is_none());
}

#[test]
fn failed_entity_can_be_rebuilt_after_host_recovers() {
    let mut inner = MemoryHost::new();
    let a = inner.add_curve("A[5]");
    inner.select(&[a], SelectMode::Replace).unwrap();

    let mut host = FailingHost::new(inner, 2);
    let mut session = RigSession::new();
    let report = session
        .process_selection(&mut host, ProfileMode::Shared)
        .unwrap();
    assert!(matches!(
        report.entries[0].outcome,
        BuildOutcome::Failed { .. }
    ));

    host.ops_left = u32::MAX;
    let outcome = session.process(&mut host, a, ProfileMode::Shared);
    assert!(matches!(outcome, BuildOutcome::Built { .. }));
    assert_eq!(host.inner.entities_named_prefix("A_cable").len(), 1);
}

//! Capability boundary to the scene/geometry host.
//!
//! The core never touches host state directly; every structural mutation goes
//! through [`HostAdapter`], so a deterministic in-memory host can stand in for
//! the real application in tests and batch runs.

use crate::error::CablerigResult;

/// Opaque identity of a host-owned entity (mesh, container, profile).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct EntityRef(pub u64);

/// Opaque identity of an operation node parented to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeRef(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum OwnerRef {
    Entity(EntityRef),
    Node(NodeRef),
}

/// Address of a structural output port, e.g. an entity's geometry output or a
/// node's computed result.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PortRef {
    pub owner: OwnerRef,
    pub port: String,
}

impl PortRef {
    pub fn entity(entity: EntityRef, port: impl Into<String>) -> Self {
        Self {
            owner: OwnerRef::Entity(entity),
            port: port.into(),
        }
    }

    pub fn node(node: NodeRef, port: impl Into<String>) -> Self {
        Self {
            owner: OwnerRef::Node(node),
            port: port.into(),
        }
    }
}

/// Address of a value channel: an exposed control channel on an entity, or a
/// named input on an operation node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ChannelRef {
    pub owner: OwnerRef,
    pub name: String,
}

impl ChannelRef {
    pub fn entity(entity: EntityRef, name: impl Into<String>) -> Self {
        Self {
            owner: OwnerRef::Entity(entity),
            name: name.into(),
        }
    }

    pub fn node(node: NodeRef, name: impl Into<String>) -> Self {
        Self {
            owner: OwnerRef::Node(node),
            name: name.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum OpKind {
    Sweep,
    MaterialTag,
    PolygonType,
    Multiply,
    PrimitiveProfile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelType {
    Distance,
    Percent,
    Integer,
    Boolean,
    String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ChannelValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
}

impl ChannelValue {
    /// Whether this value is assignable to a channel of the given type.
    pub fn matches(&self, ty: ChannelType) -> bool {
        matches!(
            (self, ty),
            (ChannelValue::Float(_), ChannelType::Distance)
                | (ChannelValue::Float(_), ChannelType::Percent)
                | (ChannelValue::Int(_), ChannelType::Integer)
                | (ChannelValue::Bool(_), ChannelType::Boolean)
                | (ChannelValue::Str(_), ChannelType::String)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkMode {
    Add,
    Replace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectMode {
    Replace,
    Add,
}

/// Well-known port and channel names on the host's operation kinds.
pub mod port {
    /// Geometry output of an entity.
    pub const OUT: &str = "out";

    pub const SWEEP_PATH: &str = "path";
    pub const SWEEP_PROFILE: &str = "profile";
    pub const SWEEP_SIZE: &str = "size";
    pub const SWEEP_STEPS: &str = "steps";
    pub const SWEEP_FLIP: &str = "flip";
    pub const SWEEP_EXTRUDE_SHAPE: &str = "extrudeShape";
    pub const SWEEP_USE_SIZE: &str = "useSize";

    pub const TAG_MATERIAL_NAME: &str = "materialName";
    pub const SET_TYPE: &str = "type";

    pub const MUL_INPUT1: &str = "input1";
    pub const MUL_INPUT2: &str = "input2";
    pub const MUL_OUTPUT: &str = "output";

    pub const PRIM_SIDES: &str = "sides";
    pub const PRIM_RADIUS: &str = "radius";
    pub const PRIM_AXIS: &str = "axis";
}

/// Editor panel toggled off for the duration of a batch run.
pub const ITEM_LIST_PANEL: &str = "itemList";

/// Capability set the core requires from the scene host.
///
/// Calls are synchronous and blocking; each must complete or fail before the
/// next is issued (the host owns command execution).
pub trait HostAdapter {
    fn has_curve_geometry(&self, entity: EntityRef) -> CablerigResult<bool>;
    fn entity_name(&self, entity: EntityRef) -> CablerigResult<String>;
    fn selected_entities(&self) -> Vec<EntityRef>;

    fn create_container(&mut self, name: &str) -> CablerigResult<EntityRef>;
    fn create_operation(&mut self, kind: OpKind, parent: EntityRef) -> CablerigResult<NodeRef>;
    fn find_operation(&self, parent: EntityRef, kind: OpKind) -> Option<NodeRef>;

    fn link_structural(
        &mut self,
        from: PortRef,
        to: NodeRef,
        to_port: &str,
        replace_existing: bool,
    ) -> CablerigResult<()>;

    fn create_control_channel(
        &mut self,
        on: EntityRef,
        name: &str,
        ty: ChannelType,
        default: ChannelValue,
    ) -> CablerigResult<ChannelRef>;

    fn link_channel(
        &mut self,
        from: ChannelRef,
        to: ChannelRef,
        mode: LinkMode,
    ) -> CablerigResult<()>;

    fn set_channel_value(&mut self, channel: ChannelRef, value: ChannelValue)
    -> CablerigResult<()>;

    fn lookup_named_entity(&self, name: &str) -> Option<EntityRef>;
    fn remove_entities(&mut self, refs: &[EntityRef]) -> CablerigResult<()>;

    fn select(&mut self, refs: &[EntityRef], mode: SelectMode) -> CablerigResult<()>;
    fn deselect(&mut self) -> CablerigResult<()>;

    fn editor_panel_visible(&self, id: &str) -> bool;
    fn set_editor_panel_visible(&mut self, id: &str, visible: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_value_type_check() {
        assert!(ChannelValue::Float(0.01).matches(ChannelType::Distance));
        assert!(ChannelValue::Float(100.0).matches(ChannelType::Percent));
        assert!(ChannelValue::Int(8).matches(ChannelType::Integer));
        assert!(ChannelValue::Bool(true).matches(ChannelType::Boolean));
        assert!(ChannelValue::Str("brass".into()).matches(ChannelType::String));

        assert!(!ChannelValue::Int(8).matches(ChannelType::Distance));
        assert!(!ChannelValue::Float(1.0).matches(ChannelType::Integer));
    }

    #[test]
    fn refs_are_value_keys() {
        let a = ChannelRef::entity(EntityRef(1), "diameter");
        let b = ChannelRef::entity(EntityRef(1), "diameter");
        assert_eq!(a, b);
        assert_ne!(a, ChannelRef::entity(EntityRef(2), "diameter"));
        assert_ne!(a, ChannelRef::node(NodeRef(1), "diameter"));
    }
}

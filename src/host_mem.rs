//! In-memory scene host with JSON persistence.
//!
//! `MemoryHost` implements the full [`HostAdapter`] capability set against a
//! serializable scene document. The CLI runs batches against it, and tests
//! use it as the deterministic stand-in for a real application host.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;

use crate::{
    error::{CablerigError, CablerigResult},
    host::{
        ChannelRef, ChannelType, ChannelValue, EntityRef, HostAdapter, LinkMode, NodeRef, OpKind,
        OwnerRef, PortRef, SelectMode,
    },
};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EntityRec {
    pub name: String,
    /// Whether the entity's geometry contains curve polygons (curve, Bezier,
    /// B-spline all collapse to this one flag).
    pub curve: bool,
    #[serde(default)]
    pub channels: BTreeMap<String, ControlChannel>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ControlChannel {
    pub ty: ChannelType,
    pub value: ChannelValue,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NodeRec {
    pub kind: OpKind,
    pub parent: EntityRef,
    #[serde(default)]
    pub settings: BTreeMap<String, ChannelValue>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructuralLink {
    pub from: PortRef,
    pub to: NodeRef,
    pub to_port: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelLink {
    pub from: ChannelRef,
    pub to: ChannelRef,
}

/// Serializable scene state, stable under BTreeMap key order.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SceneDoc {
    pub next_id: u64,
    pub entities: BTreeMap<u64, EntityRec>,
    pub nodes: BTreeMap<u64, NodeRec>,
    pub links: Vec<StructuralLink>,
    pub channel_links: Vec<ChannelLink>,
    pub selection: Vec<EntityRef>,
    pub panels: BTreeMap<String, bool>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    scene: SceneDoc,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scene(scene: SceneDoc) -> Self {
        Self { scene }
    }

    pub fn scene(&self) -> &SceneDoc {
        &self.scene
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open scene '{}'", path.display()))?;
        let scene: SceneDoc = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| "parse scene JSON")?;
        Ok(Self { scene })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let f = std::fs::File::create(path)
            .with_context(|| format!("write scene '{}'", path.display()))?;
        serde_json::to_writer_pretty(f, &self.scene).with_context(|| "serialize scene JSON")?;
        Ok(())
    }

    /// Add a curve-bearing mesh entity (fixture helper).
    pub fn add_curve(&mut self, name: &str) -> EntityRef {
        self.add_entity(name, true)
    }

    /// Add a plain mesh entity without curve geometry (fixture helper).
    pub fn add_mesh(&mut self, name: &str) -> EntityRef {
        self.add_entity(name, false)
    }

    fn add_entity(&mut self, name: &str, curve: bool) -> EntityRef {
        let id = self.alloc_id();
        self.scene.entities.insert(
            id,
            EntityRec {
                name: name.to_string(),
                curve,
                channels: BTreeMap::new(),
            },
        );
        EntityRef(id)
    }

    fn alloc_id(&mut self) -> u64 {
        self.scene.next_id += 1;
        self.scene.next_id
    }

    pub fn entity_count(&self) -> usize {
        self.scene.entities.len()
    }

    pub fn node_count(&self) -> usize {
        self.scene.nodes.len()
    }

    pub fn entities_named_prefix(&self, prefix: &str) -> Vec<EntityRef> {
        self.scene
            .entities
            .iter()
            .filter(|(_, rec)| rec.name.starts_with(prefix))
            .map(|(&id, _)| EntityRef(id))
            .collect()
    }

    pub fn nodes_of(&self, parent: EntityRef) -> Vec<NodeRef> {
        self.scene
            .nodes
            .iter()
            .filter(|(_, rec)| rec.parent == parent)
            .map(|(&id, _)| NodeRef(id))
            .collect()
    }

    pub fn structural_links(&self) -> &[StructuralLink] {
        &self.scene.links
    }

    pub fn channel_links(&self) -> &[ChannelLink] {
        &self.scene.channel_links
    }

    pub fn control_channel(&self, channel: &ChannelRef) -> Option<&ControlChannel> {
        let OwnerRef::Entity(EntityRef(id)) = channel.owner else {
            return None;
        };
        self.scene.entities.get(&id)?.channels.get(&channel.name)
    }

    pub fn node_setting(&self, node: NodeRef, name: &str) -> Option<&ChannelValue> {
        self.scene.nodes.get(&node.0)?.settings.get(name)
    }

    pub fn node_kind(&self, node: NodeRef) -> Option<OpKind> {
        self.scene.nodes.get(&node.0).map(|rec| rec.kind)
    }

    fn entity(&self, entity: EntityRef) -> CablerigResult<&EntityRec> {
        self.scene
            .entities
            .get(&entity.0)
            .ok_or_else(|| CablerigError::host(format!("unknown entity #{}", entity.0)))
    }

    fn owner_exists(&self, owner: OwnerRef) -> bool {
        match owner {
            OwnerRef::Entity(e) => self.scene.entities.contains_key(&e.0),
            OwnerRef::Node(n) => self.scene.nodes.contains_key(&n.0),
        }
    }
}

impl HostAdapter for MemoryHost {
    fn has_curve_geometry(&self, entity: EntityRef) -> CablerigResult<bool> {
        Ok(self.entity(entity)?.curve)
    }

    fn entity_name(&self, entity: EntityRef) -> CablerigResult<String> {
        Ok(self.entity(entity)?.name.clone())
    }

    fn selected_entities(&self) -> Vec<EntityRef> {
        self.scene.selection.clone()
    }

    fn create_container(&mut self, name: &str) -> CablerigResult<EntityRef> {
        let id = self.alloc_id();
        self.scene.entities.insert(
            id,
            EntityRec {
                name: name.to_string(),
                curve: false,
                channels: BTreeMap::new(),
            },
        );
        Ok(EntityRef(id))
    }

    fn create_operation(&mut self, kind: OpKind, parent: EntityRef) -> CablerigResult<NodeRef> {
        self.entity(parent)?;
        let id = self.alloc_id();
        self.scene.nodes.insert(
            id,
            NodeRec {
                kind,
                parent,
                settings: BTreeMap::new(),
            },
        );
        Ok(NodeRef(id))
    }

    fn find_operation(&self, parent: EntityRef, kind: OpKind) -> Option<NodeRef> {
        self.scene
            .nodes
            .iter()
            .find(|(_, rec)| rec.parent == parent && rec.kind == kind)
            .map(|(&id, _)| NodeRef(id))
    }

    fn link_structural(
        &mut self,
        from: PortRef,
        to: NodeRef,
        to_port: &str,
        replace_existing: bool,
    ) -> CablerigResult<()> {
        if !self.owner_exists(from.owner) {
            return Err(CablerigError::host(format!(
                "structural link from dangling ref {:?}",
                from.owner
            )));
        }
        if !self.scene.nodes.contains_key(&to.0) {
            return Err(CablerigError::host(format!("unknown node #{}", to.0)));
        }
        if replace_existing {
            self.scene
                .links
                .retain(|l| !(l.to == to && l.to_port == to_port));
        }
        self.scene.links.push(StructuralLink {
            from,
            to,
            to_port: to_port.to_string(),
        });
        Ok(())
    }

    fn create_control_channel(
        &mut self,
        on: EntityRef,
        name: &str,
        ty: ChannelType,
        default: ChannelValue,
    ) -> CablerigResult<ChannelRef> {
        if !default.matches(ty) {
            return Err(CablerigError::host(format!(
                "channel '{name}' default {default:?} does not match type {ty:?}"
            )));
        }
        let rec = self
            .scene
            .entities
            .get_mut(&on.0)
            .ok_or_else(|| CablerigError::host(format!("unknown entity #{}", on.0)))?;
        if rec.channels.contains_key(name) {
            return Err(CablerigError::host(format!(
                "channel '{name}' already exists on '{}'",
                rec.name
            )));
        }
        rec.channels
            .insert(name.to_string(), ControlChannel { ty, value: default });
        Ok(ChannelRef::entity(on, name))
    }

    fn link_channel(
        &mut self,
        from: ChannelRef,
        to: ChannelRef,
        mode: LinkMode,
    ) -> CablerigResult<()> {
        for side in [&from, &to] {
            if !self.owner_exists(side.owner) {
                return Err(CablerigError::host(format!(
                    "channel link touches dangling ref {:?}",
                    side.owner
                )));
            }
        }
        if mode == LinkMode::Replace {
            self.scene.channel_links.retain(|l| l.to != to);
        }
        self.scene.channel_links.push(ChannelLink { from, to });
        Ok(())
    }

    fn set_channel_value(
        &mut self,
        channel: ChannelRef,
        value: ChannelValue,
    ) -> CablerigResult<()> {
        match channel.owner {
            OwnerRef::Entity(e) => {
                let rec = self
                    .scene
                    .entities
                    .get_mut(&e.0)
                    .ok_or_else(|| CablerigError::host(format!("unknown entity #{}", e.0)))?;
                let ch = rec.channels.get_mut(&channel.name).ok_or_else(|| {
                    CablerigError::host(format!(
                        "no control channel '{}' on '{}'",
                        channel.name, rec.name
                    ))
                })?;
                if !value.matches(ch.ty) {
                    return Err(CablerigError::host(format!(
                        "value {value:?} does not match channel '{}' type {:?}",
                        channel.name, ch.ty
                    )));
                }
                ch.value = value;
            }
            // Node ports are untyped settings; any value is accepted.
            OwnerRef::Node(n) => {
                let rec = self
                    .scene
                    .nodes
                    .get_mut(&n.0)
                    .ok_or_else(|| CablerigError::host(format!("unknown node #{}", n.0)))?;
                rec.settings.insert(channel.name, value);
            }
        }
        Ok(())
    }

    fn lookup_named_entity(&self, name: &str) -> Option<EntityRef> {
        self.scene
            .entities
            .iter()
            .find(|(_, rec)| rec.name == name)
            .map(|(&id, _)| EntityRef(id))
    }

    fn remove_entities(&mut self, refs: &[EntityRef]) -> CablerigResult<()> {
        // Removal is idempotent: refs already gone are skipped, so a strip
        // never trips over entities another controller swept away first.
        for &entity in refs {
            if self.scene.entities.remove(&entity.0).is_none() {
                continue;
            }
            let dead_nodes: Vec<u64> = self
                .scene
                .nodes
                .iter()
                .filter(|(_, rec)| rec.parent == entity)
                .map(|(&id, _)| id)
                .collect();
            for id in &dead_nodes {
                self.scene.nodes.remove(id);
            }

            let gone = |owner: OwnerRef| match owner {
                OwnerRef::Entity(e) => e == entity,
                OwnerRef::Node(n) => dead_nodes.contains(&n.0),
            };
            self.scene
                .links
                .retain(|l| !gone(l.from.owner) && !gone(OwnerRef::Node(l.to)));
            self.scene
                .channel_links
                .retain(|l| !gone(l.from.owner) && !gone(l.to.owner));
            self.scene.selection.retain(|&e| e != entity);
        }
        Ok(())
    }

    fn select(&mut self, refs: &[EntityRef], mode: SelectMode) -> CablerigResult<()> {
        for &entity in refs {
            self.entity(entity)?;
        }
        if mode == SelectMode::Replace {
            self.scene.selection.clear();
        }
        for &entity in refs {
            if !self.scene.selection.contains(&entity) {
                self.scene.selection.push(entity);
            }
        }
        Ok(())
    }

    fn deselect(&mut self) -> CablerigResult<()> {
        self.scene.selection.clear();
        Ok(())
    }

    fn editor_panel_visible(&self, id: &str) -> bool {
        self.scene.panels.get(id).copied().unwrap_or(true)
    }

    fn set_editor_panel_visible(&mut self, id: &str, visible: bool) {
        self.scene.panels.insert(id.to_string(), visible);
    }
}

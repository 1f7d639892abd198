//! Get-or-create registry for shareable cross-section profiles.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    error::{CablerigError, CablerigResult},
    host::{
        ChannelRef, ChannelType, ChannelValue, EntityRef, HostAdapter, LinkMode, NodeRef, OpKind,
        port,
    },
    model::{DEFAULT_SIDES, channel},
};

/// Name of the cross-section profile shared by all cables built without the
/// independent flag.
pub const SHARED_PROFILE_NAME: &str = "cable_profile_circle";

/// A named, host-resident cross-section resource and its generating
/// primitive. Identity is the name; the cache guarantees at most one live
/// instance per name.
#[derive(Clone, Debug, PartialEq)]
pub struct ShareableProfile {
    pub name: String,
    pub entity: EntityRef,
    pub primitive: NodeRef,
    /// Side-count control channel, owned by the profile: one cross-section,
    /// one side count, shared by every assembly that sweeps it.
    pub sides: ChannelRef,
}

/// Registry of shared profiles, keyed by name. The only state shared across
/// entities within a batch.
#[derive(Debug, Default)]
pub struct ProfileCache {
    profiles: BTreeMap<String, ShareableProfile>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the profile registered under `name`, adopting an existing
    /// host entity of that name if one is present, and otherwise building a
    /// fresh one with `factory`. The factory runs at most once per name.
    pub fn get_or_create<F>(
        &mut self,
        host: &mut dyn HostAdapter,
        name: &str,
        factory: F,
    ) -> CablerigResult<ShareableProfile>
    where
        F: FnOnce(&mut dyn HostAdapter, &str) -> CablerigResult<ShareableProfile>,
    {
        if let Some(profile) = self.profiles.get(name) {
            return Ok(profile.clone());
        }

        let profile = match host.lookup_named_entity(name) {
            Some(entity) => {
                debug!(name, "adopting existing profile entity");
                adopt_profile(host, name, entity)?
            }
            None => factory(host, name)?,
        };
        self.profiles.insert(name.to_string(), profile.clone());
        Ok(profile)
    }

    /// Build a fresh, uniquely-named profile outside the cache. The result
    /// is owned solely by the requesting assembly and is never shared.
    pub fn create_independent<F>(
        host: &mut dyn HostAdapter,
        base_name: &str,
        factory: F,
    ) -> CablerigResult<ShareableProfile>
    where
        F: FnOnce(&mut dyn HostAdapter, &str) -> CablerigResult<ShareableProfile>,
    {
        let name = unique_name(host, base_name);
        factory(host, &name)
    }
}

/// Rebuild a `ShareableProfile` handle for an entity created by an earlier
/// run (e.g. loaded from a saved scene).
fn adopt_profile(
    host: &dyn HostAdapter,
    name: &str,
    entity: EntityRef,
) -> CablerigResult<ShareableProfile> {
    let primitive = host
        .find_operation(entity, OpKind::PrimitiveProfile)
        .ok_or_else(|| {
            CablerigError::host(format!("profile entity '{name}' has no generating primitive"))
        })?;
    Ok(ShareableProfile {
        name: name.to_string(),
        entity,
        primitive,
        sides: ChannelRef::entity(entity, channel::SIDES),
    })
}

fn unique_name(host: &dyn HostAdapter, base: &str) -> String {
    if host.lookup_named_entity(base).is_none() {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}_{n}");
        if host.lookup_named_entity(&candidate).is_none() {
            return candidate;
        }
        n += 1;
    }
}

/// Default circle-profile factory: a profile entity carrying a circle
/// primitive (radius 0.5, swept around y) whose side count is driven by a
/// `sides` control channel on the profile entity.
pub fn circle_profile(
    host: &mut dyn HostAdapter,
    name: &str,
) -> CablerigResult<ShareableProfile> {
    let entity = host.create_container(name)?;
    let primitive = host.create_operation(OpKind::PrimitiveProfile, entity)?;
    host.set_channel_value(
        ChannelRef::node(primitive, port::PRIM_RADIUS),
        ChannelValue::Float(0.5),
    )?;
    host.set_channel_value(
        ChannelRef::node(primitive, port::PRIM_AXIS),
        ChannelValue::Str("y".to_string()),
    )?;

    let sides = host.create_control_channel(
        entity,
        channel::SIDES,
        ChannelType::Integer,
        ChannelValue::Int(i64::from(DEFAULT_SIDES)),
    )?;
    host.link_channel(
        sides.clone(),
        ChannelRef::node(primitive, port::PRIM_SIDES),
        LinkMode::Replace,
    )?;

    Ok(ShareableProfile {
        name: name.to_string(),
        entity,
        primitive,
        sides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_mem::MemoryHost;

    #[test]
    fn get_or_create_builds_once() {
        let mut host = MemoryHost::new();
        let mut cache = ProfileCache::new();
        let mut calls = 0u32;

        let a = cache
            .get_or_create(&mut host, SHARED_PROFILE_NAME, |host, name| {
                calls += 1;
                circle_profile(host, name)
            })
            .unwrap();
        let b = cache
            .get_or_create(&mut host, SHARED_PROFILE_NAME, |host, name| {
                calls += 1;
                circle_profile(host, name)
            })
            .unwrap();
        assert_eq!(a.entity, b.entity);
        assert_eq!(calls, 1);
        assert_eq!(host.entity_count(), 1);
    }

    #[test]
    fn existing_host_entity_is_adopted_not_rebuilt() {
        let mut host = MemoryHost::new();
        let first = circle_profile(&mut host, SHARED_PROFILE_NAME).unwrap();

        let mut cache = ProfileCache::new();
        let mut calls = 0u32;
        let adopted = cache
            .get_or_create(&mut host, SHARED_PROFILE_NAME, |host, name| {
                calls += 1;
                circle_profile(host, name)
            })
            .unwrap();
        assert_eq!(calls, 0);
        assert_eq!(adopted.entity, first.entity);
        assert_eq!(adopted.primitive, first.primitive);
    }

    #[test]
    fn independent_profiles_get_unique_names() {
        let mut host = MemoryHost::new();
        let a = ProfileCache::create_independent(&mut host, "wire_profile", circle_profile)
            .unwrap();
        let b = ProfileCache::create_independent(&mut host, "wire_profile", circle_profile)
            .unwrap();
        assert_ne!(a.entity, b.entity);
        assert_eq!(a.name, "wire_profile");
        assert_eq!(b.name, "wire_profile_2");
    }

    #[test]
    fn circle_profile_wires_sides_to_primitive() {
        let mut host = MemoryHost::new();
        let p = circle_profile(&mut host, "p").unwrap();
        assert!(
            host.channel_links()
                .iter()
                .any(|l| l.from == p.sides
                    && l.to == ChannelRef::node(p.primitive, port::PRIM_SIDES))
        );
        assert_eq!(
            host.node_setting(p.primitive, port::PRIM_RADIUS),
            Some(&ChannelValue::Float(0.5))
        );
    }
}

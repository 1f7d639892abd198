//! Construction of the fixed-topology cable assembly graph.
//!
//! The topology never varies with the parameters; only channel values do.
//! Node creation precedes every link that references a node, and links
//! precede value assignment, matching the host's synchronous command model.

use crate::{
    cache::ShareableProfile,
    error::{CablerigError, CablerigResult},
    host::{
        ChannelRef, ChannelType, ChannelValue, EntityRef, HostAdapter, LinkMode, NodeRef, OpKind,
        PortRef, port,
    },
    model::{ParameterSet, channel},
};

/// How an assembly holds its cross-section profile.
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileBinding {
    /// Back-reference into the profile cache; the assembly does not own the
    /// profile's lifetime.
    Shared { name: String },
    /// Private profile created for this assembly alone; stripped with it.
    Independent(ShareableProfile),
}

impl ProfileBinding {
    pub fn profile_name(&self) -> &str {
        match self {
            ProfileBinding::Shared { name } => name,
            ProfileBinding::Independent(profile) => &profile.name,
        }
    }
}

/// Exposed control channels on the assembly container.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlChannels {
    pub diameter: ChannelRef,
    pub compensation: ChannelRef,
    pub polygon_type: ChannelRef,
    pub steps: ChannelRef,
    pub flip: ChannelRef,
    pub material: ChannelRef,
}

/// The complete generated node/channel graph for one source entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Assembly {
    pub container: EntityRef,
    pub sweep: NodeRef,
    pub material_tag: NodeRef,
    pub polygon_type: NodeRef,
    pub multiply: NodeRef,
    pub channels: ControlChannels,
    pub profile: ProfileBinding,
}

impl Assembly {
    /// Entities removed when this assembly is stripped: the container always,
    /// plus the private profile when the binding is independent.
    pub fn owned_entities(&self) -> Vec<EntityRef> {
        let mut refs = vec![self.container];
        if let ProfileBinding::Independent(profile) = &self.profile {
            refs.push(profile.entity);
        }
        refs
    }
}

pub struct GraphBuilder;

impl GraphBuilder {
    /// Build the assembly graph for `source`, swept with `profile`, and
    /// write `params` into its control channels.
    ///
    /// Aborts before any mutation when `source` has no curve geometry. On a
    /// host failure mid-build the container created so far is removed again,
    /// so no partial graph outlives the error.
    pub fn build(
        host: &mut dyn HostAdapter,
        source: EntityRef,
        params: &ParameterSet,
        profile: &ShareableProfile,
        binding: ProfileBinding,
    ) -> CablerigResult<Assembly> {
        if !host.has_curve_geometry(source)? {
            let name = host.entity_name(source).unwrap_or_default();
            return Err(CablerigError::not_a_curve(name));
        }

        let container = host.create_container(&params.container_name())?;
        match Self::build_inner(host, source, params, profile, binding, container) {
            Ok(assembly) => Ok(assembly),
            Err(err) => {
                // Best effort; the original failure is the one reported.
                let _ = host.remove_entities(&[container]);
                Err(err)
            }
        }
    }

    fn build_inner(
        host: &mut dyn HostAdapter,
        source: EntityRef,
        params: &ParameterSet,
        profile: &ShareableProfile,
        binding: ProfileBinding,
        container: EntityRef,
    ) -> CablerigResult<Assembly> {
        // Sweep along the source curve, cross-section from the profile.
        let sweep = host.create_operation(OpKind::Sweep, container)?;
        host.link_structural(
            PortRef::entity(source, port::OUT),
            sweep,
            port::SWEEP_PATH,
            false,
        )?;
        host.link_structural(
            PortRef::entity(profile.entity, port::OUT),
            sweep,
            port::SWEEP_PROFILE,
            false,
        )?;
        host.set_channel_value(
            ChannelRef::node(sweep, port::SWEEP_EXTRUDE_SHAPE),
            ChannelValue::Str("linked".to_string()),
        )?;
        host.set_channel_value(
            ChannelRef::node(sweep, port::SWEEP_USE_SIZE),
            ChannelValue::Bool(false),
        )?;

        let material_tag = host.create_operation(OpKind::MaterialTag, container)?;
        let polygon_type = host.create_operation(OpKind::PolygonType, container)?;

        // Size = diameter scaled by compensation, replacing any prior driver.
        let multiply = host.create_operation(OpKind::Multiply, container)?;
        host.link_structural(
            PortRef::node(multiply, port::MUL_OUTPUT),
            sweep,
            port::SWEEP_SIZE,
            true,
        )?;

        let channels = Self::create_channels(host, container)?;
        Self::link_channels(host, &channels, sweep, material_tag, polygon_type, multiply)?;
        Self::apply_params(host, &channels, profile, params)?;

        Ok(Assembly {
            container,
            sweep,
            material_tag,
            polygon_type,
            multiply,
            channels,
            profile: binding,
        })
    }

    fn create_channels(
        host: &mut dyn HostAdapter,
        container: EntityRef,
    ) -> CablerigResult<ControlChannels> {
        let defaults = ParameterSet::default();
        Ok(ControlChannels {
            diameter: host.create_control_channel(
                container,
                channel::DIAMETER,
                ChannelType::Distance,
                ChannelValue::Float(defaults.diameter),
            )?,
            compensation: host.create_control_channel(
                container,
                channel::COMPENSATION,
                ChannelType::Percent,
                ChannelValue::Float(defaults.compensation),
            )?,
            polygon_type: host.create_control_channel(
                container,
                channel::POLYGON_TYPE,
                ChannelType::Integer,
                ChannelValue::Int(i64::from(defaults.polygon_type)),
            )?,
            steps: host.create_control_channel(
                container,
                channel::STEPS,
                ChannelType::Integer,
                ChannelValue::Int(i64::from(defaults.steps)),
            )?,
            flip: host.create_control_channel(
                container,
                channel::FLIP,
                ChannelType::Boolean,
                ChannelValue::Bool(defaults.flip),
            )?,
            material: host.create_control_channel(
                container,
                channel::MATERIAL_NAME,
                ChannelType::String,
                ChannelValue::Str(defaults.material),
            )?,
        })
    }

    fn link_channels(
        host: &mut dyn HostAdapter,
        channels: &ControlChannels,
        sweep: NodeRef,
        material_tag: NodeRef,
        polygon_type: NodeRef,
        multiply: NodeRef,
    ) -> CablerigResult<()> {
        let links = [
            (&channels.diameter, ChannelRef::node(multiply, port::MUL_INPUT1)),
            (
                &channels.compensation,
                ChannelRef::node(multiply, port::MUL_INPUT2),
            ),
            (&channels.steps, ChannelRef::node(sweep, port::SWEEP_STEPS)),
            (&channels.flip, ChannelRef::node(sweep, port::SWEEP_FLIP)),
            (
                &channels.polygon_type,
                ChannelRef::node(polygon_type, port::SET_TYPE),
            ),
            (
                &channels.material,
                ChannelRef::node(material_tag, port::TAG_MATERIAL_NAME),
            ),
        ];
        for (from, to) in links {
            host.link_channel(from.clone(), to, LinkMode::Replace)?;
        }
        Ok(())
    }

    /// The only step that writes concrete values; everything before it is
    /// pure structure.
    fn apply_params(
        host: &mut dyn HostAdapter,
        channels: &ControlChannels,
        profile: &ShareableProfile,
        params: &ParameterSet,
    ) -> CablerigResult<()> {
        host.set_channel_value(
            channels.diameter.clone(),
            ChannelValue::Float(params.diameter),
        )?;
        host.set_channel_value(
            channels.compensation.clone(),
            ChannelValue::Float(params.compensation),
        )?;
        host.set_channel_value(
            channels.polygon_type.clone(),
            ChannelValue::Int(i64::from(params.polygon_type)),
        )?;
        host.set_channel_value(channels.steps.clone(), ChannelValue::Int(i64::from(params.steps)))?;
        host.set_channel_value(channels.flip.clone(), ChannelValue::Bool(params.flip))?;
        host.set_channel_value(
            channels.material.clone(),
            ChannelValue::Str(params.material.clone()),
        )?;
        // Side count lives on the profile, not the container: one
        // cross-section, one side count for every cable sweeping it.
        host.set_channel_value(profile.sides.clone(), ChannelValue::Int(i64::from(params.sides)))?;
        Ok(())
    }
}

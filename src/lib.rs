#![forbid(unsafe_code)]

pub mod cache;
pub mod codec;
pub mod controller;
pub mod error;
pub mod graph;
pub mod host;
pub mod host_mem;
pub mod model;

pub use cache::{ProfileCache, SHARED_PROFILE_NAME, ShareableProfile, circle_profile};
pub use codec::{decode, encode};
pub use controller::{
    AssemblyController, BatchEntry, BatchReport, BuildOutcome, BuildState, ProfileMode, RigSession,
};
pub use error::{CablerigError, CablerigResult};
pub use graph::{Assembly, ControlChannels, GraphBuilder, ProfileBinding};
pub use host::{
    ChannelRef, ChannelType, ChannelValue, EntityRef, HostAdapter, ITEM_LIST_PANEL, LinkMode,
    NodeRef, OpKind, OwnerRef, PortRef, SelectMode,
};
pub use host_mem::{MemoryHost, SceneDoc};
pub use model::ParameterSet;

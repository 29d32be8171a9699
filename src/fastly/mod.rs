//! Fastly integration core.
//!
//! [`settings`] is the only state the two pipelines share. The publish
//! pipeline runs [`collector`] then [`purge`]; the response pipeline runs
//! [`policy`]. [`hooks`] is what a host registers against its own events.

pub mod collector;
pub mod hooks;
pub mod install;
pub mod keys;
pub mod middleware;
pub mod policy;
pub mod purge;
pub mod settings;

pub use collector::{DispatchedPurges, PublishCollector, StagedPurges};
pub use hooks::{FastlyHooks, RenderedContent};
pub use install::{InstallReport, SettingsFileError, UninstallReport, install_defaults, uninstall};
pub use middleware::cache_policy_layer;
pub use policy::{CachePolicyDecision, CachePolicyWriter};
pub use purge::{PurgeClient, PurgeClientOptions, PurgeError, PurgeResponse, Purger};
pub use settings::{FileSettings, MemorySettings, SettingsAccessor, SettingsSource};

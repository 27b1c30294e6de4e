//! Asynchronous asset loading.
//!
//! A [`ResourceLoader`] hands fetch jobs to a [`FetchBackend`] and delivers
//! each job's outcome to its completion handler exactly once, on a later
//! call to [`ResourceLoader::dispatch_completions`]. Completions of
//! independent loads arrive in no particular order.

mod backend;
mod decode;
mod loader;
mod types;

pub use backend::{
    BackendError, FetchBackend, FetchDone, FetchJob, ScriptedBackend, ScriptedHandle,
    ThreadedBackend,
};
pub use decode::fetch_and_decode;
pub use loader::{LoaderStats, ResourceLoader, TaskId};
pub use types::{
    AssetKind, AssetRequest, AudioClip, Bounds3, EnvironmentMap, LoadFailure, LoadResult,
    LoadState, MeshNode, ModelAsset, Resource, TextureImage,
};

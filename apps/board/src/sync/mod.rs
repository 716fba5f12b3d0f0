// Local mirror of backend state and everything that keeps it current:
// the per-job caches, the workspace operations that mutate them, the notes
// draft buffer, and the background scoring poller.

pub mod cache;
pub mod notes;
pub mod poller;
pub mod workspace;

pub use cache::SyncState;
pub use poller::{PollerHandle, ScoringPoller};
pub use workspace::{ListEntry, RenderedList, UploadReport, Workspace};

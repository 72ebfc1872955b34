pub mod compose;
pub mod database;
pub mod docker;
pub mod docs;
pub mod error;
pub mod host;
pub mod inspection;

pub use compose::{ApplyOutcome, ComposeManager, DescriptorState, Orchestrator, ProcessOrchestrator};
pub use database::{DatabaseInspector, DatabasePanel, DatabaseProbe};
pub use docker::{ContainerRecord, ContainerRuntime, DockerManager, ImageRecord, PortBinding, Uptime};
pub use error::{PanelError, PanelResult};
pub use host::{DiskUsage, HostInspector, HostProbe, ListeningSocket, Lookup};
pub use inspection::{ActionReport, ActionResult, Controller, Snapshot};

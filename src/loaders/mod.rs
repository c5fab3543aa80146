//! Source loading: directory discovery, MkDocs nav and the publish plan.

pub mod directory;
pub mod nav;
pub mod plan;
pub mod project;

pub use directory::{read_document, DocsDirectory, SourceFile};
pub use nav::{load_navigation, NavNode};
pub use plan::{build_publish_plan, PublishItem};
pub use project::DocsProject;

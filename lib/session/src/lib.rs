//! Workflow editing sessions.
//!
//! A [`WorkflowSession`] owns one workflow graph while a user edits or
//! steps through it. It loads from and saves to a `WorkflowStore`, applies
//! editor events, re-derives the step list after every change, and guards
//! publication.
//!
//! The types the outer surfaces consume live alongside it:
//! - [`editor`]: events from and render lists for the canvas
//! - [`view`]: what a per-node configuration view is given
//! - [`address`]: the `?step=<n>` deep link

pub mod address;
pub mod editor;
pub mod error;
pub mod session;
pub mod view;

pub use address::{StepAddress, StepQuery};
pub use editor::{EditorEvent, EditorSnapshot, RenderEdge, RenderNode};
pub use error::SessionError;
pub use session::{
    EditOp, EditOutcome, IssueSummary, LoadReport, Published, SaveReport, SessionSnapshot,
    WorkflowSession,
};
pub use view::{StepStrip, StepView, StripEntry};

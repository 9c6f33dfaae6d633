//! # fakevive-core
//!
//! Interception core for the FakeVive shim: the dispatch-table patcher, the
//! interface-acquisition decision logic, and the property override that makes
//! an OpenVR host see an HTC Vive regardless of the attached headset.
//!
//! Everything in this crate is platform-independent. The raw-memory pieces
//! take their collaborators through narrow seams (a [`ProtectionScope`] for
//! page protection, a closure for the real property query) so they can be
//! exercised against synthetic dispatch tables instead of a live runtime.
//! The Windows-specific glue lives in `fakevive-shim`.

pub mod acquire;
pub mod error;
pub mod props;
pub mod vtable;

pub use error::SetupError;
pub use vtable::{ProtectionScope, SavedSlot};

pub mod error;
pub mod event;
pub mod wire;

pub use error::{CoreError, Result};
pub use event::{ChangeEvent, Document, DocumentKey, OperationKind};

mod operation;
mod script;

pub use operation::{Operation, OperationError, Outcome};
pub use script::{Script, ScriptCreationError};

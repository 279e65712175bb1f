pub mod command;
pub mod flow;
pub mod intent;

pub use command::{Command, Platform};
pub use flow::{FlowStatus, OwnerKey, StepKind, StepStatus, TransactionFlow, TransactionStep};
pub use intent::{CommandType, Intent};

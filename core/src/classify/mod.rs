//! Classification: tools, shell commands, and user messages.

pub mod command;
pub mod tool;
pub mod user_intent;

pub use command::CommandClass;
pub use command::CommandPolicy;
pub use command::classify_command;
pub use tool::ToolClass;
pub use tool::ToolClassifier;
pub use user_intent::classify_user_message;

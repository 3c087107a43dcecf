mod bridge;
pub mod client;
mod types;

pub use bridge::{
    classify, Captured, CommandBridge, Invocation, Outcome, OutputMode, Response, Runner,
    ShellRunner,
};
pub use types::{Account, Address, Envelope, Flag, Mailbox, Sender};

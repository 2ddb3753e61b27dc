//! IPC module for daemon-front end communication

mod protocol;
mod remote;
mod server;

pub use protocol::{
    encode_frame, DenialReason, HostCapabilities, Notification, PlatformCommand, PlatformEvent,
    PlatformInput, ProtocolError, Request, Response, MAX_FRAME_LEN,
};
pub use remote::remote_platform;
pub use server::{Registry, Server};

//! A client-side NDN [`Face`](face::Face): the Pending Interest Table,
//! registered-prefix table, transport lifecycle, and signature verification
//! flow an application uses to participate in a Named Data Networking
//! overlay, without itself being a forwarder.

pub mod codec;
pub mod config;
pub mod cst;
pub mod error;
pub mod face;
pub mod hash;
pub mod host_strategy;
pub mod keycache;
pub mod name;
pub mod pit;
pub mod platform;
pub mod timestamp;
pub mod tlv;
pub mod transport;
pub mod verifier;
pub mod verify_flow;

pub use codec::{Data, ForwardingEntry, Interest, KeyLocator, SignatureType, SignedInfo};
pub use config::FaceConfig;
pub use error::FaceError;
pub use face::{DataEvent, Face, InterestAction, InterestSink, ReexpressDecision, ResponseSink};
pub use name::Name;
pub use pit::PitId;
pub use platform::{NativePlatform, Platform};
pub use transport::{LoopbackTransport, TcpTransport, Transport};
#[cfg(unix)]
pub use transport::UnixTransport;
pub use verifier::{DigestSha256Verifier, PublicKey, Verifier};

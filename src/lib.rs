//! Workspace package for the Lambda runtime client.
//!
//! Holds no code of its own. The integration harness under `tests/` wires the
//! member crates together:
//!
//! - `lambda-runtime-client`: blocking client for the Lambda Runtime API
//! - `lambda-simulator`: scriptable in-process Runtime API control plane
//! - `lambda-runtime-example`: greeting function built on the client

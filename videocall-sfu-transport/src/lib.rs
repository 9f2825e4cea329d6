/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Signaling transport for the videocall.rs SFU client.
//!
//! The SFU signaling protocol is a stream of JSON text frames over a single
//! WebSocket. This crate owns the socket mechanics; message semantics live in
//! `videocall-sfu-types` and `videocall-sfu-client`.

pub mod native_websocket;

pub use native_websocket::{SignalingConnectError, SignalingSocket};

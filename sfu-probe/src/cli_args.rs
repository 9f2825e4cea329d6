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

use clap::Parser;
use std::path::PathBuf;
use url::Url;

/// SFU Probe
///
/// Joins an SFU room over its WebSocket signaling endpoint and prints the
/// participants and producers it sees, without sending or receiving media.
#[derive(Parser, Debug, Default)]
#[clap(name = "sfu-probe")]
pub struct Opt {
    /// YAML configuration file.  Falls back to `PROBE_CONFIG_PATH`, then to
    /// environment variables.
    #[clap(long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Signaling endpoint, e.g. wss://sfu.example.com/ws
    #[clap(long = "url")]
    pub url: Option<Url>,

    #[clap(long = "participant-id")]
    pub participant_id: Option<String>,

    #[clap(long = "display-name")]
    pub display_name: Option<String>,

    /// Negotiate a consumer for every announced producer.
    #[clap(long = "consume")]
    pub consume: bool,

    /// Leave the room after this many seconds instead of waiting for Ctrl-C.
    #[clap(long = "duration-secs")]
    pub duration_secs: Option<u64>,

    #[clap(long = "request-timeout-ms")]
    pub request_timeout_ms: Option<u64>,
}

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
use log::{info, warn};
use std::time::Duration;

mod cli_args;
mod config;
mod engine;

use cli_args::Opt;
use config::ProbeConfig;
use engine::ProbeEngine;
use videocall_sfu_client::{ClientEvent, Session};

fn describe(event: &ClientEvent) -> String {
    match event {
        ClientEvent::Connected => "connected".to_string(),
        ClientEvent::ConnectionLost(reason) => format!("connection lost: {reason}"),
        ClientEvent::Disconnected => "disconnected".to_string(),
        ClientEvent::CapabilitiesReady => "capabilities ready".to_string(),
        ClientEvent::CapabilitiesFailed(reason) => format!("capabilities failed: {reason}"),
        ClientEvent::ParticipantJoined(id) => format!("+ participant {id}"),
        ClientEvent::ParticipantLeft(id) => format!("- participant {id}"),
        ClientEvent::NewProducer {
            participant_id,
            producer_id,
            kind,
        } => format!("+ {kind} producer {producer_id} from {participant_id}"),
        ClientEvent::ProducerCreated { producer_id, kind } => {
            format!("+ local {kind} producer {producer_id}")
        }
        ClientEvent::ProducerClosed { producer_id } => format!("- local producer {producer_id}"),
        ClientEvent::ConsumerCreated {
            consumer_id,
            participant_id,
            producer_id,
            kind,
        } => format!("+ {kind} consumer {consumer_id} of {producer_id} from {participant_id}"),
        ClientEvent::ConsumerClosed {
            consumer_id,
            participant_id,
        } => format!("- consumer {consumer_id} from {participant_id}"),
        ClientEvent::TransportCreated {
            transport_id,
            direction,
        } => format!("+ {direction} transport {transport_id}"),
        ClientEvent::TransportConnected {
            transport_id,
            direction,
        } => format!("= {direction} transport {transport_id} connected"),
        ClientEvent::TransportClosed {
            transport_id,
            direction,
        } => format!("- {direction} transport {transport_id}"),
        ClientEvent::ServerError(message) => format!("! server error: {message}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::parse();
    let config = ProbeConfig::load(&opt)?;
    let url = config.server_url()?;

    let session = Session::new(config.session_options(), ProbeEngine::new())?;
    let mut events = session.subscribe();
    info!("Joining {url} as {}", config.participant_id);
    session.connect(url.as_str()).await?;

    let deadline = async {
        match config.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => futures::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = &mut deadline => {
                info!("Probe duration elapsed");
                break;
            }
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Event stream ended: {e}");
                        break;
                    }
                };
                println!("{} {}", chrono::Local::now().format("%H:%M:%S%.3f"), describe(&event));
                match event {
                    ClientEvent::NewProducer { participant_id, producer_id, .. } if config.consume => {
                        let session = session.clone();
                        tokio::spawn(async move {
                            session.consume_track(&participant_id, &producer_id).await;
                        });
                    }
                    ClientEvent::ConnectionLost(_) => break,
                    _ => {}
                }
            }
        }
    }

    session.disconnect();
    while let Ok(event) = events.try_recv() {
        println!("{} {}", chrono::Local::now().format("%H:%M:%S%.3f"), describe(&event));
    }
    Ok(())
}

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

use std::collections::VecDeque;
use videocall_sfu_types::ProducerInfo;

/// Producer announcements received before the media engine was ready.
#[derive(Debug, Default)]
pub(crate) struct PendingProducerBuffer {
    queue: VecDeque<ProducerInfo>,
}

impl PendingProducerBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: ProducerInfo) {
        self.queue.push_back(info);
    }

    /// Take every buffered announcement in arrival order.  Each one is
    /// returned exactly once; flushing an empty buffer returns nothing.
    pub fn flush(&mut self) -> Vec<ProducerInfo> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use videocall_sfu_types::MediaKind;

    fn info(producer_id: &str) -> ProducerInfo {
        ProducerInfo {
            participant_id: "bob".into(),
            producer_id: producer_id.into(),
            kind: MediaKind::Audio,
        }
    }

    #[test]
    fn test_flush_preserves_arrival_order_once() {
        let mut buffer = PendingProducerBuffer::new();
        buffer.push(info("p1"));
        buffer.push(info("p2"));
        buffer.push(info("p3"));

        let flushed: Vec<String> = buffer.flush().into_iter().map(|i| i.producer_id).collect();
        assert_eq!(flushed, vec!["p1", "p2", "p3"]);
        assert!(buffer.flush().is_empty());
    }
}

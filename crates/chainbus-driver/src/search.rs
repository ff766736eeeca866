//! Binary UUID search.
//!
//! Finds every slave UUID on a bus that cannot (or should not) be
//! enumerated through neighbor chaining. The host walks the 32-bit UUID
//! prefix tree depth-first: for each node it broadcasts an assertion
//! selector, and every slave whose UUID falls under the announced prefix
//! pulses the line. One or more pulses collide into something the
//! transport reads as a reply, a reception error, or garbage — all of
//! which mean "at least one match". Silence means "no match".
//!
//! That inversion — a transport error counting as a positive — is
//! deliberately contained to this module; nothing else in the driver may
//! treat a failed reception as success.

use crate::backend::Backend;
use crate::config::SearchConfig;
use crate::error::BusError;
use crate::locator::Locator;
use chainbus_protocol::{SearchAddress, MAX_SEARCH_LEVEL};
use std::collections::VecDeque;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

/// Depth-first traversal state over the UUID prefix tree.
pub struct UuidSearch<'a, B: Backend> {
    locator: &'a Locator<B>,
    config: SearchConfig,
    queue: VecDeque<SearchAddress>,
    last_assertion: Option<Instant>,
}

impl<'a, B: Backend> UuidSearch<'a, B> {
    /// Create a search starting at the root of the prefix tree.
    pub fn new(locator: &'a Locator<B>, config: SearchConfig) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(SearchAddress::ROOT);
        UuidSearch {
            locator,
            config,
            queue,
            last_assertion: None,
        }
    }

    /// Restart the traversal from the root.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.queue.push_back(SearchAddress::ROOT);
    }

    /// Whether the traversal has pending nodes.
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    /// Broadcast one assertion selector, throttled so slow devices get
    /// `delay_time` between consecutive assertions, and fold the outcome
    /// into a match bit.
    async fn probe(&mut self, node: SearchAddress) -> Result<bool, BusError> {
        if let Some(previous) = self.last_assertion {
            sleep_until(previous + self.config.delay_time).await;
        }

        let outcome = self
            .locator
            .request_bus_assertion(node, self.config.only_unaddressed)
            .await;
        self.last_assertion = Some(Instant::now());

        let matched = match outcome {
            // A readable reply: some device drove the line alone.
            Ok(()) => true,
            // Silence: provably zero matching devices.
            Err(BusError::NoAssertionDetected) | Err(BusError::TransportReceptionNoAnswer) => false,
            // Colliding pulses mangle the line; any other transport
            // outcome is evidence that at least one device matched.
            Err(err) if err.is_transport() => true,
            // The arbiter or back-end itself broke: abort the search.
            Err(err) => return Err(err),
        };
        trace!(
            prefix = format_args!("{:08X}", node.prefix),
            level = node.level,
            matched,
            "assertion probe"
        );
        Ok(matched)
    }

    /// Advance the traversal until the next UUID is fully matched.
    /// Returns `None` when the tree is exhausted.
    pub async fn find_next_device(&mut self) -> Result<Option<u32>, BusError> {
        while let Some(node) = self.queue.pop_front() {
            // A leaf needs no probe: it was implied by its sibling's
            // non-match under a matching parent.
            if node.is_leaf() {
                debug!(uuid = format_args!("{:08X}", node.prefix), "device found (implied)");
                return Ok(Some(node.prefix));
            }

            let matched = self.probe(node).await?;

            if node.level == 0 {
                if matched {
                    self.queue.push_front(SearchAddress::new(0, 1));
                }
                // No match at the root: the bus holds no devices.
                continue;
            }

            let left = node.is_left_branch();
            if matched {
                if node.level < MAX_SEARCH_LEVEL {
                    // Descend; a left branch also queues its sibling for
                    // the backtracking phase.
                    self.queue.push_front(SearchAddress::new(node.prefix, node.level + 1));
                    if left {
                        self.queue.push_back(node.right_sibling());
                    }
                } else {
                    // Fully matched UUID.
                    if left {
                        self.queue.push_back(node.right_sibling());
                    }
                    debug!(uuid = format_args!("{:08X}", node.prefix), "device found");
                    return Ok(Some(node.prefix));
                }
            } else if left {
                // The parent matched but this half did not, so the right
                // sibling must: skip probing it and jump one level deeper.
                let sibling = node.right_sibling();
                let next = if node.level == MAX_SEARCH_LEVEL {
                    SearchAddress::leaf(sibling.prefix)
                } else {
                    SearchAddress::new(sibling.prefix, node.level + 1)
                };
                self.queue.push_front(next);
            }
            // No match on a right branch: backtrack; the remaining
            // siblings are already queued.
        }
        Ok(None)
    }

    /// Run the traversal to completion and collect every UUID.
    pub async fn find_all_devices(&mut self) -> Result<Vec<u32>, BusError> {
        let mut devices = Vec::new();
        while let Some(uuid) = self.find_next_device().await? {
            devices.push(uuid);
        }
        Ok(devices)
    }
}

// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLEX group messaging.
//!
//! A short-instruction page tells a set of pagers to listen to one of 17 group slots in a
//! later frame. Each enrolment queues the pager's capcode against the group bit together
//! with the cycle and frame the group message is due in; when a page for the group capcode
//! arrives, every queued capcode is reported with the same message body. A registration
//! whose target frame passes without a matching page is flushed as missed.

use log::debug;

/// Number of group message slots.
pub const GROUP_BITS: usize = 17;

/// The first group capcode; capcodes 2029568..=2029583 map to group bits 0..=15, 2029584
/// closes the range at bit 16.
pub const GROUP_CAPCODE_BASE: i64 = 2_029_568;

struct Registration {
    capcodes: Vec<i64>,
    /// Target cycle, or -1 when the slot is empty.
    cycle: i32,
    /// Target frame, or -1 when the slot is empty.
    frame: i32,
}

pub struct GroupHandler {
    slots: [Registration; GROUP_BITS],
}

impl GroupHandler {
    pub fn new() -> GroupHandler {
        GroupHandler {
            slots: std::array::from_fn(|_| Registration { capcodes: Vec::new(), cycle: -1, frame: -1 }),
        }
    }

    /// Queue a capcode for a group bit with the frame the message is expected in. The
    /// target cycle is the current cycle when the target frame is still ahead, otherwise
    /// the next cycle (wrapping 15 to 0).
    pub fn enrol(&mut self, groupbit: usize, capcode: i64, target_frame: u32, cycleno: u32, frameno: u32) {
        if groupbit >= GROUP_BITS {
            debug!("FLEX: short instruction names group bit {} out of range", groupbit);
            return;
        }
        let slot = &mut self.slots[groupbit];
        slot.capcodes.push(capcode);
        slot.frame = target_frame as i32;
        slot.cycle = if target_frame > frameno { cycleno as i32 } else { ((cycleno + 1) % 16) as i32 };
        debug!(
            "FLEX: group bit {} now queues {} capcodes, next [{:010}], due {:02}.{:03}",
            groupbit,
            slot.capcodes.len(),
            capcode,
            slot.cycle,
            slot.frame
        );
    }

    /// Take every queued capcode for a group bit, clearing the registration.
    pub fn take(&mut self, groupbit: usize) -> Vec<i64> {
        if groupbit >= GROUP_BITS {
            return Vec::new();
        }
        let slot = &mut self.slots[groupbit];
        slot.cycle = -1;
        slot.frame = -1;
        std::mem::take(&mut slot.capcodes)
    }

    /// Flush registrations whose target frame has passed without a group message. Called on
    /// every decoded FIW with the current cycle and frame.
    pub fn expire(&mut self, cycleno: u32, frameno: u32) {
        for (g, slot) in self.slots.iter_mut().enumerate() {
            if slot.frame < 0 {
                continue;
            }

            let cycle = cycleno as i32;
            let expired = if cycle == slot.cycle {
                slot.frame < frameno as i32
            } else if cycleno == 0 {
                // The target cycle ended as the cycle counter wrapped.
                slot.cycle == 15
            } else if cycleno == 15 && slot.cycle == 0 {
                // Still waiting for the cycle counter to wrap.
                false
            } else {
                slot.cycle < cycle
            };

            if expired {
                let missed: Vec<String> =
                    slot.capcodes.iter().map(|c| format!("[{:010}]", c)).collect();
                debug!(
                    "FLEX: group messages missed; group bit {}; clearing capcodes {}",
                    g,
                    missed.join(",")
                );
                slot.capcodes.clear();
                slot.cycle = -1;
                slot.frame = -1;
            }
        }
    }

    #[cfg(test)]
    fn pending(&self, groupbit: usize) -> usize {
        self.slots[groupbit].capcodes.len()
    }
}

impl Default for GroupHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::GroupHandler;

    #[test]
    fn verify_enrolment_and_take() {
        let mut groups = GroupHandler::new();
        groups.enrol(2, 1000001, 12, 3, 10);
        groups.enrol(2, 1000002, 12, 3, 10);
        assert_eq!(groups.pending(2), 2);
        assert_eq!(groups.take(2), vec![1000001, 1000002]);
        assert_eq!(groups.pending(2), 0);
    }

    #[test]
    fn verify_expiry_window() {
        // An enrolment at cycle 3, frame 10 targeting frame 12 must survive frames 10..=12
        // of cycle 3 and be flushed once the frame counter passes 12.
        let mut groups = GroupHandler::new();
        groups.enrol(0, 42, 12, 3, 10);

        groups.expire(3, 11);
        assert_eq!(groups.pending(0), 1);
        groups.expire(3, 12);
        assert_eq!(groups.pending(0), 1);
        groups.expire(3, 13);
        assert_eq!(groups.pending(0), 0);
    }

    #[test]
    fn verify_expiry_next_cycle() {
        // A target frame at or before the current frame schedules into the next cycle.
        let mut groups = GroupHandler::new();
        groups.enrol(1, 7, 5, 3, 10);

        // Remainder of cycle 3: still pending.
        groups.expire(3, 127);
        assert_eq!(groups.pending(1), 1);
        // Cycle 4, frame <= 5: still pending.
        groups.expire(4, 5);
        assert_eq!(groups.pending(1), 1);
        // Cycle 4, past frame 5: flushed.
        groups.expire(4, 6);
        assert_eq!(groups.pending(1), 0);
    }

    #[test]
    fn verify_expiry_cycle_wrap() {
        // Enrolled in cycle 15 targeting a frame in cycle 0: waiting across the wrap is not
        // an expiry, but a full missed cycle is.
        let mut groups = GroupHandler::new();
        groups.enrol(4, 9, 3, 15, 100);

        groups.expire(15, 120);
        assert_eq!(groups.pending(4), 1);
        groups.expire(0, 2);
        assert_eq!(groups.pending(4), 1);
        groups.expire(0, 4);
        assert_eq!(groups.pending(4), 0);
    }
}

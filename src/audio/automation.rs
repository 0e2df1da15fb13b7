// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Scheduled parameter automation.

use super::Automation;

#[derive(Clone, Copy, Debug, PartialEq)]
enum EventKind {
    Set,
    LinearRamp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Event {
    kind: EventKind,
    value: f32,
    time: f64,
}

/// The automation timeline of a single parameter (e.g. a gain).
///
/// A ramp runs from the event before it to its own end time and value.
/// Times are absolute seconds on the backend clock.
#[derive(Clone, Debug)]
pub struct AutomationTimeline {
    default_value: f32,
    events: Vec<Event>,
}

impl AutomationTimeline {
    /// Creates a timeline that holds `default_value` until something is scheduled.
    pub fn new(default_value: f32) -> AutomationTimeline {
        AutomationTimeline {
            default_value,
            events: Vec::new(),
        }
    }

    /// Applies a single automation command. `now` anchors ramps that have no
    /// preceding event.
    pub fn apply(&mut self, automation: Automation, now: f64) {
        match automation {
            Automation::CancelScheduled { from } => self.cancel_scheduled(from),
            Automation::SetValue { value, at } => self.insert(Event {
                kind: EventKind::Set,
                value,
                time: at,
            }),
            Automation::LinearRamp { value, end_time } => {
                if !self.events.iter().any(|event| event.time <= end_time) {
                    let anchor = self.value_at(now);
                    self.insert(Event {
                        kind: EventKind::Set,
                        value: anchor,
                        time: now.min(end_time),
                    });
                }
                self.insert(Event {
                    kind: EventKind::LinearRamp,
                    value,
                    time: end_time,
                });
            }
        }
    }

    /// Removes every event scheduled at or after `from`.
    pub fn cancel_scheduled(&mut self, from: f64) {
        self.events.retain(|event| event.time < from);
    }

    /// Evaluates the parameter at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let next = self.events.partition_point(|event| event.time <= time);

        // Nothing has happened yet.
        let Some(previous) = next.checked_sub(1) else {
            return self.default_value;
        };
        let Event {
            time: start_time,
            value: start_value,
            ..
        } = self.events[previous];

        match self.events.get(next) {
            Some(end) if end.kind == EventKind::LinearRamp => {
                let span = end.time - start_time;
                if span <= 0.0 {
                    return end.value;
                }
                let progress = ((time - start_time) / span) as f32;
                start_value + (end.value - start_value) * progress
            }
            _ => start_value,
        }
    }

    fn insert(&mut self, event: Event) {
        let index = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(index, event);
    }
}

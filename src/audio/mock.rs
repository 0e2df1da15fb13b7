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
use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::{
    AudioBackend, AudioError, Automation, AutomationTimeline, DecodedBuffer, GainHandle, NodeId,
    SourceHandle,
};

enum NodeKind {
    Destination,
    Gain(AutomationTimeline),
    Source {
        buffer: DecodedBuffer,
        playback_rate: f64,
        started: bool,
    },
}

impl NodeKind {
    fn name(&self) -> &'static str {
        match self {
            NodeKind::Destination => "destination",
            NodeKind::Gain(_) => "gain",
            NodeKind::Source { .. } => "source",
        }
    }

    fn buffer_bytes(&self) -> usize {
        match self {
            NodeKind::Source { buffer, .. } => buffer.memory_size(),
            _ => 0,
        }
    }
}

struct Node {
    kind: NodeKind,
    outputs: Vec<NodeId>,
}

#[derive(Default)]
struct Graph {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
}

impl Graph {
    fn add(&mut self, kind: NodeKind) -> NodeId {
        self.next_id += 1;
        let id = NodeId::new(self.next_id);
        self.nodes.insert(
            id,
            Node {
                kind,
                outputs: Vec::new(),
            },
        );
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, AudioError> {
        self.nodes.get_mut(&id).ok_or(AudioError::UnknownNode(id))
    }

    fn timeline_mut(&mut self, gain: GainHandle) -> Result<&mut AutomationTimeline, AudioError> {
        match &mut self.node_mut(gain.node())?.kind {
            NodeKind::Gain(timeline) => Ok(timeline),
            _ => Err(AudioError::WrongNodeKind(gain.node(), "gain")),
        }
    }
}

/// An in-process backend. Doesn't actually render anything, but keeps the
/// node graph and evaluates gain automation so behavior can be observed.
///
/// The clock follows `tokio::time`, so tests running with paused time
/// control it by advancing the runtime clock.
pub struct MockBackend {
    name: String,
    epoch: Instant,
    destination: NodeId,
    graph: Mutex<Graph>,
}

impl MockBackend {
    /// Creates a new mock backend.
    pub fn new(name: &str) -> MockBackend {
        let mut graph = Graph::default();
        let destination = graph.add(NodeKind::Destination);
        MockBackend {
            name: name.to_string(),
            epoch: Instant::now(),
            destination,
            graph: Mutex::new(graph),
        }
    }

    /// Returns true if `from` outputs to `to`.
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.graph
            .lock()
            .nodes
            .get(&from)
            .is_some_and(|node| node.outputs.contains(&to))
    }

    /// Returns true if the node has any outputs.
    pub fn has_outputs(&self, node: NodeId) -> bool {
        self.graph
            .lock()
            .nodes
            .get(&node)
            .is_some_and(|node| !node.outputs.is_empty())
    }

    /// Returns true if the source has been started.
    pub fn is_started(&self, source: SourceHandle) -> bool {
        matches!(
            self.graph.lock().nodes.get(&source.node()),
            Some(Node {
                kind: NodeKind::Source { started: true, .. },
                ..
            })
        )
    }

    /// Gets the playback rate of a source.
    pub fn playback_rate(&self, source: SourceHandle) -> Option<f64> {
        match self.graph.lock().nodes.get(&source.node()) {
            Some(Node {
                kind: NodeKind::Source { playback_rate, .. },
                ..
            }) => Some(*playback_rate),
            _ => None,
        }
    }

    /// Number of nodes alive in the graph, the destination included.
    pub fn node_count(&self) -> usize {
        self.graph.lock().nodes.len()
    }

    /// Number of sources currently connected to something.
    pub fn connected_source_count(&self) -> usize {
        self.graph
            .lock()
            .nodes
            .values()
            .filter(|node| {
                matches!(node.kind, NodeKind::Source { .. }) && !node.outputs.is_empty()
            })
            .count()
    }
}

impl AudioBackend for MockBackend {
    fn current_time(&self) -> f64 {
        Instant::now().duration_since(self.epoch).as_secs_f64()
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_gain(&self) -> Result<GainHandle, AudioError> {
        let id = self
            .graph
            .lock()
            .add(NodeKind::Gain(AutomationTimeline::new(1.0)));
        trace!(backend = self.name, node = %id, "Created gain");
        Ok(GainHandle::new(id))
    }

    fn create_source(&self, buffer: DecodedBuffer) -> Result<SourceHandle, AudioError> {
        let id = self.graph.lock().add(NodeKind::Source {
            buffer,
            playback_rate: 1.0,
            started: false,
        });
        trace!(backend = self.name, node = %id, "Created source");
        Ok(SourceHandle::new(id))
    }

    fn set_playback_rate(&self, source: SourceHandle, rate: f64) -> Result<(), AudioError> {
        let mut graph = self.graph.lock();
        match &mut graph.node_mut(source.node())?.kind {
            NodeKind::Source { playback_rate, .. } => {
                *playback_rate = rate;
                Ok(())
            }
            _ => Err(AudioError::WrongNodeKind(source.node(), "source")),
        }
    }

    fn connect(&self, from: NodeId, to: NodeId) -> Result<(), AudioError> {
        let mut graph = self.graph.lock();
        if !graph.nodes.contains_key(&to) {
            return Err(AudioError::UnknownNode(to));
        }
        let node = graph.node_mut(from)?;
        if !node.outputs.contains(&to) {
            node.outputs.push(to);
        }
        trace!(backend = self.name, %from, %to, "Connected");
        Ok(())
    }

    fn disconnect(&self, node: NodeId) -> Result<(), AudioError> {
        let mut graph = self.graph.lock();
        let entry = graph.node_mut(node)?;
        trace!(
            backend = self.name,
            %node,
            kind = entry.kind.name(),
            outputs = entry.outputs.len(),
            buffer_bytes = entry.kind.buffer_bytes(),
            "Disconnected"
        );
        entry.outputs.clear();

        // Everything but the destination is released along with its edges.
        if node != self.destination {
            graph.nodes.remove(&node);
            for other in graph.nodes.values_mut() {
                other.outputs.retain(|output| *output != node);
            }
        }
        Ok(())
    }

    fn gain_value(&self, gain: GainHandle) -> Result<f32, AudioError> {
        let now = self.current_time();
        Ok(self.graph.lock().timeline_mut(gain)?.value_at(now))
    }

    fn schedule_gain(
        &self,
        gain: GainHandle,
        automation: &[Automation],
    ) -> Result<(), AudioError> {
        let now = self.current_time();
        let mut graph = self.graph.lock();
        let timeline = graph.timeline_mut(gain)?;
        for command in automation {
            timeline.apply(*command, now);
        }
        Ok(())
    }

    fn start(&self, source: SourceHandle) -> Result<(), AudioError> {
        let mut graph = self.graph.lock();
        match &mut graph.node_mut(source.node())?.kind {
            NodeKind::Source { started, .. } => {
                *started = true;
                debug!(backend = self.name, node = %source.node(), "Source started");
                Ok(())
            }
            _ => Err(AudioError::WrongNodeKind(source.node(), "source")),
        }
    }
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend")
            .field("name", &self.name)
            .field("nodes", &self.graph.lock().nodes.len())
            .finish()
    }
}

impl fmt::Display for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::audio::DecodedAudio;

    fn buffer() -> DecodedBuffer {
        Arc::new(DecodedAudio::new(1, 44100, vec![0.0; 64]))
    }

    #[test]
    fn test_graph_wiring() {
        let backend = MockBackend::new("test");
        let gain = backend.create_gain().unwrap();
        let source = backend.create_source(buffer()).unwrap();

        backend.connect(source.node(), gain.node()).unwrap();
        backend.connect(gain.node(), backend.destination()).unwrap();
        assert!(backend.is_connected(source.node(), gain.node()));
        assert!(backend.is_connected(gain.node(), backend.destination()));
        assert_eq!(backend.connected_source_count(), 1);

        backend.disconnect(source.node()).unwrap();
        assert!(!backend.has_outputs(source.node()));
        assert_eq!(backend.connected_source_count(), 0);
    }

    #[test]
    fn test_disconnect_releases_node() {
        let backend = MockBackend::new("test");
        let gain = backend.create_gain().unwrap();
        let source = backend.create_source(buffer()).unwrap();
        backend.connect(source.node(), gain.node()).unwrap();
        backend.connect(gain.node(), backend.destination()).unwrap();
        assert_eq!(backend.node_count(), 3);

        backend.disconnect(gain.node()).unwrap();
        assert!(!backend.is_connected(source.node(), gain.node()));
        assert!(matches!(
            backend.gain_value(gain),
            Err(AudioError::UnknownNode(_))
        ));

        backend.disconnect(source.node()).unwrap();
        assert_eq!(backend.node_count(), 1);
        assert!(matches!(
            backend.disconnect(source.node()),
            Err(AudioError::UnknownNode(_))
        ));

        // The destination survives being disconnected.
        backend.disconnect(backend.destination()).unwrap();
        assert_eq!(backend.node_count(), 1);
    }

    #[test]
    fn test_wrong_node_kind() {
        let backend = MockBackend::new("test");
        let gain = backend.create_gain().unwrap();
        let as_source = SourceHandle::new(gain.node());

        assert!(matches!(
            backend.start(as_source),
            Err(AudioError::WrongNodeKind(_, "source"))
        ));
        assert!(matches!(
            backend.connect(gain.node(), NodeId::new(999)),
            Err(AudioError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_source_start_and_rate() {
        let backend = MockBackend::new("test");
        let source = backend.create_source(buffer()).unwrap();
        assert!(!backend.is_started(source));
        assert_eq!(backend.playback_rate(source), Some(1.0));

        backend.set_playback_rate(source, 2.0).unwrap();
        backend.start(source).unwrap();
        assert!(backend.is_started(source));
        assert_eq!(backend.playback_rate(source), Some(2.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_runtime() {
        let backend = MockBackend::new("test");
        let gain = backend.create_gain().unwrap();
        let now = backend.current_time();
        backend
            .schedule_gain(
                gain,
                &[
                    Automation::SetValue { value: 0.0, at: now },
                    Automation::LinearRamp {
                        value: 1.0,
                        end_time: now + 1.0,
                    },
                ],
            )
            .unwrap();

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!((backend.current_time() - now - 0.5).abs() < 1e-6);
        assert!((backend.gain_value(gain).unwrap() - 0.5).abs() < 1e-4);
    }
}

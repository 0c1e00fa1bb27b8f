//! Printer command model: layer batches interleaved with bed rotations.

use crate::layer::Layer;

/// Consecutive layers printed without touching the bed orientation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerBatch {
    /// Layers in print order.
    pub layers: Vec<Layer>,
    /// Global index of the first layer.
    pub first_index: usize,
}

/// One step of the printer program.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Enable the tilting axis.
    InclineOn,
    /// Disable the tilting axis.
    InclineOff,
    /// Tilt the bed about X, then turn it about Z (degrees).
    RotateXZ {
        /// Tilt about X.
        angle_x: f64,
        /// Turn about Z.
        angle_z: f64,
    },
    /// Turn the bed about Z only (degrees).
    RotateZ {
        /// Turn about Z.
        angle: f64,
    },
    /// Print a batch of layers.
    Layers(LayerBatch),
}

impl Command {
    /// Number of layers this command prints.
    pub fn layer_contribution(&self) -> usize {
        match self {
            Command::Layers(batch) => batch.layers.len(),
            Command::InclineOn
            | Command::InclineOff
            | Command::RotateXZ { .. }
            | Command::RotateZ { .. } => 0,
        }
    }

    /// True for the commands that move the bed.
    pub fn is_rotation(&self) -> bool {
        matches!(self, Command::RotateXZ { .. } | Command::RotateZ { .. })
    }
}

/// Ordered commands with a running layer count.
///
/// The count always equals the sum of the batches' contributions, and
/// batches are numbered consecutively from 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionStream {
    commands: Vec<Command>,
    layer_count: usize,
}

impl InstructionStream {
    /// Empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a machine command. A layer batch is renumbered to continue
    /// where the stream stands; empty batches are ignored.
    pub fn push(&mut self, command: Command) {
        match command {
            Command::Layers(batch) => self.push_layers(batch.layers),
            other => self.commands.push(other),
        }
    }

    /// Append `layers` as a batch starting at the current layer count.
    pub fn push_layers(&mut self, layers: Vec<Layer>) {
        if layers.is_empty() {
            return;
        }
        let first_index = self.layer_count;
        self.layer_count += layers.len();
        self.commands.push(Command::Layers(LayerBatch {
            layers,
            first_index,
        }));
    }

    /// Commands in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Total number of layers printed.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Size of each batch, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Layers(batch) => Some(batch.layers.len()),
                _ => None,
            })
            .collect()
    }

    /// Number of incline-on commands.
    pub fn incline_brackets(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::InclineOn))
            .count()
    }

    /// All layers in print order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Layers(batch) => Some(batch.layers.iter()),
                _ => None,
            })
            .flatten()
    }

    /// True when nothing is printed.
    pub fn is_empty(&self) -> bool {
        self.layer_count == 0
    }
}

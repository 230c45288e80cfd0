//! Minimal ONNX model files for exercising the real runtime path.
//!
//! The graph is `input[1,3,224,224] -> ReduceMean(axes=[2,3]) -> MatMul(weights[3,C])`,
//! so each class score is a weighted sum of the per-channel mean intensities.
//! The protobuf is encoded by hand to keep the fixtures free of binary blobs.

use std::path::{Path, PathBuf};

const IR_VERSION: i64 = 7;
const OPSET_VERSION: i64 = 13;
const FLOAT: i64 = 1;
const ATTR_INT: i64 = 2;
const ATTR_INTS: i64 = 7;

/// How the graph declares the width of its score output.
#[derive(Clone, Copy)]
pub enum OutputWidth {
    Fixed,
    Symbolic,
}

enum Dim {
    Value(i64),
    Param(&'static str),
}

#[derive(Default)]
struct Message(Vec<u8>);

impl Message {
    fn varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.0.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        self.0.push(value as u8);
    }

    fn key(&mut self, field: u32, wire_type: u8) {
        self.varint(((field as u64) << 3) | wire_type as u64);
    }

    fn int(mut self, field: u32, value: i64) -> Self {
        self.key(field, 0);
        self.varint(value as u64);
        self
    }

    fn bytes(mut self, field: u32, value: &[u8]) -> Self {
        self.key(field, 2);
        self.varint(value.len() as u64);
        self.0.extend_from_slice(value);
        self
    }

    fn string(self, field: u32, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    fn message(self, field: u32, value: Message) -> Self {
        self.bytes(field, &value.0)
    }
}

fn value_info(name: &str, dims: &[Dim]) -> Message {
    let shape = dims.iter().fold(Message::default(), |shape, dim| {
        let dim = match dim {
            Dim::Value(value) => Message::default().int(1, *value),
            Dim::Param(param) => Message::default().string(2, param),
        };
        shape.message(1, dim)
    });
    let tensor_type = Message::default().int(1, FLOAT).message(2, shape);
    let type_proto = Message::default().message(1, tensor_type);
    Message::default().string(1, name).message(2, type_proto)
}

/// Weights that give class `hot_class` the mean red intensity and every other
/// class a score of zero.
pub fn red_channel_weights(num_classes: usize, hot_class: usize) -> Vec<f32> {
    let mut weights = vec![0.0; 3 * num_classes];
    weights[hot_class] = 1.0;
    weights
}

/// Serializes the pooled linear classifier with a `[3, num_classes]` weight matrix.
pub fn pooled_linear_model(num_classes: usize, weights: &[f32], width: OutputWidth) -> Vec<u8> {
    assert_eq!(weights.len(), 3 * num_classes);

    let axes = Message::default()
        .string(1, "axes")
        .int(8, 2)
        .int(8, 3)
        .int(20, ATTR_INTS);
    let keepdims = Message::default()
        .string(1, "keepdims")
        .int(3, 0)
        .int(20, ATTR_INT);
    let pool = Message::default()
        .string(1, "input")
        .string(2, "pooled")
        .string(3, "pool")
        .string(4, "ReduceMean")
        .message(5, axes)
        .message(5, keepdims);
    let classify = Message::default()
        .string(1, "pooled")
        .string(1, "weights")
        .string(2, "scores")
        .string(3, "classify")
        .string(4, "MatMul");

    let raw: Vec<u8> = weights.iter().flat_map(|w| w.to_le_bytes()).collect();
    let initializer = Message::default()
        .int(1, 3)
        .int(1, num_classes as i64)
        .int(2, FLOAT)
        .string(8, "weights")
        .bytes(9, &raw);

    let input = value_info(
        "input",
        &[Dim::Value(1), Dim::Value(3), Dim::Value(224), Dim::Value(224)],
    );
    let output_width = match width {
        OutputWidth::Fixed => Dim::Value(num_classes as i64),
        OutputWidth::Symbolic => Dim::Param("classes"),
    };
    let output = value_info("scores", &[Dim::Value(1), output_width]);

    let graph = Message::default()
        .message(1, pool)
        .message(1, classify)
        .string(2, "pooled_linear")
        .message(5, initializer)
        .message(11, input)
        .message(12, output);
    let opset = Message::default().string(1, "").int(2, OPSET_VERSION);

    Message::default()
        .int(1, IR_VERSION)
        .string(2, "plantdoc-tests")
        .message(7, graph)
        .message(8, opset)
        .0
}

/// Writes a pooled linear model whose winning class for a solid red-dominant
/// image is `hot_class`.
pub fn write_model(dir: &Path, num_classes: usize, hot_class: usize, width: OutputWidth) -> PathBuf {
    let path = dir.join(format!("pooled_{}.onnx", num_classes));
    let weights = red_channel_weights(num_classes, hot_class);
    std::fs::write(&path, pooled_linear_model(num_classes, &weights, width)).expect("write model");
    path
}

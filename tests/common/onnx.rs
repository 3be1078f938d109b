//! Tiny ONNX graphs for running the real runtime in tests.
//!
//! Every graph averages its `[1, 4, 4, 3]` input over height and width, so
//! class `c` scores the mean of color channel `c`: a solid 4x4 image scores
//! exactly its own color.

use std::fs;
use std::io;
use std::path::Path;

const IR_VERSION: i64 = 7;
const OPSET_VERSION: i64 = 13;

// TensorProto.DataType
const FLOAT: i64 = 1;
const UINT8: i64 = 2;

// AttributeProto.AttributeType
const ATTR_INT: i64 = 2;
const ATTR_INTS: i64 = 7;

pub const CLASSES: usize = 3;
const INPUT_DIMS: [i64; 4] = [1, 4, 4, 3];

/// Float input `(v - 127.5) / 127.5`, float output `mean * 0.5 + 0.5`.
///
/// With `dynamic_classes` the output declares `[1, classes]` symbolically
/// instead of `[1, 3]`.
pub fn write_float_model(path: &Path, dynamic_classes: bool) -> io::Result<()> {
    let nodes = vec![
        channel_mean("image", "mean"),
        node("Mul", &["mean", "scale"], "scaled", Vec::new()),
        node("Add", &["scaled", "offset"], "scores", Vec::new()),
    ];
    let output_dims = if dynamic_classes {
        vec![Dim::Fixed(1), Dim::Named("classes")]
    } else {
        fixed(&[1, CLASSES as i64])
    };

    let graph = graph(
        nodes,
        vec![scalar("scale", 0.5), scalar("offset", 0.5)],
        value_info("image", FLOAT, &fixed(&INPUT_DIMS)),
        value_info("scores", FLOAT, &output_dims),
    );
    fs::write(path, model(graph))
}

/// u8 input, u8 output holding the per-channel mean byte.
pub fn write_quantized_model(path: &Path) -> io::Result<()> {
    let nodes = vec![
        node("Cast", &["image"], "pixels", vec![int_attribute("to", FLOAT)]),
        channel_mean("pixels", "mean"),
        node("Cast", &["mean"], "scores", vec![int_attribute("to", UINT8)]),
    ];
    let graph = graph(
        nodes,
        Vec::new(),
        value_info("image", UINT8, &fixed(&INPUT_DIMS)),
        value_info("scores", UINT8, &fixed(&[1, CLASSES as i64])),
    );
    fs::write(path, model(graph))
}

enum Dim {
    Fixed(i64),
    Named(&'static str),
}

fn fixed(dims: &[i64]) -> Vec<Dim> {
    dims.iter().map(|&d| Dim::Fixed(d)).collect()
}

/// Protobuf message writer, just enough of the wire format for ONNX models.
#[derive(Default)]
struct Message(Vec<u8>);

impl Message {
    fn varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.0.push(byte);
                return;
            }
            self.0.push(byte | 0x80);
        }
    }

    fn key(&mut self, field: u32, wire_type: u32) {
        self.varint(u64::from((field << 3) | wire_type));
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

fn model(graph: Message) -> Vec<u8> {
    let opset = Message::default().string(1, "").int(2, OPSET_VERSION);
    Message::default()
        .int(1, IR_VERSION)
        .string(2, "image-classifier-tests")
        .message(7, graph)
        .message(8, opset)
        .0
}

fn graph(
    nodes: Vec<Message>,
    initializers: Vec<Message>,
    input: Message,
    output: Message,
) -> Message {
    let graph = nodes
        .into_iter()
        .fold(Message::default(), |graph, node| graph.message(1, node))
        .string(2, "channel_means");
    initializers
        .into_iter()
        .fold(graph, |graph, tensor| graph.message(5, tensor))
        .message(11, input)
        .message(12, output)
}

fn channel_mean(input: &str, output: &str) -> Message {
    node(
        "ReduceMean",
        &[input],
        output,
        vec![ints_attribute("axes", &[1, 2]), int_attribute("keepdims", 0)],
    )
}

fn node(op_type: &str, inputs: &[&str], output: &str, attributes: Vec<Message>) -> Message {
    let node = inputs
        .iter()
        .fold(Message::default(), |node, input| node.string(1, input))
        .string(2, output)
        .string(4, op_type);
    attributes
        .into_iter()
        .fold(node, |node, attribute| node.message(5, attribute))
}

fn int_attribute(name: &str, value: i64) -> Message {
    Message::default().string(1, name).int(3, value).int(20, ATTR_INT)
}

fn ints_attribute(name: &str, values: &[i64]) -> Message {
    values
        .iter()
        .fold(Message::default().string(1, name), |attr, &v| attr.int(8, v))
        .int(20, ATTR_INTS)
}

fn scalar(name: &str, value: f32) -> Message {
    Message::default()
        .int(2, FLOAT)
        .string(8, name)
        .bytes(9, &value.to_le_bytes())
}

fn value_info(name: &str, elem_type: i64, dims: &[Dim]) -> Message {
    let shape = dims.iter().fold(Message::default(), |shape, dim| {
        let dim = match dim {
            Dim::Fixed(value) => Message::default().int(1, *value),
            Dim::Named(param) => Message::default().string(2, param),
        };
        shape.message(1, dim)
    });
    let tensor = Message::default().int(1, elem_type).message(2, shape);
    let value_type = Message::default().message(1, tensor);
    Message::default().string(1, name).message(2, value_type)
}

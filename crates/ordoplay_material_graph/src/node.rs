// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material node catalogue.
//!
//! Every node kind is a variant of [`MaterialNode`]. Modal nodes pick the
//! value type of some of their connectors from a fixed list of modes; a mode
//! change only retypes or toggles connector slots, it never adds or removes
//! them.

use crate::family::MaterialFamilyDefinition;
use crate::output::{output_connectors, OutputNode};
use ordoplay_logic_graph::{ConnectorShape, ConnectorType, InputConnector, LogicNodeData, OutputConnector};
use serde::{Deserialize, Serialize};
use std::fmt;

use ConnectorType::{Float, Vec2, Vec3, Vec4};

const SCALAR_AND_VECTOR_MODES: &[ConnectorType] = &[Float, Vec2, Vec3, Vec4];
const VECTOR_MODES: &[ConnectorType] = &[Vec2, Vec3, Vec4];
const NO_MODES: &[ConnectorType] = &[];

const SWIZZLE: [&str; 4] = ["x", "y", "z", "w"];

/// Index into a node's list of modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeId(pub u8);

impl ModeId {
    /// Index as usize
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node category for organization in the node picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// The material output
    Output,
    /// Constants and material variables
    Input,
    /// Texture sampling
    Texture,
    /// Values provided by the renderer
    Environment,
    /// Splitting and joining vectors
    Vector,
    /// Arithmetic operators
    Arithmetic,
    /// Angle and trigonometric functions
    Trigonometric,
    /// Exponential functions
    Exponential,
    /// Common functions
    Common,
    /// Geometric functions
    Geometry,
    /// Screen-space derivatives
    Derivative,
}

// ============================================================================
// Math operations
// ============================================================================

/// How a math node is written in shader code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathEmit {
    /// Infix operator between the two inputs
    Operator(&'static str),
    /// Prefix operator applied to the single input
    Prefix(&'static str),
    /// Call of a built-in function
    Function(&'static str),
}

/// How a math node's connector types follow its mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathSignature {
    /// Inputs and output all have the mode's type
    Generic,
    /// Inputs have the mode's type, the output is a float
    Reduce,
    /// Fixed three-component inputs and output, no modes
    FixedVec3,
}

/// One input of a math operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MathInput {
    /// Connector name
    pub name: &'static str,
    /// Value splatted over every component when disconnected
    pub default: Option<f32>,
    /// Always a float, regardless of mode
    pub scalar: bool,
}

const fn input(name: &'static str) -> MathInput {
    MathInput {
        name,
        default: None,
        scalar: false,
    }
}

const fn defaulted(name: &'static str, default: f32) -> MathInput {
    MathInput {
        name,
        default: Some(default),
        scalar: false,
    }
}

const fn scalar(name: &'static str) -> MathInput {
    MathInput {
        name,
        default: None,
        scalar: true,
    }
}

struct MathOpInfo {
    name: &'static str,
    category: NodeCategory,
    emit: MathEmit,
    signature: MathSignature,
    inputs: &'static [MathInput],
}

macro_rules! math_ops {
    ($($op:ident => $category:ident, $emit:expr, $signature:ident, [$($input:expr),* $(,)?];)*) => {
        /// Operation of a math node
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum MathOp {
            $(
                #[doc = stringify!($op)]
                $op,
            )*
        }

        impl MathOp {
            /// Every math operation in catalogue order
            pub const ALL: &'static [MathOp] = &[$(MathOp::$op),*];

            fn info(self) -> MathOpInfo {
                match self {
                    $(
                        MathOp::$op => {
                            const INFO: MathOpInfo = MathOpInfo {
                                name: stringify!($op),
                                category: NodeCategory::$category,
                                emit: $emit,
                                signature: MathSignature::$signature,
                                inputs: &[$($input),*],
                            };
                            INFO
                        }
                    )*
                }
            }
        }
    };
}

use MathEmit::{Function, Operator, Prefix};

math_ops! {
    Add => Arithmetic, Operator("+"), Generic, [input("a"), input("b")];
    Subtract => Arithmetic, Operator("-"), Generic, [input("a"), input("b")];
    Multiply => Arithmetic, Operator("*"), Generic, [input("a"), input("b")];
    Divide => Arithmetic, Operator("/"), Generic, [input("a"), input("b")];
    Negate => Arithmetic, Prefix("-"), Generic, [input("x")];

    Radians => Trigonometric, Function("radians"), Generic, [input("degrees")];
    Degrees => Trigonometric, Function("degrees"), Generic, [input("radians")];
    Sin => Trigonometric, Function("sin"), Generic, [input("angle")];
    Cos => Trigonometric, Function("cos"), Generic, [input("angle")];
    Tan => Trigonometric, Function("tan"), Generic, [input("angle")];
    Asin => Trigonometric, Function("asin"), Generic, [input("x")];
    Acos => Trigonometric, Function("acos"), Generic, [input("x")];
    Atan => Trigonometric, Function("atan"), Generic, [input("yOverX")];
    Atan2 => Trigonometric, Function("atan"), Generic, [input("y"), input("x")];
    Sinh => Trigonometric, Function("sinh"), Generic, [input("x")];
    Cosh => Trigonometric, Function("cosh"), Generic, [input("x")];
    Tanh => Trigonometric, Function("tanh"), Generic, [input("x")];
    Asinh => Trigonometric, Function("asinh"), Generic, [input("x")];
    Acosh => Trigonometric, Function("acosh"), Generic, [input("x")];
    Atanh => Trigonometric, Function("atanh"), Generic, [input("x")];

    Pow => Exponential, Function("pow"), Generic, [input("x"), input("y")];
    Exp => Exponential, Function("exp"), Generic, [input("x")];
    Log => Exponential, Function("log"), Generic, [input("x")];
    Exp2 => Exponential, Function("exp2"), Generic, [input("x")];
    Log2 => Exponential, Function("log2"), Generic, [input("x")];
    Sqrt => Exponential, Function("sqrt"), Generic, [input("x")];
    InverseSqrt => Exponential, Function("inversesqrt"), Generic, [input("x")];

    Abs => Common, Function("abs"), Generic, [input("x")];
    Sign => Common, Function("sign"), Generic, [input("x")];
    Floor => Common, Function("floor"), Generic, [input("x")];
    Trunc => Common, Function("trunc"), Generic, [input("x")];
    Round => Common, Function("round"), Generic, [input("x")];
    RoundEven => Common, Function("roundEven"), Generic, [input("x")];
    Ceil => Common, Function("ceil"), Generic, [input("x")];
    Fract => Common, Function("fract"), Generic, [input("x")];
    Mod => Common, Function("mod"), Generic, [input("x"), input("y")];
    Min => Common, Function("min"), Generic, [input("x"), input("y")];
    Max => Common, Function("max"), Generic, [input("x"), input("y")];
    Clamp => Common, Function("clamp"), Generic, [input("x"), defaulted("minVal", 0.0), defaulted("maxVal", 1.0)];
    Mix => Common, Function("mix"), Generic, [input("x"), input("y"), defaulted("a", 0.5)];
    Step => Common, Function("step"), Generic, [input("edge"), input("x")];
    SmoothStep => Common, Function("smoothstep"), Generic, [defaulted("edge0", 0.0), defaulted("edge1", 1.0), input("x")];

    Length => Geometry, Function("length"), Reduce, [input("x")];
    Distance => Geometry, Function("distance"), Reduce, [input("p0"), input("p1")];
    Dot => Geometry, Function("dot"), Reduce, [input("x"), input("y")];
    Cross => Geometry, Function("cross"), FixedVec3, [input("x"), input("y")];
    Normalize => Geometry, Function("normalize"), Generic, [input("x")];
    FaceForward => Geometry, Function("faceforward"), Generic, [input("n"), input("i"), input("nRef")];
    Reflect => Geometry, Function("reflect"), Generic, [input("i"), input("n")];
    Refract => Geometry, Function("refract"), Generic, [input("i"), input("n"), scalar("eta")];

    DFdx => Derivative, Function("dFdx"), Generic, [input("p")];
    DFdy => Derivative, Function("dFdy"), Generic, [input("p")];
    Fwidth => Derivative, Function("fwidth"), Generic, [input("p")];
}

impl MathOp {
    /// Stable type name
    pub fn type_name(self) -> &'static str {
        self.info().name
    }

    /// Category
    pub fn category(self) -> NodeCategory {
        self.info().category
    }

    /// Emission form
    pub fn emit(self) -> MathEmit {
        self.info().emit
    }

    /// Type signature
    pub fn signature(self) -> MathSignature {
        self.info().signature
    }

    /// Inputs in connector order
    pub fn inputs(self) -> &'static [MathInput] {
        self.info().inputs
    }

    fn modes(self) -> &'static [ConnectorType] {
        match self.signature() {
            MathSignature::FixedVec3 => NO_MODES,
            MathSignature::Generic | MathSignature::Reduce => SCALAR_AND_VECTOR_MODES,
        }
    }

    fn connectors(self, mode_type: ConnectorType) -> (Vec<InputConnector>, Vec<OutputConnector>) {
        let (operand, result) = match self.signature() {
            MathSignature::Generic => (mode_type, mode_type),
            MathSignature::Reduce => (mode_type, Float),
            MathSignature::FixedVec3 => (Vec3, Vec3),
        };

        let inputs = self
            .inputs()
            .iter()
            .map(|input| {
                let ty = if input.scalar { Float } else { operand };
                let connector = InputConnector::new(input.name, ty);
                match input.default {
                    Some(v) => connector.with_default([v; 4]),
                    None => connector,
                }
            })
            .collect();
        (inputs, vec![OutputConnector::new("result", result)])
    }
}

// ============================================================================
// Built-in environment inputs
// ============================================================================

/// Values provided by the renderer rather than the author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltInInput {
    /// World-space fragment position
    Position,
    /// World-space interpolated normal
    Normal,
    /// World-space camera position
    CameraPosition,
    /// Render target size in pixels
    ScreenDimensions,
    /// Interpolated vertex color
    VertexColor,
    /// Window-space fragment coordinate
    FragmentCoordinate,
    /// Camera near plane, far plane and vertical field of view
    CameraProperties,
    /// First texture coordinate set
    TextureCoordinates,
}

impl BuiltInInput {
    /// Every built-in input
    pub const ALL: [BuiltInInput; 8] = [
        Self::Position,
        Self::Normal,
        Self::CameraPosition,
        Self::ScreenDimensions,
        Self::VertexColor,
        Self::FragmentCoordinate,
        Self::CameraProperties,
        Self::TextureCoordinates,
    ];

    /// Stable type name
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Position => "Position",
            Self::Normal => "Normal",
            Self::CameraPosition => "CameraPosition",
            Self::ScreenDimensions => "ScreenDimensions",
            Self::VertexColor => "VertexColor",
            Self::FragmentCoordinate => "FragmentCoordinate",
            Self::CameraProperties => "CameraProperties",
            Self::TextureCoordinates => "TextureCoordinates",
        }
    }

    /// Output connectors
    pub fn outputs(self) -> &'static [(&'static str, ConnectorType)] {
        match self {
            Self::Position => &[("position", Vec3)],
            Self::Normal => &[("normal", Vec3)],
            Self::CameraPosition => &[("position", Vec3)],
            Self::ScreenDimensions => &[("dimensions", Vec2)],
            Self::VertexColor => &[("color", Vec4)],
            Self::FragmentCoordinate => &[("coordinate", Vec4)],
            Self::CameraProperties => &[("zNear", Float), ("zFar", Float), ("fieldOfView", Float)],
            Self::TextureCoordinates => &[("uv", Vec2)],
        }
    }
}

// ============================================================================
// Node payloads
// ============================================================================

/// Payload of Constant and Variable nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueNode {
    /// Author-assigned name; required for variables
    #[serde(default)]
    pub name: String,
    /// Literal value, truncated to the current arity
    pub value: [f32; 4],
    /// Selected mode
    #[serde(default)]
    pub mode: ModeId,
}

/// Payload of texture nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureNode {
    /// Author-assigned binding name
    #[serde(default)]
    pub name: String,
    /// Selected mode
    #[serde(default)]
    pub mode: ModeId,
}

/// Payload of Splitter and Joiner nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalNode {
    /// Selected mode
    pub mode: ModeId,
}

/// Payload of math nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MathNode {
    /// Operation
    pub op: MathOp,
    /// Selected mode
    #[serde(default)]
    pub mode: ModeId,
}

/// Discriminant of [`MaterialNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialNodeType {
    /// The material output
    Output,
    /// Inline literal
    Constant,
    /// Named value stored in the material data buffer
    Variable,
    /// Named texture sample
    TextureInput,
    /// Named normal map sample
    NormalMapInput,
    /// Vector to scalars
    Splitter,
    /// Scalars to vector
    Joiner,
    /// Renderer-provided value
    BuiltIn(BuiltInInput),
    /// Math operation
    Math(MathOp),
}

impl MaterialNodeType {
    /// Every node type in catalogue order
    pub fn all() -> Vec<MaterialNodeType> {
        let mut types = vec![
            Self::Output,
            Self::Constant,
            Self::Variable,
            Self::TextureInput,
            Self::NormalMapInput,
            Self::Splitter,
            Self::Joiner,
        ];
        types.extend(BuiltInInput::ALL.iter().map(|b| Self::BuiltIn(*b)));
        types.extend(MathOp::ALL.iter().map(|op| Self::Math(*op)));
        types
    }

    /// Stable type name
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Output => "Output",
            Self::Constant => "Constant",
            Self::Variable => "Variable",
            Self::TextureInput => "TextureInput",
            Self::NormalMapInput => "NormalMapInput",
            Self::Splitter => "Splitter",
            Self::Joiner => "Joiner",
            Self::BuiltIn(input) => input.type_name(),
            Self::Math(op) => op.type_name(),
        }
    }

    /// Localization key of the display name
    pub fn name_key(self) -> String {
        format!("material_node.{}", self.type_name())
    }

    /// Category
    pub fn category(self) -> NodeCategory {
        match self {
            Self::Output => NodeCategory::Output,
            Self::Constant | Self::Variable => NodeCategory::Input,
            Self::TextureInput | Self::NormalMapInput => NodeCategory::Texture,
            Self::Splitter | Self::Joiner => NodeCategory::Vector,
            Self::BuiltIn(_) => NodeCategory::Environment,
            Self::Math(op) => op.category(),
        }
    }

    /// Payload of a freshly added node of this type
    pub fn create(self) -> MaterialNode {
        match self {
            Self::Output => MaterialNode::Output(OutputNode::default()),
            Self::Constant => MaterialNode::Constant(ValueNode {
                name: String::new(),
                value: [0.0; 4],
                mode: ModeId(0),
            }),
            Self::Variable => MaterialNode::Variable(ValueNode {
                name: String::new(),
                value: [0.0; 4],
                mode: ModeId(0),
            }),
            Self::TextureInput => MaterialNode::TextureInput(TextureNode {
                name: String::new(),
                mode: ModeId(3),
            }),
            Self::NormalMapInput => MaterialNode::NormalMapInput(TextureNode {
                name: String::new(),
                mode: ModeId(0),
            }),
            Self::Splitter => MaterialNode::Splitter(ModalNode { mode: ModeId(2) }),
            Self::Joiner => MaterialNode::Joiner(ModalNode { mode: ModeId(2) }),
            Self::BuiltIn(input) => MaterialNode::BuiltIn(input),
            Self::Math(op) => MaterialNode::Math(MathNode { op, mode: ModeId(0) }),
        }
    }
}

impl fmt::Display for MaterialNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Payload of a material graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MaterialNode {
    /// The material output, pinned to key 0
    Output(OutputNode),
    /// Inline literal
    Constant(ValueNode),
    /// Named value stored in the material data buffer
    Variable(ValueNode),
    /// Named texture sample
    TextureInput(TextureNode),
    /// Named normal map sample
    NormalMapInput(TextureNode),
    /// Vector to scalars
    Splitter(ModalNode),
    /// Scalars to vector
    Joiner(ModalNode),
    /// Renderer-provided value
    BuiltIn(BuiltInInput),
    /// Math operation
    Math(MathNode),
}

impl MaterialNode {
    /// Discriminant
    pub fn node_type(&self) -> MaterialNodeType {
        match self {
            Self::Output(_) => MaterialNodeType::Output,
            Self::Constant(_) => MaterialNodeType::Constant,
            Self::Variable(_) => MaterialNodeType::Variable,
            Self::TextureInput(_) => MaterialNodeType::TextureInput,
            Self::NormalMapInput(_) => MaterialNodeType::NormalMapInput,
            Self::Splitter(_) => MaterialNodeType::Splitter,
            Self::Joiner(_) => MaterialNodeType::Joiner,
            Self::BuiltIn(input) => MaterialNodeType::BuiltIn(*input),
            Self::Math(node) => MaterialNodeType::Math(node.op),
        }
    }

    /// Author-assigned name, for node kinds that carry one
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Constant(node) | Self::Variable(node) => Some(&node.name),
            Self::TextureInput(node) | Self::NormalMapInput(node) => Some(&node.name),
            _ => None,
        }
    }

    /// Set the author-assigned name. Returns `false` if the kind has none.
    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        match self {
            Self::Constant(node) | Self::Variable(node) => node.name = name.into(),
            Self::TextureInput(node) | Self::NormalMapInput(node) => node.name = name.into(),
            _ => return false,
        }
        true
    }

    /// Stored literal of Constant and Variable nodes
    pub fn value(&self) -> Option<[f32; 4]> {
        match self {
            Self::Constant(node) | Self::Variable(node) => Some(node.value),
            _ => None,
        }
    }

    /// Set the stored literal. Returns `false` if the kind has none.
    pub fn set_value(&mut self, value: [f32; 4]) -> bool {
        match self {
            Self::Constant(node) | Self::Variable(node) => {
                node.value = value;
                true
            }
            _ => false,
        }
    }

    /// Whether the node samples a texture binding
    pub fn is_texture(&self) -> bool {
        matches!(self, Self::TextureInput(_) | Self::NormalMapInput(_))
    }

    /// Value types selectable as modes; empty for non-modal nodes
    pub fn modes(&self) -> &'static [ConnectorType] {
        match self {
            Self::Constant(_) | Self::Variable(_) | Self::TextureInput(_) => SCALAR_AND_VECTOR_MODES,
            Self::Splitter(_) | Self::Joiner(_) => VECTOR_MODES,
            Self::Math(node) => node.op.modes(),
            Self::Output(_) | Self::NormalMapInput(_) | Self::BuiltIn(_) => NO_MODES,
        }
    }

    /// Selected mode
    pub fn mode(&self) -> ModeId {
        match self {
            Self::Constant(node) | Self::Variable(node) => node.mode,
            Self::TextureInput(node) | Self::NormalMapInput(node) => node.mode,
            Self::Splitter(node) | Self::Joiner(node) => node.mode,
            Self::Math(node) => node.mode,
            Self::Output(_) | Self::BuiltIn(_) => ModeId(0),
        }
    }

    /// Value type of the selected mode, if the node is modal and the mode
    /// is in range
    pub fn mode_type(&self) -> Option<ConnectorType> {
        self.modes().get(self.mode().index()).copied()
    }

    /// Switch from `current` to `requested` mode.
    ///
    /// Returns `false` without changing anything if the node is not modal,
    /// `current` is not the selected mode or `requested` is out of range.
    pub fn on_mode_change(&mut self, current: ModeId, requested: ModeId) -> bool {
        if current != self.mode() || requested.index() >= self.modes().len() {
            return false;
        }
        match self {
            Self::Constant(node) | Self::Variable(node) => node.mode = requested,
            Self::TextureInput(node) | Self::NormalMapInput(node) => node.mode = requested,
            Self::Splitter(node) | Self::Joiner(node) => node.mode = requested,
            Self::Math(node) => node.mode = requested,
            Self::Output(_) | Self::BuiltIn(_) => return false,
        }
        true
    }

    /// Connector lists for the selected mode
    pub fn connectors(&self, family: &MaterialFamilyDefinition) -> (Vec<InputConnector>, Vec<OutputConnector>) {
        let mode_type = self.mode_type().unwrap_or(Float);
        match self {
            Self::Output(_) => (output_connectors(family), Vec::new()),
            Self::Constant(_) | Self::Variable(_) => (Vec::new(), vec![OutputConnector::new("value", mode_type)]),
            Self::TextureInput(_) => (
                vec![InputConnector::new("uv", Vec2)],
                vec![OutputConnector::new("value", mode_type)],
            ),
            Self::NormalMapInput(_) => (
                vec![InputConnector::new("uv", Vec2)],
                vec![OutputConnector::new("normal", Vec3)],
            ),
            Self::Splitter(_) => {
                let width = mode_type.component_count() as usize;
                let outputs = SWIZZLE
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let connector = OutputConnector::new(*name, Float);
                        if i < width { connector } else { connector.disabled() }
                    })
                    .collect();
                (vec![InputConnector::new("vector", mode_type)], outputs)
            }
            Self::Joiner(_) => {
                let width = mode_type.component_count() as usize;
                let inputs = SWIZZLE
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let connector = InputConnector::new(*name, Float).with_default([0.0; 4]);
                        if i < width { connector } else { connector.disabled() }
                    })
                    .collect();
                (inputs, vec![OutputConnector::new("vector", mode_type)])
            }
            Self::BuiltIn(input) => (
                Vec::new(),
                input
                    .outputs()
                    .iter()
                    .map(|(name, ty)| OutputConnector::new(*name, *ty))
                    .collect(),
            ),
            Self::Math(node) => node.op.connectors(mode_type),
        }
    }

    /// Type and enabled state of every connector for the selected mode
    pub fn connector_shapes(
        &self,
        family: &MaterialFamilyDefinition,
    ) -> (Vec<ConnectorShape>, Vec<ConnectorShape>) {
        let (inputs, outputs) = self.connectors(family);
        (
            inputs.iter().map(InputConnector::shape).collect(),
            outputs.iter().map(OutputConnector::shape).collect(),
        )
    }
}

impl LogicNodeData for MaterialNode {
    fn type_name(&self) -> &'static str {
        self.node_type().type_name()
    }

    fn is_unique(&self) -> bool {
        matches!(self, Self::Output(_))
    }
}

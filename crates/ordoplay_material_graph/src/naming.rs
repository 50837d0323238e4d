// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identifier rules shared by family definitions and named nodes.

/// Prefix reserved for synthetic padding fields of the material data block
pub const PADDING_PREFIX: &str = "padding";

/// GLSL keywords, reserved words, built-in types and the built-in functions
/// family snippets commonly call. Only entries matching the identifier
/// grammar are listed; names with underscores can never be chosen.
const GLSL_RESERVED_WORDS: &[&str] = &[
    // keywords
    "attribute", "const", "uniform", "varying", "buffer", "shared", "coherent", "volatile", "restrict",
    "readonly", "writeonly", "layout", "centroid", "flat", "smooth", "noperspective", "patch", "sample",
    "break", "continue", "do", "for", "while", "switch", "case", "default", "if", "else", "subroutine",
    "in", "out", "inout", "invariant", "precise", "discard", "return", "struct", "true", "false",
    "lowp", "mediump", "highp", "precision",
    // reserved for future use
    "common", "partition", "active", "asm", "class", "union", "enum", "typedef", "template", "this",
    "resource", "goto", "inline", "noinline", "public", "static", "extern", "external", "interface",
    "long", "short", "half", "fixed", "unsigned", "superp", "input", "output", "filter", "sizeof", "cast",
    "namespace", "using",
    // scalar and vector types
    "void", "bool", "int", "uint", "float", "double",
    "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4", "uvec2", "uvec3", "uvec4",
    "bvec2", "bvec3", "bvec4", "dvec2", "dvec3", "dvec4",
    "hvec2", "hvec3", "hvec4", "fvec2", "fvec3", "fvec4",
    // matrix types
    "mat2", "mat3", "mat4", "mat2x2", "mat2x3", "mat2x4", "mat3x2", "mat3x3", "mat3x4", "mat4x2", "mat4x3",
    "mat4x4", "dmat2", "dmat3", "dmat4", "dmat2x2", "dmat2x3", "dmat2x4", "dmat3x2", "dmat3x3", "dmat3x4",
    "dmat4x2", "dmat4x3", "dmat4x4",
    // opaque types
    "sampler", "sampler1D", "sampler2D", "sampler3D", "samplerCube", "sampler1DShadow", "sampler2DShadow",
    "samplerCubeShadow", "sampler1DArray", "sampler2DArray", "sampler1DArrayShadow", "sampler2DArrayShadow",
    "samplerCubeArray", "samplerCubeArrayShadow", "sampler2DRect", "sampler2DRectShadow", "sampler3DRect",
    "samplerBuffer", "sampler2DMS", "sampler2DMSArray", "isampler2D", "usampler2D", "texture2D",
    "image1D", "image2D", "image3D", "imageCube", "imageBuffer", "image2DArray",
    // built-in functions
    "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "pow", "exp",
    "log", "exp2", "log2", "sqrt", "inversesqrt", "abs", "sign", "floor", "trunc", "round", "ceil", "fract",
    "mod", "min", "max", "clamp", "mix", "step", "smoothstep", "length", "distance", "dot", "cross",
    "normalize", "reflect", "refract", "faceforward", "transpose", "inverse", "determinant", "texture",
    "textureLod", "texelFetch", "textureSize", "dFdx", "dFdy", "fwidth",
];

/// Check `[A-Za-z][A-Za-z0-9]*`.
///
/// Names that pass are usable as shader identifiers as well as function and
/// file names.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// Whether the name collides with synthetic padding fields
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(PADDING_PREFIX)
}

/// Whether GLSL reserves the name as a keyword, type or built-in function
pub fn is_glsl_reserved_word(name: &str) -> bool {
    GLSL_RESERVED_WORDS.contains(&name)
}

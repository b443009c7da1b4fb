use derive_more::From;
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::KernelArgType;

/// A kernel argument value which could be passed around by value.
///
/// Used both as the runtime value bound to a kernel slot and as a min/max bound of a
/// configured argument. The variant always matches the [`KernelArgType`] the value was built for.
#[derive(Debug, Clone, Copy, PartialEq, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KernelArgValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Vector2F32([f32; 2]),
    Vector2F64([f64; 2]),
    Vector3F32([f32; 3]),
    Vector3F64([f64; 3]),
}

impl From<bool> for KernelArgValue {
    fn from(value: bool) -> Self {
        Self::Int32(value as i32)
    }
}

impl KernelArgValue {
    /// The type tag this value was constructed with.
    pub const fn arg_type(&self) -> KernelArgType {
        match self {
            KernelArgValue::Int32(_) => KernelArgType::Int32,
            KernelArgValue::Int64(_) => KernelArgType::Int64,
            KernelArgValue::Float32(_) => KernelArgType::Float32,
            KernelArgValue::Float64(_) => KernelArgType::Float64,
            KernelArgValue::Vector2F32(_) => KernelArgType::Vector2F32,
            KernelArgValue::Vector2F64(_) => KernelArgType::Vector2F64,
            KernelArgValue::Vector3F32(_) => KernelArgType::Vector3F32,
            KernelArgValue::Vector3F64(_) => KernelArgType::Vector3F64,
        }
    }

    /// Number of bytes this value occupies in a kernel argument slot.
    pub const fn size(&self) -> usize {
        match self {
            KernelArgValue::Int32(_) | KernelArgValue::Float32(_) => 4,
            KernelArgValue::Int64(_) | KernelArgValue::Float64(_) => 8,
            KernelArgValue::Vector2F32(_) => 8,
            KernelArgValue::Vector2F64(_) => 16,
            KernelArgValue::Vector3F32(_) => 12,
            KernelArgValue::Vector3F64(_) => 24,
        }
    }

    /// Raw bytes of the value in native byte order, laid out component after component.
    pub fn to_bytes(&self) -> Box<[u8]> {
        match self {
            KernelArgValue::Int32(x) => bytemuck::bytes_of(x).into(),
            KernelArgValue::Int64(x) => bytemuck::bytes_of(x).into(),
            KernelArgValue::Float32(x) => bytemuck::bytes_of(x).into(),
            KernelArgValue::Float64(x) => bytemuck::bytes_of(x).into(),
            KernelArgValue::Vector2F32(x) => bytemuck::cast_slice(x).into(),
            KernelArgValue::Vector2F64(x) => bytemuck::cast_slice(x).into(),
            KernelArgValue::Vector3F32(x) => bytemuck::cast_slice(x).into(),
            KernelArgValue::Vector3F64(x) => bytemuck::cast_slice(x).into(),
        }
    }

    /// All components widened to `f64`. Scalars have exactly one component.
    pub fn components(&self) -> Vec<f64> {
        match *self {
            KernelArgValue::Int32(x) => vec![x as f64],
            KernelArgValue::Int64(x) => vec![x as f64],
            KernelArgValue::Float32(x) => vec![x as f64],
            KernelArgValue::Float64(x) => vec![x],
            KernelArgValue::Vector2F32(x) => x.map(|x| x as f64).to_vec(),
            KernelArgValue::Vector2F64(x) => x.to_vec(),
            KernelArgValue::Vector3F32(x) => x.map(|x| x as f64).to_vec(),
            KernelArgValue::Vector3F64(x) => x.to_vec(),
        }
    }

    /// Component `index` widened to `f64`, or `None` if out of range.
    #[inline]
    pub fn component(&self, index: usize) -> Option<f64> {
        self.components().get(index).copied()
    }

    /// Component-wise `self <= other`. `None` if the tags differ.
    pub fn le(&self, other: &Self) -> Option<bool> {
        fn all_le<T: PartialOrd>(x: &[T], y: &[T]) -> bool {
            x.iter().zip(y).all(|(x, y)| x <= y)
        }

        use KernelArgValue::*;
        let le = match (self, other) {
            (Int32(x), Int32(y)) => x <= y,
            (Int64(x), Int64(y)) => x <= y,
            (Float32(x), Float32(y)) => x <= y,
            (Float64(x), Float64(y)) => x <= y,
            (Vector2F32(x), Vector2F32(y)) => all_le(x, y),
            (Vector2F64(x), Vector2F64(y)) => all_le(x, y),
            (Vector3F32(x), Vector3F32(y)) => all_le(x, y),
            (Vector3F64(x), Vector3F64(y)) => all_le(x, y),
            _ => return None,
        };
        Some(le)
    }

    /// Checks if this value lies between `min` and `max`, component-wise and inclusive.
    /// Values of mismatching tags are never in between.
    #[inline]
    pub fn between(&self, min: &Self, max: &Self) -> bool {
        min.le(self).unwrap_or(false) && self.le(max).unwrap_or(false)
    }
}

impl std::fmt::Display for KernelArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelArgValue::Int32(x) => write!(f, "{x}"),
            KernelArgValue::Int64(x) => write!(f, "{x}"),
            KernelArgValue::Float32(x) => write!(f, "{x}"),
            KernelArgValue::Float64(x) => write!(f, "{x}"),
            KernelArgValue::Vector2F32(x) => write!(f, "({})", x.iter().format(", ")),
            KernelArgValue::Vector2F64(x) => write!(f, "({})", x.iter().format(", ")),
            KernelArgValue::Vector3F32(x) => write!(f, "({})", x.iter().format(", ")),
            KernelArgValue::Vector3F64(x) => write!(f, "({})", x.iter().format(", ")),
        }
    }
}

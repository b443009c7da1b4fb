use derive_more::Display;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::value::KernelArgValue;

/// Semantic type of a kernel argument, recovered from the platform-reported type name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KernelArgType {
    #[default]
    Unknown,
    Int32,
    Int64,
    Float32,
    Float64,
    Vector2F32,
    Vector2F64,
    Vector3F32,
    Vector3F64,
    Image,
    Buffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KernelArgClass {
    Integer,
    FloatingPoint,
    Memory,
}

pub type FromComponents = fn(&[f64]) -> Option<KernelArgValue>;

/// Per-type traits: how many numeric components a value has, how to build one, and its class.
#[derive(Debug, Clone, Copy)]
pub struct KernelArgTypeTraits {
    pub num_components: usize,
    /// Builds a value out of exactly `num_components` components. Always `None` for memory types.
    pub from_components: FromComponents,
    pub class: KernelArgClass,
}

impl KernelArgType {
    /// Looks a platform-reported type name up in the catalog.
    ///
    /// Both OpenCL C keywords and WGSL spellings are recognized. Returns `None` for anything else;
    /// the caller then decides between [`KernelArgType::Buffer`] and [`KernelArgType::Unknown`]
    /// from the argument's address qualifier.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let r#type = match name {
            "int" | "uint" | "i32" | "u32" => Self::Int32,
            "long" | "ulong" | "i64" | "u64" => Self::Int64,
            "float" | "f32" => Self::Float32,
            "double" | "f64" => Self::Float64,
            "float2" | "vec2<f32>" | "vec2f" => Self::Vector2F32,
            "double2" | "vec2<f64>" => Self::Vector2F64,
            "float3" | "vec3<f32>" | "vec3f" => Self::Vector3F32,
            "double3" | "vec3<f64>" => Self::Vector3F64,
            "image1d_t" | "image2d_t" | "image3d_t" => Self::Image,
            "texture_1d" | "texture_2d" | "texture_3d" => Self::Image,
            "texture_storage_1d" | "texture_storage_2d" | "texture_storage_3d" => Self::Image,
            _ => return None,
        };
        Some(r#type)
    }

    /// Traits of the type. `None` only for [`KernelArgType::Unknown`].
    pub fn traits(self) -> Option<KernelArgTypeTraits> {
        use KernelArgClass::*;

        let (num_components, from_components, class) = match self {
            KernelArgType::Unknown => return None,
            KernelArgType::Int32 => (1, int32 as FromComponents, Integer),
            KernelArgType::Int64 => (1, int64 as FromComponents, Integer),
            KernelArgType::Float32 => (1, float32 as FromComponents, FloatingPoint),
            KernelArgType::Float64 => (1, float64 as FromComponents, FloatingPoint),
            KernelArgType::Vector2F32 => (2, vector2_f32 as FromComponents, FloatingPoint),
            KernelArgType::Vector2F64 => (2, vector2_f64 as FromComponents, FloatingPoint),
            KernelArgType::Vector3F32 => (3, vector3_f32 as FromComponents, FloatingPoint),
            KernelArgType::Vector3F64 => (3, vector3_f64 as FromComponents, FloatingPoint),
            KernelArgType::Image | KernelArgType::Buffer => (0, memory as FromComponents, Memory),
        };
        Some(KernelArgTypeTraits {
            num_components,
            from_components,
            class,
        })
    }

    /// Byte size of a value of this type, or `None` for memory and unknown types.
    pub const fn size(self) -> Option<usize> {
        match self {
            KernelArgType::Int32 | KernelArgType::Float32 => Some(4),
            KernelArgType::Int64 | KernelArgType::Float64 | KernelArgType::Vector2F32 => Some(8),
            KernelArgType::Vector3F32 => Some(12),
            KernelArgType::Vector2F64 => Some(16),
            KernelArgType::Vector3F64 => Some(24),
            KernelArgType::Unknown | KernelArgType::Image | KernelArgType::Buffer => None,
        }
    }

    /// Returns `true` if values of this type can be bound to a kernel slot.
    #[inline]
    pub fn is_numeric(self) -> bool {
        self.traits()
            .is_some_and(|traits| traits.class != KernelArgClass::Memory)
    }
}

fn int32(x: &[f64]) -> Option<KernelArgValue> {
    match *x {
        [x] => Some(KernelArgValue::Int32(x as i32)),
        _ => None,
    }
}

fn int64(x: &[f64]) -> Option<KernelArgValue> {
    match *x {
        [x] => Some(KernelArgValue::Int64(x as i64)),
        _ => None,
    }
}

fn float32(x: &[f64]) -> Option<KernelArgValue> {
    match *x {
        [x] => Some(KernelArgValue::Float32(x as f32)),
        _ => None,
    }
}

fn float64(x: &[f64]) -> Option<KernelArgValue> {
    match *x {
        [x] => Some(KernelArgValue::Float64(x)),
        _ => None,
    }
}

fn vector2_f32(x: &[f64]) -> Option<KernelArgValue> {
    match *x {
        [x, y] => Some(KernelArgValue::Vector2F32([x as f32, y as f32])),
        _ => None,
    }
}

fn vector2_f64(x: &[f64]) -> Option<KernelArgValue> {
    match *x {
        [x, y] => Some(KernelArgValue::Vector2F64([x, y])),
        _ => None,
    }
}

fn vector3_f32(x: &[f64]) -> Option<KernelArgValue> {
    match *x {
        [x, y, z] => Some(KernelArgValue::Vector3F32([x as f32, y as f32, z as f32])),
        _ => None,
    }
}

fn vector3_f64(x: &[f64]) -> Option<KernelArgValue> {
    match *x {
        [x, y, z] => Some(KernelArgValue::Vector3F64([x, y, z])),
        _ => None,
    }
}

fn memory(_: &[f64]) -> Option<KernelArgValue> {
    None
}

/// Finds the traits of `type`. Returns `None` for [`KernelArgType::Unknown`].
#[inline]
pub fn find_type_traits(r#type: KernelArgType) -> Option<KernelArgTypeTraits> {
    r#type.traits()
}

#[cfg(test)]
mod tests {
    use super::{KernelArgClass, KernelArgType, find_type_traits};
    use crate::arg::KernelArgValue;

    const NUMERIC: [KernelArgType; 8] = [
        KernelArgType::Int32,
        KernelArgType::Int64,
        KernelArgType::Float32,
        KernelArgType::Float64,
        KernelArgType::Vector2F32,
        KernelArgType::Vector2F64,
        KernelArgType::Vector3F32,
        KernelArgType::Vector3F64,
    ];

    #[test]
    fn test_catalog() {
        assert_eq!(KernelArgType::from_type_name("uint"), Some(KernelArgType::Int32));
        assert_eq!(KernelArgType::from_type_name("u32"), Some(KernelArgType::Int32));
        assert_eq!(KernelArgType::from_type_name("ulong"), Some(KernelArgType::Int64));
        assert_eq!(
            KernelArgType::from_type_name("double2"),
            Some(KernelArgType::Vector2F64)
        );
        assert_eq!(
            KernelArgType::from_type_name("vec3<f32>"),
            Some(KernelArgType::Vector3F32)
        );
        assert_eq!(KernelArgType::from_type_name("image2d_t"), Some(KernelArgType::Image));
        assert_eq!(
            KernelArgType::from_type_name("texture_storage_2d"),
            Some(KernelArgType::Image)
        );
        assert_eq!(KernelArgType::from_type_name("float4"), None);
        assert_eq!(KernelArgType::from_type_name("array<f32>"), None);
    }

    #[test]
    fn test_traits() {
        for r#type in NUMERIC {
            let traits = find_type_traits(r#type).expect("numeric types have traits");
            assert!((1..=3).contains(&traits.num_components));
            assert_ne!(traits.class, KernelArgClass::Memory);

            let components = vec![1.0; traits.num_components];
            let value = (traits.from_components)(&components).expect("value");
            assert_eq!(value.arg_type(), r#type);
            assert_eq!(Some(value.size()), r#type.size());

            // wrong number of components
            let components = vec![1.0; traits.num_components + 1];
            assert_eq!((traits.from_components)(&components), None);
        }

        assert_eq!(
            find_type_traits(KernelArgType::Int32).map(|traits| traits.class),
            Some(KernelArgClass::Integer)
        );
        assert!(find_type_traits(KernelArgType::Unknown).is_none());
        assert!(!KernelArgType::Unknown.is_numeric());
    }

    #[test]
    fn test_memory_traits() {
        let r#type = KernelArgType::from_type_name("image2d_t").expect("image");
        for r#type in [r#type, KernelArgType::Buffer] {
            let traits = find_type_traits(r#type).expect("memory types have traits");
            assert_eq!(traits.class, KernelArgClass::Memory);
            assert_eq!(traits.num_components, 0);
            assert_eq!((traits.from_components)(&[]), None);
            assert!(!r#type.is_numeric());
            assert_eq!(r#type.size(), None);
        }
    }

    #[test]
    fn test_integer_truncation() {
        let traits = find_type_traits(KernelArgType::Int32).expect("traits");
        assert_eq!(
            (traits.from_components)(&[2.75]),
            Some(KernelArgValue::Int32(2))
        );
    }
}

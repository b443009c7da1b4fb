//! Per-argument configuration: default, min, max and user extensions, parsed from text.
//!
//! One record per line, tokens separated by whitespace:
//!
//! ```text
//! <name-or-index> (<max> <min> <default>){k} [extension tokens...]
//! ```
//!
//! where `k` is the number of components of the argument's type. Note that each component
//! lists its bounds as max, min, then default. Blank lines are skipped; line numbers in errors
//! count them, leading blank lines included.

use std::{iter::Peekable, str::SplitWhitespace};

use thiserror::Error;

use super::{ArgKey, KernelArgClass, KernelArgType, KernelArgValue, KernelArgs};
use crate::kernel::ReflectedArg;

/// The whitespace-separated tokens of one record.
#[derive(Debug, Clone)]
pub struct Tokens<'a>(Peekable<SplitWhitespace<'a>>);

impl<'a> Tokens<'a> {
    #[inline]
    pub fn new(record: &'a str) -> Self {
        Self(record.split_whitespace().peekable())
    }

    #[inline]
    pub fn peek(&mut self) -> Option<&'a str> {
        self.0.peek().copied()
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    #[error("unexpected token `{0}`")]
    Unexpected(String),
    #[error("invalid value `{value}` for `{key}`")]
    Invalid { key: String, value: String },
}

/// User data attached to each configured argument, parsed from the tokens after the bounds.
///
/// `()` ignores the trailing tokens. Structs can `#[derive(ArgExtension)]`.
pub trait ArgExtension: Sized {
    fn parse_ext(tokens: &mut Tokens<'_>) -> Result<Self, ExtensionError>;
}

impl ArgExtension for () {
    #[inline]
    fn parse_ext(_: &mut Tokens<'_>) -> Result<Self, ExtensionError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgProperties<E = ()> {
    /// Native index of the argument.
    pub index: usize,
    pub default_value: KernelArgValue,
    pub min: KernelArgValue,
    pub max: KernelArgValue,
    pub ext: E,
}

/// Properties of the configured arguments, ordered by argument index.
///
/// Sparse: arguments without a record have no entry, so positions do not line up with the
/// kernel's argument list. Look entries up by native index with [`Configuration::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration<E = ()>(Vec<ArgProperties<E>>);

impl<E> Configuration<E> {
    /// Number of configured arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Configured arguments in ascending index order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, ArgProperties<E>> {
        self.0.iter()
    }

    /// Properties of the argument at native `index`.
    pub fn get(&self, index: usize) -> Option<&ArgProperties<E>> {
        self.0
            .binary_search_by_key(&index, |properties| properties.index)
            .ok()
            .map(|position| &self.0[position])
    }

    /// Bindings of every configured argument to its default value.
    pub fn defaults(&self) -> KernelArgs {
        self.0
            .iter()
            .map(|properties| (ArgKey::Index(properties.index), properties.default_value))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line of the failing record.
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("no such argument: {0}")]
    NoSuchArgument(String),
    #[error("argument index is out of range ({index}/{count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("argument {name} (#{index}) of type {arg_type} takes no numeric value")]
    NotNumeric {
        name: String,
        index: usize,
        arg_type: KernelArgType,
    },
    #[error("cannot parse def/min/max for component #{component} of argument {name} (#{index})")]
    Component {
        component: usize,
        name: String,
        index: usize,
    },
    #[error("argument {name} (#{index}) is configured twice")]
    Duplicate { name: String, index: usize },
    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

fn resolve(token: &str, args: &[ReflectedArg]) -> Result<usize, ParseErrorKind> {
    let index = match token.parse::<u32>() {
        Ok(index) => index as usize,
        Err(_) => args
            .iter()
            .position(|arg| arg.name == token)
            .ok_or_else(|| ParseErrorKind::NoSuchArgument(token.to_string()))?,
    };
    match index < args.len() {
        true => Ok(index),
        false => Err(ParseErrorKind::IndexOutOfRange {
            index,
            count: args.len(),
        }),
    }
}

fn parse_record<E: ArgExtension>(
    key: &str,
    mut tokens: Tokens<'_>,
    args: &[ReflectedArg],
) -> Result<ArgProperties<E>, ParseErrorKind> {
    let index = resolve(key, args)?;

    let ReflectedArg { r#type, name } = &args[index];
    let not_numeric = || ParseErrorKind::NotNumeric {
        name: name.clone(),
        index,
        arg_type: *r#type,
    };
    let traits = r#type
        .traits()
        .filter(|traits| traits.class != KernelArgClass::Memory)
        .ok_or_else(not_numeric)?;
    log::info!("parsing def/min/max values for argument {name} (#{index})");

    let mut defaults = Vec::with_capacity(traits.num_components);
    let mut mins = Vec::with_capacity(traits.num_components);
    let mut maxs = Vec::with_capacity(traits.num_components);
    for component in 0..traits.num_components {
        let mut next = || tokens.next().and_then(|token| token.parse::<f64>().ok());
        let (Some(max), Some(min), Some(default)) = (next(), next(), next()) else {
            return Err(ParseErrorKind::Component {
                component,
                name: name.clone(),
                index,
            });
        };
        log::info!("\tcomponent #{component}: def/min/max = {default}/{min}/{max}");
        defaults.push(default);
        mins.push(min);
        maxs.push(max);
    }

    let construct =
        |components: &[f64]| (traits.from_components)(components).ok_or_else(not_numeric);
    let default_value = construct(&defaults)?;
    let min = construct(&mins)?;
    let max = construct(&maxs)?;
    let ext = E::parse_ext(&mut tokens)?;
    Ok(ArgProperties {
        index,
        default_value,
        min,
        max,
        ext,
    })
}

/// Parses a whole configuration against the reflected arguments of a kernel.
///
/// Any failing record fails the whole parse.
#[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
pub fn parse_configuration<E: ArgExtension>(
    text: &str,
    args: &[ReflectedArg],
) -> Result<Configuration<E>, ParseError> {
    let mut properties: Vec<ArgProperties<E>> = vec![];
    for (line, record) in text.lines().enumerate() {
        let line = line + 1;
        let mut tokens = Tokens::new(record);
        let Some(key) = tokens.next() else {
            continue;
        };

        let record = parse_record::<E>(key, tokens, args)
            .and_then(|record| match properties.iter().any(|x| x.index == record.index) {
                true => Err(ParseErrorKind::Duplicate {
                    name: args[record.index].name.clone(),
                    index: record.index,
                }),
                false => Ok(record),
            })
            .map_err(|kind| ParseError { line, kind })
            .inspect_err(|err| log::error!("{err}"))?;
        properties.push(record);
    }
    properties.sort_by_key(|properties| properties.index);
    Ok(Configuration(properties))
}

#[cfg(test)]
mod tests {
    use super::{ExtensionError, ParseError, ParseErrorKind, Tokens, parse_configuration};
    use crate::{
        arg::{ArgExtension, ArgKey, KernelArgType, KernelArgValue},
        kernel::ReflectedArg,
    };

    #[derive(Debug, Default, Clone, PartialEq, ArgExtension)]
    #[arg_ext(crate = "crate")]
    struct UiProperties {
        hidden: bool,
        #[arg_ext(rename = "step")]
        slider_step: f32,
        label: String,
    }

    fn newton_args() -> Vec<ReflectedArg> {
        vec![
            ReflectedArg::new(KernelArgType::Image, "image"),
            ReflectedArg::new(KernelArgType::Int32, "width"),
            ReflectedArg::new(KernelArgType::Int32, "height"),
            ReflectedArg::new(KernelArgType::Int32, "seed"),
            ReflectedArg::new(KernelArgType::Vector2F32, "center"),
            ReflectedArg::new(KernelArgType::Float64, "scale"),
            ReflectedArg::new(KernelArgType::Buffer, "hits"),
        ]
    }

    #[test]
    fn test_component_order() -> Result<(), ParseError> {
        let args = vec![ReflectedArg::new(KernelArgType::Vector2F64, "center")];
        let config = parse_configuration::<()>("0  2.0 1.0 0.5   3.0 0.0 -1.0", &args)?;
        assert_eq!(config.len(), 1);

        let properties = config.get(0).expect("configured");
        assert_eq!(properties.default_value, KernelArgValue::from([0.5f64, -1.0]));
        assert_eq!(properties.min, KernelArgValue::from([1.0f64, 0.0]));
        assert_eq!(properties.max, KernelArgValue::from([2.0f64, 3.0]));
        Ok(())
    }

    #[test]
    fn test_names_and_indices() -> Result<(), ParseError> {
        let text = "
            scale 2.0 0.0 1.0
            3 1000 0 42

            center 1 -1 0.5 1 -1 -0.5
        ";
        let config = parse_configuration::<()>(text, &newton_args())?;
        let indices: Vec<_> = config.iter().map(|properties| properties.index).collect();
        assert_eq!(indices, [3, 4, 5]);

        assert_eq!(config.get(3).map(|x| x.default_value), Some(KernelArgValue::Int32(42)));
        assert_eq!(config.get(5).map(|x| x.max), Some(KernelArgValue::Float64(2.0)));
        assert_eq!(
            config.get(4).map(|x| x.default_value),
            Some(KernelArgValue::from([0.5f32, -0.5]))
        );
        assert!(config.get(1).is_none());

        let defaults = config.defaults();
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults[&ArgKey::Index(3)], KernelArgValue::Int32(42));
        for properties in config.iter() {
            assert!(properties.default_value.between(&properties.min, &properties.max));
        }
        Ok(())
    }

    #[test]
    fn test_lookup_by_index() -> Result<(), ParseError> {
        let config = parse_configuration::<()>("center 1 -1 0 1 -1 0", &newton_args())?;
        assert_eq!(config.len(), 1);
        assert!(config.get(0).is_none());
        assert!(config.get(3).is_none());

        let center = config.get(4).expect("center");
        assert_eq!(center.index, 4);
        assert_eq!(center.default_value, KernelArgValue::from([0.0f32, 0.0]));
        assert_eq!(config.iter().map(|x| x.index).collect::<Vec<_>>(), [4]);
        Ok(())
    }

    #[test]
    fn test_errors() {
        let args = newton_args();
        let kind = |text: &str| {
            parse_configuration::<()>(text, &args)
                .map(|_| ())
                .map_err(|err| err.kind)
        };

        assert_eq!(
            kind("zoom 1 0 0.5"),
            Err(ParseErrorKind::NoSuchArgument("zoom".into()))
        );
        assert_eq!(
            kind("7 1 0 0.5"),
            Err(ParseErrorKind::IndexOutOfRange { index: 7, count: 7 })
        );
        assert_eq!(
            kind("center 1 0 0.5 1 0"),
            Err(ParseErrorKind::Component {
                component: 1,
                name: "center".into(),
                index: 4,
            })
        );
        assert_eq!(
            kind("seed 1 zero 0"),
            Err(ParseErrorKind::Component {
                component: 0,
                name: "seed".into(),
                index: 3,
            })
        );
        assert!(matches!(
            kind("image 1 0 0"),
            Err(ParseErrorKind::NotNumeric { index: 0, .. })
        ));
        assert!(matches!(
            kind("hits"),
            Err(ParseErrorKind::NotNumeric { index: 6, .. })
        ));
        assert_eq!(
            kind("seed 10 0 1\n3 10 0 2"),
            Err(ParseErrorKind::Duplicate {
                name: "seed".into(),
                index: 3
            })
        );
    }

    #[test]
    fn test_line_numbers() {
        let text = "seed 10 0 1\n\nwidth 1024 1 512\nheight 1024 1\n";
        let err = parse_configuration::<()>(text, &newton_args()).expect_err("truncated");
        assert_eq!(err.line, 4);
        assert_eq!(
            err.to_string(),
            "line 4: cannot parse def/min/max for component #0 of argument height (#2)"
        );

        let err = parse_configuration::<()>("\n\n  zoom 1 0 0", &newton_args())
            .expect_err("no such argument");
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_no_extension() -> Result<(), ParseError> {
        // trailing tokens are ignored without an extension
        let config = parse_configuration::<()>("seed 10 0 1 hidden", &newton_args())?;
        assert_eq!(config.len(), 1);
        assert!(parse_configuration::<()>("", &newton_args())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_extension() -> Result<(), ParseError> {
        let text = "seed 10 0 1 hidden\nscale 2 0 1 step=0.25 label=zoom\nwidth 1 1 1";
        let config = parse_configuration::<UiProperties>(text, &newton_args())?;

        let seed = &config.get(3).expect("seed").ext;
        assert!(seed.hidden);
        assert_eq!(seed.slider_step, 0.0);

        let scale = &config.get(5).expect("scale").ext;
        assert!(!scale.hidden);
        assert_eq!(scale.slider_step, 0.25);
        assert_eq!(scale.label, "zoom");

        assert_eq!(config.get(1).expect("width").ext, UiProperties::default());

        let err = parse_configuration::<UiProperties>("seed 10 0 1 visible", &newton_args())
            .expect_err("unknown flag");
        assert_eq!(
            err.kind,
            ParseErrorKind::Extension(ExtensionError::Unexpected("visible".into()))
        );

        let err = parse_configuration::<UiProperties>("seed 10 0 1 step=fast", &newton_args())
            .expect_err("invalid value");
        assert_eq!(
            err.kind,
            ParseErrorKind::Extension(ExtensionError::Invalid {
                key: "step".into(),
                value: "fast".into()
            })
        );
        Ok(())
    }

    #[test]
    fn test_tokens() -> Result<(), ExtensionError> {
        let mut tokens = Tokens::new("  hidden=false \t step=2 ");
        assert_eq!(tokens.peek(), Some("hidden=false"));
        let ext = UiProperties::parse_ext(&mut tokens)?;
        assert!(!ext.hidden);
        assert_eq!(ext.slider_step, 2.0);
        assert_eq!(tokens.next(), None);
        Ok(())
    }
}

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod ext;

/// Derives `ArgExtension` for a struct with named fields.
///
/// Each field is a keyword in the extension tokens of a configuration record. A `bool` field is a
/// flag: its bare name sets it, and `name=true|false` also works. Any other field takes
/// `name=value`, parsed with `FromStr`. Fields that do not appear keep their `Default` value.
///
/// Attributes:
/// - `#[arg_ext(crate = "path")]` on the struct: path of the `kiln` crate.
/// - `#[arg_ext(rename = "key")]` on a field: keyword of the field.
#[proc_macro_derive(ArgExtension, attributes(arg_ext))]
pub fn derive_arg_extension(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let expanded = match ext::derive_arg_extension(input) {
        Ok(expanded) => expanded,
        Err(err) => err.to_compile_error(),
    };
    expanded.into()
}

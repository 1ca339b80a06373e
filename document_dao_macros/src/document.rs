use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, Field, Fields, GenericArgument, LitStr, PathArguments,
    Token, Type,
};

pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let collection = extract_collection(input)?;
    let rename_all = extract_rename_all(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Document derive: only structs with named fields are supported",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Document derive: only structs are supported",
            ))
        }
    };

    let mut specs = Vec::new();
    for field in fields {
        if let Some(spec) = field_spec(field, rename_all.as_deref())? {
            specs.push(spec);
        }
    }

    Ok(quote! {
        impl #impl_generics ::document_dao::Document for #name #ty_generics #where_clause {
            const COLLECTION: &'static str = #collection;

            const FIELDS: &'static [::document_dao::FieldSpec] = &[
                #(#specs),*
            ];
        }
    })
}

fn extract_collection(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }

        let mut collection = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                collection = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported document attribute"))
            }
        })?;

        if let Some(c) = collection {
            return Ok(c);
        }
    }

    // Default: snake_case struct name + "s"
    let name = input.ident.to_string();
    Ok(format!("{}s", to_snake_case(&name)))
}

/// Field-level `#[document(...)]` settings.
#[derive(Default)]
struct FieldOptions {
    skip: bool,
    optional: bool,
    ty: Option<LitStr>,
}

fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
            } else if meta.path.is_ident("optional") {
                options.optional = true;
            } else if meta.path.is_ident("ty") {
                options.ty = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported document field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

/// Serde settings that change how a field lands in the record.
#[derive(Default)]
struct SerdeField {
    rename: Option<String>,
    skip: bool,
    /// `#[serde(default)]`: serde accepts records without the field.
    default: bool,
}

fn serde_field(field: &Field) -> syn::Result<SerdeField> {
    let mut out = SerdeField::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                out.rename = Some(value.value());
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("default") {
                out.default = true;
                if meta.input.peek(Token![=]) {
                    let _: Expr = meta.value()?.parse()?;
                }
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|inner| {
                    if inner.input.peek(Token![=]) {
                        let _: Expr = inner.value()?.parse()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn extract_rename_all(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename_all = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rename_all = Some(value.value());
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|inner| {
                    if inner.input.peek(Token![=]) {
                        let _: Expr = inner.value()?.parse()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }
    Ok(rename_all)
}

fn field_spec(field: &Field, rename_all: Option<&str>) -> syn::Result<Option<TokenStream2>> {
    let options = field_options(field)?;
    let serde = serde_field(field)?;
    if options.skip || serde.skip {
        return Ok(None);
    }

    let ident = match &field.ident {
        Some(ident) => ident,
        None => return Err(syn::Error::new_spanned(field, "expected a named field")),
    };
    let rust_name = ident.to_string();
    let rust_name = rust_name.trim_start_matches("r#");
    let stored_name = match serde.rename {
        Some(name) => name,
        None => match rename_all {
            Some(rule) => apply_rename_rule(rule, rust_name).ok_or_else(|| {
                syn::Error::new_spanned(ident, "unsupported serde rename_all rule")
            })?,
            None => rust_name.to_string(),
        },
    };

    let (inferred, inferred_required) = infer_kind(&field.ty);
    let kind = match &options.ty {
        Some(lit) => kind_from_name(&lit.value())
            .ok_or_else(|| syn::Error::new_spanned(lit, "unknown document field type"))?,
        None => inferred,
    };
    let required = inferred_required && !options.optional && !serde.default;

    let ctor = if required {
        quote!(required)
    } else {
        quote!(optional)
    };

    Ok(Some(quote! {
        ::document_dao::FieldSpec::#ctor(#stored_name, ::document_dao::FieldType::#kind)
    }))
}

fn kind_from_name(name: &str) -> Option<TokenStream2> {
    let kind = match name {
        "string" => quote!(String),
        "integer" => quote!(Integer),
        "number" => quote!(Number),
        "boolean" => quote!(Boolean),
        "array" => quote!(Array),
        "map" => quote!(Map),
        "any" => quote!(Any),
        _ => return None,
    };
    Some(kind)
}

/// Maps a Rust field type to a stored field type. The flag is false for
/// `Option<T>`.
fn infer_kind(ty: &Type) -> (TokenStream2, bool) {
    match ty {
        Type::Reference(reference) => infer_kind(&reference.elem),
        Type::Paren(paren) => infer_kind(&paren.elem),
        Type::Group(group) => infer_kind(&group.elem),
        Type::Array(_) | Type::Slice(_) => (quote!(Array), true),
        Type::Tuple(tuple) if !tuple.elems.is_empty() => (quote!(Array), true),
        Type::Path(path) => {
            let segment = match path.path.segments.last() {
                Some(segment) => segment,
                None => return (quote!(Any), true),
            };
            let ident = segment.ident.to_string();
            match ident.as_str() {
                "Option" => match first_type_argument(&segment.arguments) {
                    Some(inner) => (infer_kind(inner).0, false),
                    None => (quote!(Any), false),
                },
                "Box" | "Rc" | "Arc" => match first_type_argument(&segment.arguments) {
                    Some(inner) => infer_kind(inner),
                    None => (quote!(Any), true),
                },
                "String" | "str" | "char" => (quote!(String), true),
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32"
                | "u64" | "u128" | "usize" => (quote!(Integer), true),
                "f32" | "f64" => (quote!(Number), true),
                "bool" => (quote!(Boolean), true),
                "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" => {
                    (quote!(Array), true)
                }
                "HashMap" | "BTreeMap" | "Map" | "Record" => (quote!(Map), true),
                _ => (quote!(Any), true),
            }
        }
        _ => (quote!(Any), true),
    }
}

fn first_type_argument(arguments: &PathArguments) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = arguments {
        for arg in &args.args {
            if let GenericArgument::Type(ty) = arg {
                return Some(ty);
            }
        }
    }
    None
}

fn apply_rename_rule(rule: &str, field: &str) -> Option<String> {
    let words: Vec<&str> = field.split('_').filter(|w| !w.is_empty()).collect();
    let renamed = match rule {
        "lowercase" | "snake_case" => field.to_lowercase(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_uppercase(),
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.replace('_', "-").to_uppercase(),
        "camelCase" => {
            let mut out = String::new();
            for (i, word) in words.iter().enumerate() {
                if i == 0 {
                    out.push_str(word);
                } else {
                    out.push_str(&capitalize(word));
                }
            }
            out
        }
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        _ => return None,
    };
    Some(renamed)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

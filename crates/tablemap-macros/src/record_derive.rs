//! Implementation of the Record derive macro.
//!
//! This module turns a struct definition into a field-accessor table: a
//! `describe()` listing of columns in declaration order plus path-based
//! getters and setters, driven by `#[db(...)]` attributes.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result, Type};

/// Column names may not contain whitespace, quotes, semicolons or NUL.
const COLUMN_NAME_PATTERN: &str = r#"^[^\s"'`;\x00]+$"#;

/// Parsed definition of a struct with `#[derive(Record)]`.
#[derive(Debug)]
pub struct RecordDef {
    /// The struct name.
    pub name: Ident,
    /// Table name override from `#[db(table = "...")]`.
    pub table: Option<String>,
    /// Whether the user supplies their own `Hooks` impl.
    pub custom_hooks: bool,
    /// Parsed fields, in declaration order.
    pub fields: Vec<RecordFieldDef>,
    /// Generics from the struct.
    pub generics: syn::Generics,
}

/// How a single field participates in the mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Stored in a column; `column` is the explicit tag if one was given.
    Column { column: Option<String> },
    /// Excluded from all generated SQL.
    Transient,
    /// A nested record whose columns are flattened into this one.
    Embedded,
}

/// Parsed attributes for a single field.
#[derive(Debug)]
pub struct RecordFieldDef {
    /// The field name.
    pub name: Ident,
    /// The field type.
    pub ty: Type,
    /// Mapping kind.
    pub kind: FieldKind,
}

/// Parse a `DeriveInput` into a `RecordDef`.
pub fn parse_record(input: &DeriveInput) -> Result<RecordDef> {
    let name = input.ident.clone();
    let generics = input.generics.clone();
    let (table, custom_hooks) = parse_struct_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_record_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs, not unions",
            ));
        }
    };

    Ok(RecordDef {
        name,
        table,
        custom_hooks,
        fields,
        generics,
    })
}

/// Parse `#[db(table = "...", hooks)]` on the struct itself.
fn parse_struct_attrs(attrs: &[Attribute]) -> Result<(Option<String>, bool)> {
    let mut table = None;
    let mut hooks = false;

    for attr in attrs {
        if !attr.path().is_ident("db") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                validate_column_name(&lit)?;
                table = Some(lit.value());
            } else if meta.path.is_ident("hooks") {
                hooks = true;
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    &meta.path,
                    format!(
                        "unknown db struct attribute `{attr_name}`. \
                         Valid attributes are: table, hooks"
                    ),
                ));
            }
            Ok(())
        })?;
    }

    Ok((table, hooks))
}

/// Parse all fields from a struct.
fn parse_record_fields(fields: &Fields) -> Result<Vec<RecordFieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_record_field).collect(),
        Fields::Unnamed(_) => Err(Error::new_spanned(
            fields,
            "Record requires a struct with named fields",
        )),
        Fields::Unit => Ok(Vec::new()),
    }
}

/// Parse a single field and its `#[db(...)]` attribute.
///
/// Accepted forms: `#[db("column")]`, `#[db("-")]`, `#[db(column = "...")]`,
/// `#[db(transient)]` and `#[db(embed)]`.
fn parse_record_field(field: &Field) -> Result<RecordFieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut kind = FieldKind::Column { column: None };

    for attr in &field.attrs {
        if !attr.path().is_ident("db") {
            continue;
        }

        if let Ok(lit) = attr.parse_args::<LitStr>() {
            kind = tag_kind(&lit)?;
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                kind = tag_kind(&lit)?;
            } else if meta.path.is_ident("transient") {
                kind = FieldKind::Transient;
            } else if meta.path.is_ident("embed") {
                kind = FieldKind::Embedded;
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    &meta.path,
                    format!(
                        "unknown db attribute `{attr_name}`. \
                         Valid attributes are: column, transient, embed"
                    ),
                ));
            }
            Ok(())
        })?;
    }

    Ok(RecordFieldDef {
        name,
        ty: field.ty.clone(),
        kind,
    })
}

/// Interpret a tag string: `-` marks the field transient, anything else
/// names the column.
fn tag_kind(lit: &LitStr) -> Result<FieldKind> {
    if lit.value() == "-" {
        return Ok(FieldKind::Transient);
    }
    validate_column_name(lit)?;
    Ok(FieldKind::Column {
        column: Some(lit.value()),
    })
}

fn validate_column_name(lit: &LitStr) -> Result<()> {
    let re = regex::Regex::new(COLUMN_NAME_PATTERN)
        .map_err(|e| Error::new_spanned(lit, format!("internal regex error: {e}")))?;
    if re.is_match(&lit.value()) {
        Ok(())
    } else {
        Err(Error::new_spanned(
            lit,
            format!(
                "invalid column name {:?}: must be non-empty and contain no whitespace, quotes, semicolons or NUL",
                lit.value()
            ),
        ))
    }
}

/// Generate the `Record` (and, unless opted out, `Hooks`) implementation.
pub fn generate_record_impl(def: &RecordDef) -> TokenStream {
    let name = &def.name;
    let name_str = name.to_string();
    let table_name = def.table.clone().unwrap_or_else(|| name_str.clone());
    let (impl_generics, ty_generics, where_clause) = def.generics.split_for_impl();

    let describe_entries = def.fields.iter().map(generate_describe_entry);

    let get_arms = def.fields.iter().filter_map(|f| {
        let field_name = &f.name;
        let field_str = field_name.to_string();
        match f.kind {
            FieldKind::Column { .. } => Some(quote! {
                #field_str => ::tablemap::SqlField::to_value(&self.#field_name).map_err(|source| {
                    ::tablemap::Error::Field { field: path.to_string(), source }
                }),
            }),
            _ => None,
        }
    });

    let set_arms = def.fields.iter().filter_map(|f| {
        let field_name = &f.name;
        let field_str = field_name.to_string();
        match f.kind {
            FieldKind::Column { .. } => Some(quote! {
                #field_str => {
                    self.#field_name = ::tablemap::SqlField::from_value(value).map_err(|source| {
                        ::tablemap::Error::Field { field: path.to_string(), source }
                    })?;
                    Ok(())
                }
            }),
            _ => None,
        }
    });

    let embedded_get = def.fields.iter().filter_map(|f| {
        let field_name = &f.name;
        let prefix = format!("{field_name}.");
        (f.kind == FieldKind::Embedded).then(|| {
            quote! {
                if let Some(rest) = path.strip_prefix(#prefix) {
                    return ::tablemap::Record::field_value(&self.#field_name, rest);
                }
            }
        })
    });

    let embedded_set = def.fields.iter().filter_map(|f| {
        let field_name = &f.name;
        let prefix = format!("{field_name}.");
        (f.kind == FieldKind::Embedded).then(|| {
            quote! {
                if let Some(rest) = path.strip_prefix(#prefix) {
                    return ::tablemap::Record::set_field_value(&mut self.#field_name, rest, value);
                }
            }
        })
    });

    let hooks_impl = if def.custom_hooks {
        quote! {}
    } else {
        quote! {
            impl #impl_generics ::tablemap::Hooks for #name #ty_generics #where_clause {}
        }
    };

    quote! {
        impl #impl_generics ::tablemap::Record for #name #ty_generics #where_clause {
            fn describe() -> ::std::vec::Vec<::tablemap::FieldDef> {
                ::std::vec![#(#describe_entries),*]
            }

            fn table_name() -> &'static str {
                #table_name
            }

            fn new_record() -> Self {
                ::core::default::Default::default()
            }

            fn record_name(&self) -> &'static str {
                #name_str
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn field_value(&self, path: &str) -> ::tablemap::Result<::tablemap::Value> {
                match path {
                    #(#get_arms)*
                    _ => {
                        #(#embedded_get)*
                        Err(::tablemap::Error::UnknownField {
                            field: path.to_string(),
                            type_name: #name_str,
                        })
                    }
                }
            }

            fn set_field_value(
                &mut self,
                path: &str,
                value: ::tablemap::Value,
            ) -> ::tablemap::Result<()> {
                match path {
                    #(#set_arms)*
                    _ => {
                        #(#embedded_set)*
                        let _ = value;
                        Err(::tablemap::Error::UnknownField {
                            field: path.to_string(),
                            type_name: #name_str,
                        })
                    }
                }
            }
        }

        #hooks_impl
    }
}

/// One `FieldDef` expression for `describe()`.
fn generate_describe_entry(field: &RecordFieldDef) -> TokenStream {
    let field_str = field.name.to_string();
    let ty = &field.ty;
    match &field.kind {
        FieldKind::Column { column } => {
            let column = match column {
                Some(c) => quote! { ::core::option::Option::Some(#c) },
                None => quote! { ::core::option::Option::None },
            };
            quote! {
                ::tablemap::FieldDef::Column(::tablemap::FieldColumn {
                    name: #field_str,
                    column: #column,
                    field_type: <#ty as ::tablemap::SqlField>::FIELD_TYPE,
                    nullable: <#ty as ::tablemap::SqlField>::NULLABLE,
                })
            }
        }
        FieldKind::Transient => quote! {
            ::tablemap::FieldDef::Transient { name: #field_str }
        },
        FieldKind::Embedded => quote! {
            ::tablemap::FieldDef::Embedded {
                name: #field_str,
                describe: <#ty as ::tablemap::Record>::describe,
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_field_kinds() {
        let input: DeriveInput = parse_quote! {
            #[db(table = "people")]
            struct Person {
                id: i64,
                #[db("first_name")]
                first: String,
                #[db("-")]
                cache: Vec<u8>,
                #[db(transient)]
                scratch: u8,
                #[db(embed)]
                audit: Audit,
                #[db(column = "ver")]
                version: i64,
            }
        };
        let def = parse_record(&input).unwrap();
        assert_eq!(def.table.as_deref(), Some("people"));
        assert!(!def.custom_hooks);
        let kinds: Vec<_> = def.fields.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                FieldKind::Column { column: None },
                FieldKind::Column {
                    column: Some("first_name".to_string())
                },
                FieldKind::Transient,
                FieldKind::Transient,
                FieldKind::Embedded,
                FieldKind::Column {
                    column: Some("ver".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_hooks_attribute_suppresses_default_impl() {
        let input: DeriveInput = parse_quote! {
            #[db(hooks)]
            struct Invoice { id: i64 }
        };
        let def = parse_record(&input).unwrap();
        assert!(def.custom_hooks);
        let tokens = generate_record_impl(&def).to_string();
        assert!(!tokens.contains("Hooks for"));

        let plain: DeriveInput = parse_quote! { struct Plain { id: i64 } };
        let tokens = generate_record_impl(&parse_record(&plain).unwrap()).to_string();
        assert!(tokens.contains("Hooks for Plain"));
    }

    #[test]
    fn test_rejects_bad_column_names() {
        let input: DeriveInput = parse_quote! {
            struct Bad {
                #[db("two words")]
                x: i64,
            }
        };
        assert!(parse_record(&input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Bad {
                #[db(colour = "x")]
                x: i64,
            }
        };
        assert!(parse_record(&input).is_err());
    }

    #[test]
    fn test_rejects_tuple_structs_and_enums() {
        let tuple: DeriveInput = parse_quote! { struct T(i64); };
        assert!(parse_record(&tuple).is_err());
        let en: DeriveInput = parse_quote! { enum E { A } };
        assert!(parse_record(&en).is_err());
    }
}

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Data, DataEnum, DeriveInput, ImplItem, ImplItemFn, ItemImpl,
    Stmt, Variant, Visibility,
};

/// Procedural macro that turns an enum into the crate's foreign-facing error type
///
/// This macro automatically:
/// 1. Adds `#[derive(Debug, thiserror::Error, uniffi::Error)]` and `#[uniffi(flat_error)]`
/// 2. Adds a `Generic { message: String }` variant if not already present
/// 3. Implements `From<anyhow::Error>` for the error type, keeping the cause chain
///
/// # Usage
///
/// ```rust,ignore
/// #[migrator_error]
/// pub enum StoreError {
///     #[error("table {table} is missing")]
///     MissingTable { table: String },
/// }
/// ```
#[proc_macro_attribute]
pub fn migrator_error(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(
            &input,
            "migrator_error can only be applied to enums",
        )
        .to_compile_error()
        .into();
    };

    let enum_name = &input.ident;
    let visibility = &input.vis;
    let generics = &input.generics;

    // derive and uniffi attributes are regenerated below
    let attrs: Vec<_> = input
        .attrs
        .iter()
        .filter(|attr| !attr.path().is_ident("derive") && !attr.path().is_ident("uniffi"))
        .collect();

    let variants = with_generic_variant(data_enum);

    quote! {
        #[derive(Debug, thiserror::Error, uniffi::Error)]
        #[uniffi(flat_error)]
        #(#attrs)*
        #visibility enum #enum_name #generics {
            #variants
        }

        impl #generics From<anyhow::Error> for #enum_name #generics {
            fn from(err: anyhow::Error) -> Self {
                let mut message = err.to_string();
                let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
                if !chain.is_empty() {
                    message.push_str(" (caused by: ");
                    message.push_str(&chain.join(" -> "));
                    message.push(')');
                }
                Self::Generic { message }
            }
        }
    }
    .into()
}

/// Returns the enum's variants with a `Generic` catch-all appended when missing.
fn with_generic_variant(
    data_enum: &DataEnum,
) -> syn::punctuated::Punctuated<Variant, syn::token::Comma> {
    let mut variants = data_enum.variants.clone();
    if !variants.iter().any(|variant| variant.ident == "Generic") {
        let generic_variant: Variant = syn::parse_quote! {
            /// Any other failure, carrying the flattened `anyhow` chain.
            #[error("{message}")]
            Generic {
                /// The flattened error message.
                message: String
            }
        };
        variants.push(generic_variant);
    }
    variants
}

/// Procedural macro that wraps `uniffi::export` and injects a logging context
///
/// Every `pub fn` in the impl block starts with
/// `let _migrator_log_ctx = crate::primitives::logger::LogContext::new("TypeName");`
/// so log lines emitted while serving a host call are prefixed with `[TypeName]`.
///
/// # Usage
///
/// ```rust,ignore
/// #[migrator_export]
/// impl MigrationController {
///     pub fn run_migrations(&self) -> Result<MigrationRunSummary, MigrationError> {
///         // info! lines here are prefixed with [MigrationController]
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn migrator_export(args: TokenStream, input: TokenStream) -> TokenStream {
    let input_impl = parse_macro_input!(input as ItemImpl);
    let type_name = impl_type_name(&input_impl);

    let items = input_impl
        .items
        .iter()
        .map(|item| match item {
            ImplItem::Fn(method) if matches!(method.vis, Visibility::Public(_)) => {
                let mut method = method.clone();
                inject_logging_context(&mut method, &type_name);
                ImplItem::Fn(method)
            }
            other => other.clone(),
        })
        .collect();

    let new_impl = ItemImpl {
        items,
        ..input_impl
    };
    let args = proc_macro2::TokenStream::from(args);

    quote! {
        #[uniffi::export(#args)]
        #new_impl
    }
    .into()
}

/// Extracts the last path segment of the impl's self type.
fn impl_type_name(input_impl: &ItemImpl) -> String {
    match &*input_impl.self_ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map_or_else(|| "Unknown".to_string(), |segment| segment.ident.to_string()),
        _ => "Unknown".to_string(),
    }
}

fn inject_logging_context(method: &mut ImplItemFn, type_name: &str) {
    let context_stmt: Stmt = syn::parse_quote! {
        let _migrator_log_ctx = crate::primitives::logger::LogContext::new(#type_name);
    };
    method.block.stmts.insert(0, context_stmt);
}

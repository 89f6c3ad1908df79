use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, ItemFn, ReturnType, Type};

/// Expands `#[hb_runtime::main(profile)]` into a synchronous `main` that owns its runtime.
#[must_use]
pub fn expand_main(args: TokenStream, input: ItemFn) -> TokenStream {
    if input.sig.asyncness.is_none() {
        return Error::new_spanned(&input.sig.fn_token, "#[hb_runtime::main] expects an async fn")
            .to_compile_error();
    }

    if !returns_result(&input.sig.output) {
        return Error::new_spanned(&input.sig.output, "#[hb_runtime::main] expects a Result return type")
            .to_compile_error();
    }

    let profile = match profile_constructor(args) {
        Ok(profile) => profile,
        Err(err) => return err,
    };

    let ItemFn { attrs, vis, sig, block } = input;
    let name = &sig.ident;
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #vis fn #name() #output {
            let config = #profile;
            let runtime = ::hb_runtime::build_runtime_with_config(&config)?;
            runtime.block_on(async move #block)
        }
    }
}

fn profile_constructor(args: TokenStream) -> Result<TokenStream, TokenStream> {
    if args.is_empty() {
        return Ok(quote! { ::hb_runtime::RuntimeConfig::default() });
    }

    let ident: syn::Ident = syn::parse2(args).map_err(|err| err.to_compile_error())?;
    match ident.to_string().as_str() {
        "default" => Ok(quote! { ::hb_runtime::RuntimeConfig::default() }),
        "memory_efficient" => Ok(quote! { ::hb_runtime::RuntimeConfig::memory_efficient() }),
        "high_performance" => Ok(quote! { ::hb_runtime::RuntimeConfig::high_performance() }),
        _ => Err(Error::new_spanned(
            ident,
            "unknown runtime profile, expected one of: default, memory_efficient, high_performance",
        )
        .to_compile_error()),
    }
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Type(_, ty) => match &**ty {
            Type::Path(path) => path.path.segments.last().is_some_and(|seg| seg.ident == "Result"),
            _ => false,
        },
        ReturnType::Default => false,
    }
}

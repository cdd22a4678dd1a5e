#![recursion_limit = "128"]

extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{parenthesized, parse_quote, Result};
use syn::{punctuated::Punctuated, token::Comma, DeriveInput};

struct TraitName {
    pub inner: syn::LitStr,
}

impl Parse for TraitName {
    fn parse(input: ParseStream) -> Result<Self> {
        let content;
        parenthesized!(content in input);
        let punctuated = Punctuated::<syn::LitStr, Comma>::parse_terminated(&content)?;

        match punctuated.into_iter().next() {
            Some(inner) => Ok(TraitName { inner }),
            None => Err(content.error("expected a trait name")),
        }
    }
}

#[derive(Default, Debug)]
struct FieldTags {
    skip: bool,
    immutable: bool,
}

impl FieldTags {
    pub fn add(&mut self, other: FieldTags) {
        self.skip = self.skip || other.skip;
        self.immutable = self.immutable || other.immutable;
    }
}

impl Parse for FieldTags {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut tags = FieldTags::default();

        let content;
        parenthesized!(content in input);
        let punctuated = Punctuated::<syn::Ident, Comma>::parse_terminated(&content)?;

        for ident in punctuated {
            match ident.to_string().as_str() {
                "skip" => tags.skip = true,
                "immutable" => tags.immutable = true,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown intents attribute `{}`", other),
                    ))
                }
            }
        }

        Ok(tags)
    }
}

fn field_tags(field: &syn::Field) -> Result<FieldTags> {
    let mut tags = FieldTags::default();
    for attr in &field.attrs {
        if attr.path.is_ident("intents") {
            tags.add(syn::parse2(attr.tokens.clone())?);
        }
    }

    Ok(tags)
}

fn accessor_parts(field: &syn::Field, tags: &FieldTags) -> (TokenStream, TokenStream) {
    let ident = match &field.ident {
        Some(ident) => ident,
        None => return (quote! {}, quote! {}),
    };

    let ty = &field.ty;
    let getter = format_ident!("{}", ident.unraw());
    let setter = format_ident!("set_{}", ident.unraw());

    if tags.immutable {
        let sig = quote! { fn #getter(&self) -> #ty };
        return (
            quote! { #sig; },
            quote! {
                #sig {
                    self.get_unchecked(|this| ::std::clone::Clone::clone(&this.#ident))
                }
            },
        );
    }

    let get_sig = quote! { fn #getter(&self) -> ::std::result::Result<#ty, ::intents::Error> };
    let set_sig =
        quote! { fn #setter(&self, value: #ty) -> ::std::result::Result<(), ::intents::Error> };

    (
        quote! {
            #get_sig;
            #set_sig;
        },
        quote! {
            #get_sig {
                self.get(|this| ::std::clone::Clone::clone(&this.#ident))
            }

            #set_sig {
                self.put(move |this| this.#ident = value)
            }
        },
    )
}

fn expand(ast: DeriveInput) -> Result<TokenStream> {
    let name = &ast.ident;
    let vis = &ast.vis;

    let fields = match &ast.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "GuardedFields can only be derived for structs with named fields",
            ))
        }
    };

    let mut trait_name = format_ident!("{}Fields", name);
    for attr in &ast.attrs {
        if attr.path.is_ident("fields_trait") {
            let tn: TraitName = syn::parse2(attr.tokens.clone())?;
            trait_name = syn::Ident::new(&tn.inner.value(), tn.inner.span());
        }
    }

    let has_type_params = ast.generics.type_params().next().is_some();
    let mut impl_bounds = ast.generics.clone();
    let mut decls = Vec::new();
    let mut impls = Vec::new();

    for field in fields {
        let tags = field_tags(field)?;
        if tags.skip {
            continue;
        }

        if has_type_params {
            let ty = &field.ty;
            impl_bounds
                .make_where_clause()
                .predicates
                .push(parse_quote!(#ty: ::std::clone::Clone));
        }

        let (decl, imp) = accessor_parts(field, &tags);
        decls.push(decl);
        impls.push(imp);
    }

    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let (_, _, impl_where_clause) = impl_bounds.split_for_impl();

    Ok(quote! {
        #vis trait #trait_name #impl_generics #where_clause {
            #(#decls)*
        }

        impl #impl_generics #trait_name #ty_generics for ::intents::Guarded<#name #ty_generics> #impl_where_clause {
            #(#impls)*
        }
    })
}

/// Generates checked field accessors for `Guarded<T>`.
///
/// Every named field `x` gets `x()` (checked as a read) and `set_x(value)`
/// (checked as a write) on a `<Type>Fields` trait implemented for
/// `intents::Guarded<Type>`. `#[intents(skip)]` leaves a field out and
/// `#[intents(immutable)]` generates an unchecked getter with no setter.
#[proc_macro_derive(GuardedFields, attributes(intents, fields_trait))]
pub fn derive_guarded_fields(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(err) => return err.to_compile_error().into(),
    };

    match expand(ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

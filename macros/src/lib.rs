extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse, parse2, spanned::Spanned as _, FnArg, Ident, ItemFn, Pat, ReturnType};

/// Checks the handler shape and returns the identifier of the port argument.
fn port_argument<'a>(item: &'a ItemFn, name: &str) -> Result<&'a Ident, parse::Error> {
    if item.sig.inputs.len() != 1 {
        return Err(parse::Error::new(
            item.sig.span(),
            format!("`{name}` handler should have exactly one argument: the port"),
        ));
    }

    if item.sig.asyncness.is_some() {
        return Err(parse::Error::new(
            item.sig.span(),
            format!("`{name}` handler cannot be async"),
        ));
    }

    if !matches!(item.sig.output, ReturnType::Default) {
        return Err(parse::Error::new(
            item.sig.output.span(),
            format!("`{name}` handler should not return a value"),
        ));
    }

    match item.sig.inputs.first() {
        Some(FnArg::Typed(arg)) => match arg.pat.as_ref() {
            Pat::Ident(pat) => Ok(&pat.ident),
            pat => Err(parse::Error::new(
                pat.span(),
                format!("`{name}` handler argument should be a plain identifier"),
            )),
        },
        Some(FnArg::Receiver(receiver)) => Err(parse::Error::new(
            receiver.span(),
            format!("`{name}` handler cannot take `self` as an argument"),
        )),
        None => unreachable!("argument count checked above"),
    }
}

fn wrap_isr(
    attrs: TokenStream,
    item: TokenStream,
    name: &str,
    enter: TokenStream,
    leave: TokenStream,
) -> TokenStream {
    let item = match parse2::<ItemFn>(item) {
        Ok(item) => item,
        Err(err) => return err.into_compile_error(),
    };

    if !attrs.is_empty() {
        return parse::Error::new(
            item.span(),
            format!("`{name}` attribute does not take any arguments"),
        )
        .into_compile_error();
    }

    let port = match port_argument(&item, name) {
        Ok(port) => port,
        Err(err) => return err.into_compile_error(),
    };

    let attrs = &item.attrs;
    let vis = &item.vis;
    let sig = &item.sig;
    let block = &item.block;

    quote! {
        #(#attrs)*
        #vis #sig {
            #port.#enter();
            #[allow(clippy::redundant_closure_call)]
            (|| #block)();
            #port.#leave();
        }
    }
}

/// Wrap an interrupt handler that may call scheduler APIs.
///
/// The handler runs between a full context save and restore, so it may
/// select a different task through the port. The function should take
/// exactly one argument, the port.
///
/// # Usage
/// ```ignore
/// #[rlport::kernel_isr]
/// fn tick(port: &mut Port<Rl78Sim, TaskSlots<2>>) {
///     let next = (port.tasks().get_current() + 1) % 2;
///     port.tasks_mut().set_current(next);
/// }
/// ```
#[proc_macro_attribute]
pub fn kernel_isr(
    attrs: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    wrap_isr(
        attrs.into(),
        item.into(),
        "kernel_isr",
        quote! { save_context },
        quote! { restore_context },
    )
    .into()
}

/// Wrap a high priority interrupt handler that never calls scheduler APIs.
///
/// Only registers are saved, and the handler may be interrupted by another
/// nestable handler.
///
/// # Usage
/// ```ignore
/// #[rlport::nestable_isr]
/// fn uart_rx(port: &mut Port<Rl78Sim, TaskSlots<2>>) {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn nestable_isr(
    attrs: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    wrap_isr(
        attrs.into(),
        item.into(),
        "nestable_isr",
        quote! { save_registers },
        quote! { restore_registers },
    )
    .into()
}
